//! Greyscale quantisation: RGB → luminance → `K`-level LUT.

use super::validate_k;
use crate::error::RelayError;
use crate::frame::{Frame, QuantisedFrame};

const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Maps RGB to luminance with the ITU-R BT.601-ish (0.299, 0.587, 0.114)
/// weights, then buckets the 256 luminance levels into `K` quantisation
/// levels via a precomputed LUT.
#[derive(Debug, Clone)]
pub struct GreyscaleQuantiser {
    k: u16,
    quantise_lut: [u8; 256],
    dequantise_lut: Vec<u8>,
}

impl GreyscaleQuantiser {
    pub fn new(k: u16) -> Result<Self, RelayError> {
        validate_k(k)?;

        let mut quantise_lut = [0u8; 256];
        for (luma, slot) in quantise_lut.iter_mut().enumerate() {
            *slot = ((luma as u32 * k as u32) / 256) as u8;
        }

        let dequantise_lut = (0..k)
            .map(|q| {
                if k == 1 {
                    0
                } else {
                    ((q as u32 * 255) / (k as u32 - 1)) as u8
                }
            })
            .collect();

        Ok(Self {
            k,
            quantise_lut,
            dequantise_lut,
        })
    }

    pub fn k(&self) -> u16 {
        self.k
    }

    pub fn quantise(&self, frame: &Frame) -> QuantisedFrame {
        let (h, w) = frame.shape();
        let mut data = Vec::with_capacity(h * w);
        for y in 0..h {
            for x in 0..w {
                let (r, g, b) = frame.pixel(y, x);
                let luma = LUMA_R * r as f32 + LUMA_G * g as f32 + LUMA_B * b as f32;
                let luma = luma.round().clamp(0.0, 255.0) as usize;
                data.push(self.quantise_lut[luma]);
            }
        }
        QuantisedFrame::new(h, w, self.k, data)
    }

    pub fn dequantise(&self, frame: &QuantisedFrame) -> Frame {
        let (h, w) = frame.shape();
        let mut data = Vec::with_capacity(h * w * 3);
        for &q in frame.data() {
            let v = self.dequantise_lut[q as usize];
            data.extend_from_slice(&[v, v, v]);
        }
        Frame::new(h, w, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_quantises_to_zero() {
        let q = GreyscaleQuantiser::new(4).unwrap();
        let frame = Frame::new(1, 1, vec![0, 0, 0]);
        let quantised = q.quantise(&frame);
        assert_eq!(quantised.data(), &[0]);
    }

    #[test]
    fn white_quantises_to_max_level() {
        let q = GreyscaleQuantiser::new(4).unwrap();
        let frame = Frame::new(1, 1, vec![255, 255, 255]);
        let quantised = q.quantise(&frame);
        assert_eq!(quantised.data(), &[3]);
    }

    #[test]
    fn dequantise_spreads_across_full_range() {
        let q = GreyscaleQuantiser::new(2).unwrap();
        let frame = QuantisedFrame::new(1, 2, 2, vec![0, 1]);
        let back = q.dequantise(&frame);
        assert_eq!(back.pixel(0, 0), (0, 0, 0));
        assert_eq!(back.pixel(0, 1), (255, 255, 255));
    }

    #[test]
    fn rejects_k_out_of_range() {
        assert!(GreyscaleQuantiser::new(1).is_err());
        assert!(GreyscaleQuantiser::new(300).is_err());
    }
}
