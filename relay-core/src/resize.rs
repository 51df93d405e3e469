//! Integer-percent frame resizing with a symmetric inverse.
//!
//! `resize` downscales a [`Frame`] by `scale_percent` and `desize` upscales
//! it back to the original geometry. The round trip is lossy by design —
//! further loss is compounded by quantisation downstream.

use crate::error::RelayError;
use crate::frame::Frame;

/// Bounds on the scale percent accepted by [`Resizer::new`].
pub const MIN_SCALE_PERCENT: u8 = 1;
pub const MAX_SCALE_PERCENT: u8 = 100;

/// Downscales on encode, upscales back on decode, using a fixed bilinear
/// kernel: cheap to implement without pulling in an image-processing crate,
/// and markedly smoother than nearest-neighbor at the small palette sizes
/// this pipeline targets.
#[derive(Debug, Clone, Copy)]
pub struct Resizer {
    scale_percent: u8,
}

impl Resizer {
    pub fn new(scale_percent: u8) -> Result<Self, RelayError> {
        if scale_percent < MIN_SCALE_PERCENT || scale_percent > MAX_SCALE_PERCENT {
            return Err(RelayError::Configuration(format!(
                "scale_percent must be in [{MIN_SCALE_PERCENT}, {MAX_SCALE_PERCENT}], got {scale_percent}"
            )));
        }
        Ok(Self { scale_percent })
    }

    pub fn scale_percent(&self) -> u8 {
        self.scale_percent
    }

    /// The target `(height, width)` after downscaling a frame of shape
    /// `original`.
    pub fn target_shape(&self, original: (usize, usize)) -> (usize, usize) {
        if self.is_identity() {
            return original;
        }
        let scale = self.scale_percent as f64 / 100.0;
        let h = (original.0 as f64 * scale).round().max(1.0) as usize;
        let w = (original.1 as f64 * scale).round().max(1.0) as usize;
        (h, w)
    }

    fn is_identity(&self) -> bool {
        self.scale_percent as f64 / 100.0 >= 0.99
    }

    /// Downscale `frame` to `target_shape(frame.shape())`.
    pub fn resize(&self, frame: &Frame) -> Frame {
        if self.is_identity() {
            return frame.clone();
        }
        let target = self.target_shape(frame.shape());
        bilinear_resample(frame, target)
    }

    /// Upscale `frame` back to `original_shape`.
    pub fn desize(&self, frame: &Frame, original_shape: (usize, usize)) -> Frame {
        if frame.shape() == original_shape {
            return frame.clone();
        }
        bilinear_resample(frame, original_shape)
    }
}

fn bilinear_resample(frame: &Frame, target: (usize, usize)) -> Frame {
    let (src_h, src_w) = frame.shape();
    let (dst_h, dst_w) = target;
    let mut data = vec![0u8; dst_h * dst_w * 3];

    let scale_y = src_h as f64 / dst_h as f64;
    let scale_x = src_w as f64 / dst_w as f64;

    for dy in 0..dst_h {
        let sy = ((dy as f64 + 0.5) * scale_y - 0.5).clamp(0.0, (src_h - 1) as f64);
        let y0 = sy.floor() as usize;
        let y1 = (y0 + 1).min(src_h - 1);
        let fy = sy - y0 as f64;

        for dx in 0..dst_w {
            let sx = ((dx as f64 + 0.5) * scale_x - 0.5).clamp(0.0, (src_w - 1) as f64);
            let x0 = sx.floor() as usize;
            let x1 = (x0 + 1).min(src_w - 1);
            let fx = sx - x0 as f64;

            let p00 = frame.pixel(y0, x0);
            let p01 = frame.pixel(y0, x1);
            let p10 = frame.pixel(y1, x0);
            let p11 = frame.pixel(y1, x1);

            let out = (dy * dst_w + dx) * 3;
            for c in 0..3 {
                let top = lerp(channel(p00, c), channel(p01, c), fx);
                let bottom = lerp(channel(p10, c), channel(p11, c), fx);
                data[out + c] = lerp(top, bottom, fy).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    Frame::new(dst_h, dst_w, data)
}

fn channel(p: (u8, u8, u8), c: usize) -> f64 {
    match c {
        0 => p.0 as f64,
        1 => p.1 as f64,
        _ => p.2 as f64,
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_scale() {
        assert!(Resizer::new(0).is_err());
        assert!(Resizer::new(101).is_err());
    }

    #[test]
    fn identity_at_100_percent() {
        let resizer = Resizer::new(100).unwrap();
        let frame = Frame::new(2, 2, vec![1; 12]);
        let resized = resizer.resize(&frame);
        assert_eq!(resized.shape(), frame.shape());
        assert_eq!(resized.data(), frame.data());
    }

    #[test]
    fn target_shape_scales_1080p_by_60_percent() {
        let resizer = Resizer::new(60).unwrap();
        assert_eq!(resizer.target_shape((1080, 1920)), (648, 1152));
    }

    #[test]
    fn resize_then_desize_preserves_shape() {
        let resizer = Resizer::new(60).unwrap();
        let original = Frame::new(10, 10, vec![128; 300]);
        let small = resizer.resize(&original);
        let restored = resizer.desize(&small, original.shape());
        assert_eq!(restored.shape(), original.shape());
    }

    #[test]
    fn extreme_downscale_s_equals_1() {
        let resizer = Resizer::new(1).unwrap();
        let shape = resizer.target_shape((1080, 1920));
        assert_eq!(shape, (11, 19));
    }
}
