//! `PipelineCoordinator` — composes Resizer, Quantiser, Packer, Compressor
//! and the [`DeltaEngine`] into the session's `encode`/`decode` operations.
//!
//! The reference-handling asymmetry is deliberate and load-bearing: `encode`
//! returns a *candidate* reference without touching the engine's state,
//! while `decode` advances the engine's reference unconditionally. See
//! `StreamSession`'s commit-ordering discipline in `encoder_session`/
//! `decoder_session` for why.

use std::time::{Duration, Instant};

use crate::compress::Compressor;
use crate::error::RelayError;
use crate::frame::{Frame, QuantisedFrame};
use crate::pack;
use crate::quantise::Quantiser;
use crate::resize::Resizer;
use crate::session::delta::DeltaEngine;

/// Named durations for one `encode`/`decode` call, replacing a
/// map-of-strings stats bag with a plain record.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineStats {
    pub resize: Duration,
    pub quantise: Duration,
    pub delta: Duration,
    pub pack: Duration,
    pub compress: Duration,
}

impl PipelineStats {
    pub fn total(&self) -> Duration {
        self.resize + self.quantise + self.delta + self.pack + self.compress
    }
}

pub struct PipelineCoordinator {
    resizer: Resizer,
    quantiser: Quantiser,
    compressor: Compressor,
}

impl PipelineCoordinator {
    pub fn new(resizer: Resizer, quantiser: Quantiser, compressor: Compressor) -> Self {
        Self { resizer, quantiser, compressor }
    }

    pub fn quantiser(&self) -> &Quantiser {
        &self.quantiser
    }

    pub fn resizer(&self) -> &Resizer {
        &self.resizer
    }

    /// `capture → resize → quantise → delta.compute_difference → pack →
    /// compress`. Returns the compressed bytes and the *candidate* new
    /// reference (equal to the quantised frame) — `delta` is **not**
    /// advanced here; that decision belongs to the session.
    pub fn encode(
        &self,
        frame: &Frame,
        delta: &DeltaEngine,
    ) -> Result<(PipelineStats, QuantisedFrame, Vec<u8>), RelayError> {
        let mut stats = PipelineStats::default();

        let t = Instant::now();
        let resized = self.resizer.resize(frame);
        stats.resize = t.elapsed();

        let t = Instant::now();
        let quantised = self.quantiser.quantise(&resized);
        stats.quantise = t.elapsed();

        let t = Instant::now();
        let difference = delta.compute_difference(&quantised)?;
        stats.delta = t.elapsed();

        let t = Instant::now();
        let shape = [difference.height(), difference.width()];
        let packed = pack::pack(difference.data(), &shape, self.quantiser.bits_per_value())?;
        stats.pack = t.elapsed();

        let t = Instant::now();
        let compressed = self.compressor.compress(&packed)?;
        stats.compress = t.elapsed();

        Ok((stats, quantised, compressed))
    }

    /// `decompress → unpack → delta.apply_difference (advances the
    /// reference) → dequantise → desize`.
    pub fn decode(
        &self,
        bytes: &[u8],
        delta: &mut DeltaEngine,
        original_shape: (usize, usize),
    ) -> Result<(PipelineStats, Frame), RelayError> {
        let mut stats = PipelineStats::default();

        let t = Instant::now();
        let packed = self.compressor.decompress(bytes)?;
        stats.compress = t.elapsed();

        let t = Instant::now();
        let (values, shape) = pack::unpack(&packed, self.quantiser.bits_per_value())?;
        if shape.len() != 2 {
            return Err(RelayError::Codec(format!(
                "expected a 2-dimensional packed delta, got {} dims",
                shape.len()
            )));
        }
        let (h, w) = delta.reference().shape();
        if (shape[0], shape[1]) != (h, w) {
            return Err(RelayError::ShapeMismatch { expected: (h, w), actual: (shape[0], shape[1]) });
        }
        let difference = QuantisedFrame::try_new(h, w, self.quantiser.k(), values)?;
        stats.pack = t.elapsed();

        let t = Instant::now();
        let reference = delta.apply_difference(&difference)?;
        stats.delta = t.elapsed();

        let t = Instant::now();
        let dequantised = self.quantiser.dequantise(reference);
        stats.quantise = t.elapsed();

        let t = Instant::now();
        let frame = self.resizer.desize(&dequantised, original_shape);
        stats.resize = t.elapsed();

        Ok((stats, frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantise::Quantiser;

    fn coordinator(k: u16) -> PipelineCoordinator {
        PipelineCoordinator::new(
            Resizer::new(100).unwrap(),
            Quantiser::greyscale(k).unwrap(),
            Compressor::default(),
        )
    }

    #[test]
    fn encode_then_decode_preserves_shape() {
        let coordinator = coordinator(4);
        let mut encoder_delta = DeltaEngine::new(4, 4, 4);
        let mut decoder_delta = DeltaEngine::new(4, 4, 4);

        let frame = Frame::new(4, 4, vec![128u8; 4 * 4 * 3]);
        let (_, candidate, bytes) = coordinator.encode(&frame, &encoder_delta).unwrap();
        encoder_delta.advance(candidate).unwrap();

        let (_, decoded) = coordinator.decode(&bytes, &mut decoder_delta, frame.shape()).unwrap();
        assert_eq!(decoded.shape(), frame.shape());
    }

    #[test]
    fn encoder_and_decoder_references_stay_mirrored() {
        let coordinator = coordinator(4);
        let mut encoder_delta = DeltaEngine::new(2, 2, 4);
        let mut decoder_delta = DeltaEngine::new(2, 2, 4);

        for fill in [10u8, 200, 128] {
            let frame = Frame::new(2, 2, vec![fill; 2 * 2 * 3]);
            let (_, candidate, bytes) = coordinator.encode(&frame, &encoder_delta).unwrap();
            encoder_delta.advance(candidate).unwrap();
            let (_, _decoded) = coordinator.decode(&bytes, &mut decoder_delta, frame.shape()).unwrap();
            assert_eq!(encoder_delta.reference().data(), decoder_delta.reference().data());
        }
    }

    #[test]
    fn rejects_malformed_decode_payload() {
        let coordinator = coordinator(4);
        let mut delta = DeltaEngine::new(2, 2, 4);
        let garbage = coordinator.compressor.compress(&[0xFFu8; 4]).unwrap();
        assert!(coordinator.decode(&garbage, &mut delta, (2, 2)).is_err());
    }
}
