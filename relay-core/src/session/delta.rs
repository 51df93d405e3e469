//! `DeltaEngine` — the session's only cross-frame mutable state.
//!
//! Holds a [`ReferenceFrame`](QuantisedFrame) `R` and a modulus `K` (the
//! palette size). `compute_difference` is pure; `apply_difference` and
//! `advance` are the only mutators. Modelled as a value type owned
//! exclusively by its session task — no shared mutability, no locks, per
//! the design notes on cross-component mutable state.
//!
//! The source carried two different delta formulas (`R - C` vs `C - R`)
//! across revisions. This engine fixes on `D = (R - C) mod K` for compute
//! and `R := (R - D) mod K` for apply — see [`compute_difference`] and
//! [`apply_difference`] for the proof that these invert each other.

use crate::error::RelayError;
use crate::frame::QuantisedFrame;

pub struct DeltaEngine {
    reference: QuantisedFrame,
    k: u16,
}

impl DeltaEngine {
    /// A fresh engine whose reference is the all-zero frame of `(h, w)` at
    /// modulus `k`.
    pub fn new(height: usize, width: usize, k: u16) -> Self {
        Self { reference: QuantisedFrame::zeroed(height, width, k), k }
    }

    pub fn reference(&self) -> &QuantisedFrame {
        &self.reference
    }

    pub fn k(&self) -> u16 {
        self.k
    }

    fn check_shape(&self, frame: &QuantisedFrame) -> Result<(), RelayError> {
        if frame.shape() != self.reference.shape() {
            return Err(RelayError::ShapeMismatch {
                expected: self.reference.shape(),
                actual: frame.shape(),
            });
        }
        Ok(())
    }

    /// `D = (R - C) mod K`. Does not mutate `R`.
    pub fn compute_difference(&self, current: &QuantisedFrame) -> Result<QuantisedFrame, RelayError> {
        self.check_shape(current)?;
        let k = self.k as i32;
        let data: Vec<u8> = self
            .reference
            .data()
            .iter()
            .zip(current.data())
            .map(|(&r, &c)| (((r as i32 - c as i32).rem_euclid(k)) as u8))
            .collect();
        Ok(QuantisedFrame::new(self.reference.height(), self.reference.width(), self.k, data))
    }

    /// `R := (R - D) mod K`; returns the new reference.
    pub fn apply_difference(&mut self, delta: &QuantisedFrame) -> Result<&QuantisedFrame, RelayError> {
        self.check_shape(delta)?;
        let k = self.k as i32;
        let data: Vec<u8> = self
            .reference
            .data()
            .iter()
            .zip(delta.data())
            .map(|(&r, &d)| (((r as i32 - d as i32).rem_euclid(k)) as u8))
            .collect();
        self.reference = QuantisedFrame::new(self.reference.height(), self.reference.width(), self.k, data);
        Ok(&self.reference)
    }

    /// Replace the reference wholesale. Used by the encoder when it
    /// commits the candidate reference a [`PipelineCoordinator::encode`]
    /// call produced (see §4.8's commit-ordering discipline).
    pub fn advance(&mut self, new_reference: QuantisedFrame) -> Result<(), RelayError> {
        self.check_shape(&new_reference)?;
        self.reference = new_reference;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_after_compute_recovers_current_frame() {
        let mut engine = DeltaEngine::new(2, 2, 4);
        let current = QuantisedFrame::new(2, 2, 4, vec![3, 1, 0, 2]);
        let delta = engine.compute_difference(&current).unwrap();
        let reference = engine.apply_difference(&delta).unwrap();
        assert_eq!(reference.data(), current.data());
    }

    #[test]
    fn delta_values_are_within_modulus() {
        let engine = DeltaEngine::new(1, 4, 8);
        let current = QuantisedFrame::new(1, 4, 8, vec![7, 0, 5, 2]);
        let delta = engine.compute_difference(&current).unwrap();
        assert!(delta.data().iter().all(|&v| (v as u16) < 8));
    }

    #[test]
    fn static_screen_against_matching_reference_is_all_zero() {
        let mut engine = DeltaEngine::new(2, 2, 4);
        let frame = QuantisedFrame::new(2, 2, 4, vec![1, 2, 3, 0]);
        engine.advance(frame.clone()).unwrap();
        let delta = engine.compute_difference(&frame).unwrap();
        assert!(delta.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn rejects_shape_mismatch_on_compute() {
        let engine = DeltaEngine::new(2, 2, 4);
        let wrong = QuantisedFrame::new(1, 4, 4, vec![0, 0, 0, 0]);
        assert!(matches!(
            engine.compute_difference(&wrong),
            Err(RelayError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn rejects_shape_mismatch_on_apply() {
        let mut engine = DeltaEngine::new(2, 2, 4);
        let wrong = QuantisedFrame::new(1, 4, 4, vec![0, 0, 0, 0]);
        assert!(matches!(
            engine.apply_difference(&wrong),
            Err(RelayError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn mirror_invariant_across_sequence_of_commits() {
        let mut sender = DeltaEngine::new(2, 2, 4);
        let mut receiver = DeltaEngine::new(2, 2, 4);

        let frames = [
            QuantisedFrame::new(2, 2, 4, vec![1, 0, 0, 0]),
            QuantisedFrame::new(2, 2, 4, vec![1, 2, 0, 0]),
            QuantisedFrame::new(2, 2, 4, vec![3, 3, 3, 3]),
        ];

        for frame in frames {
            let delta = sender.compute_difference(&frame).unwrap();
            sender.advance(frame.clone()).unwrap();
            receiver.apply_difference(&delta).unwrap();
            assert_eq!(sender.reference().data(), receiver.reference().data());
        }
    }

    #[test]
    fn k_equals_2_single_bit_modulus() {
        let mut engine = DeltaEngine::new(1, 2, 2);
        let frame = QuantisedFrame::new(1, 2, 2, vec![1, 0]);
        let delta = engine.compute_difference(&frame).unwrap();
        let reference = engine.apply_difference(&delta).unwrap();
        assert_eq!(reference.data(), &[1, 0]);
    }
}
