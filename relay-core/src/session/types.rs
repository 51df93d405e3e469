//! Session-wide configuration and small wire-adjacent value types.

use crate::error::RelayError;
use crate::quantise::{MAX_K, MIN_K};
use crate::resize::{MAX_SCALE_PERCENT, MIN_SCALE_PERCENT};

/// The immutable tuple negotiated at connect time: `(screen_width,
/// screen_height, palette_size K, scale_percent s)`. Both sides build
/// identical [`Resizer`](crate::resize::Resizer), [`Quantiser`](crate::quantise::Quantiser),
/// and [`DeltaEngine`](crate::session::delta::DeltaEngine) instances from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub screen_width: u16,
    pub screen_height: u16,
    pub k: u16,
    pub scale_percent: u8,
}

impl SessionConfig {
    pub fn new(screen_width: u16, screen_height: u16, k: u16, scale_percent: u8) -> Result<Self, RelayError> {
        if screen_width == 0 || screen_height == 0 {
            return Err(RelayError::Configuration(
                "screen dimensions must be non-zero".into(),
            ));
        }
        if !(MIN_K..=MAX_K).contains(&k) {
            return Err(RelayError::Configuration(format!(
                "palette size K must be in [{MIN_K}, {MAX_K}], got {k}"
            )));
        }
        if !(MIN_SCALE_PERCENT..=MAX_SCALE_PERCENT).contains(&scale_percent) {
            return Err(RelayError::Configuration(format!(
                "scale_percent must be in [{MIN_SCALE_PERCENT}, {MAX_SCALE_PERCENT}], got {scale_percent}"
            )));
        }
        Ok(Self { screen_width, screen_height, k, scale_percent })
    }

    /// The reference-frame shape `(h, w)` after downscaling by `scale_percent`.
    pub fn reference_shape(&self) -> (usize, usize) {
        let scale = self.scale_percent as f64 / 100.0;
        if scale >= 0.99 {
            return (self.screen_height as usize, self.screen_width as usize);
        }
        let h = (self.screen_height as f64 * scale).round().max(1.0) as usize;
        let w = (self.screen_width as f64 * scale).round().max(1.0) as usize;
        (h, w)
    }
}

/// Cursor position in screen coordinates, carried alongside every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorPosition {
    pub x: u16,
    pub y: u16,
}

impl CursorPosition {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_handshake_computes_scaled_shape() {
        let cfg = SessionConfig::new(1920, 1080, 4, 60).unwrap();
        assert_eq!(cfg.reference_shape(), (648, 1152));
    }

    #[test]
    fn rejects_k_out_of_range() {
        assert!(SessionConfig::new(100, 100, 1, 50).is_err());
        assert!(SessionConfig::new(100, 100, 300, 50).is_err());
    }

    #[test]
    fn rejects_scale_out_of_range() {
        assert!(SessionConfig::new(100, 100, 4, 0).is_err());
        assert!(SessionConfig::new(100, 100, 4, 101).is_err());
    }
}
