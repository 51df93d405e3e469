//! Pixel-depth reduction: map an RGB [`Frame`] down to `K` palette indices.
//!
//! Two concrete strategies exist behind one tagged enum — greyscale
//! (implicit, evenly-spaced luminance palette) and RGB-palette (an explicit,
//! cached palette with nearest-colour lookup). The session owns one
//! concrete [`Quantiser`] value by composition rather than dispatching
//! through a trait object.

mod greyscale;
mod palette;

pub use greyscale::GreyscaleQuantiser;
pub use palette::{Palette, PaletteCache, PaletteQuantiser};

use serde::{Deserialize, Serialize};

use crate::error::RelayError;
use crate::frame::{Frame, QuantisedFrame};

/// Which concrete [`Quantiser`] strategy a config file selects. Kept
/// separate from the `Quantiser` enum itself: this is a small,
/// `serde`-friendly tag a host or viewer binary loads from TOML, not a
/// built quantiser holding LUTs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantiserKind {
    Greyscale,
    RgbPalette,
}

impl Default for QuantiserKind {
    fn default() -> Self {
        QuantiserKind::Greyscale
    }
}

/// Minimum and maximum palette size accepted anywhere a `K` is configured.
pub const MIN_K: u16 = 2;
pub const MAX_K: u16 = 256;

/// `bits_per_value = ceil(log2(k))`, with the K=1 degenerate case (single
/// colour) still packing into one bit since the Packer has no zero-bit
/// representation.
pub fn bits_per_value(k: u16) -> u8 {
    if k <= 1 {
        return 1;
    }
    (16 - (k - 1).leading_zeros()) as u8
}

/// A concrete quantisation strategy, selected once per session and shared
/// by both the encoder and the decoder.
#[derive(Clone)]
pub enum Quantiser {
    Greyscale(GreyscaleQuantiser),
    RgbPalette(PaletteQuantiser),
}

impl Quantiser {
    pub fn greyscale(k: u16) -> Result<Self, RelayError> {
        Ok(Quantiser::Greyscale(GreyscaleQuantiser::new(k)?))
    }

    pub fn rgb_palette(k: u16, palette: Palette) -> Result<Self, RelayError> {
        Ok(Quantiser::RgbPalette(PaletteQuantiser::new(k, palette)?))
    }

    pub fn k(&self) -> u16 {
        match self {
            Quantiser::Greyscale(q) => q.k(),
            Quantiser::RgbPalette(q) => q.k(),
        }
    }

    pub fn bits_per_value(&self) -> u8 {
        bits_per_value(self.k())
    }

    pub fn quantise(&self, frame: &Frame) -> QuantisedFrame {
        match self {
            Quantiser::Greyscale(q) => q.quantise(frame),
            Quantiser::RgbPalette(q) => q.quantise(frame),
        }
    }

    pub fn dequantise(&self, frame: &QuantisedFrame) -> Frame {
        match self {
            Quantiser::Greyscale(q) => q.dequantise(frame),
            Quantiser::RgbPalette(q) => q.dequantise(frame),
        }
    }
}

fn validate_k(k: u16) -> Result<(), RelayError> {
    if k < MIN_K || k > MAX_K {
        return Err(RelayError::Configuration(format!(
            "palette size K must be in [{MIN_K}, {MAX_K}], got {k}"
        )));
    }
    Ok(())
}
