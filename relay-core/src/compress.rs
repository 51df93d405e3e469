//! Generic byte-stream compression.
//!
//! One [`Compressor`] is selected per session and used symmetrically by the
//! encoder and decoder; no per-chunk algorithm auto-selection happens here.

use std::io::{Read, Write};

use flate2::Compression as Flate2Level;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::RelayError;

/// A generic deflate-family byte-stream codec.
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    level: u32,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(6)
    }
}

impl Compressor {
    /// `level` is clamped to zlib's `0..=9` range.
    pub fn new(level: u32) -> Self {
        Self { level: level.min(9) }
    }

    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>, RelayError> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Flate2Level::new(self.level));
        encoder
            .write_all(data)
            .map_err(|e| RelayError::Codec(format!("zlib compress failed: {e}")))?;
        encoder
            .finish()
            .map_err(|e| RelayError::Codec(format!("zlib compress failed: {e}")))
    }

    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, RelayError> {
        let mut decoder = ZlibDecoder::new(data);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| RelayError::Codec(format!("zlib decompress failed: {e}")))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_bytes() {
        let compressor = Compressor::default();
        let data = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let compressed = compressor.compress(&data).unwrap();
        let decompressed = compressor.decompress(&compressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn empty_input_roundtrips() {
        let compressor = Compressor::default();
        let compressed = compressor.compress(&[]).unwrap();
        let decompressed = compressor.decompress(&compressed).unwrap();
        assert!(decompressed.is_empty());
    }

    #[test]
    fn all_zero_payload_compresses_small() {
        let compressor = Compressor::default();
        let zeros = vec![0u8; 186_624];
        let compressed = compressor.compress(&zeros).unwrap();
        assert!(compressed.len() < 1_000);
    }

    #[test]
    fn rejects_garbage_on_decompress() {
        let compressor = Compressor::default();
        let err = compressor.decompress(&[0xFF, 0x00, 0x11, 0x22]).unwrap_err();
        assert!(matches!(err, RelayError::Codec(_)));
    }
}
