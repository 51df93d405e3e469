//! RGB-palette quantisation: nearest-colour lookup against a deterministic,
//! disk-cached palette.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::validate_k;
use crate::error::RelayError;
use crate::frame::{Frame, QuantisedFrame};

/// An ordered sequence of `(R, G, B)` triples, length `K`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colours: Vec<(u8, u8, u8)>,
}

impl Palette {
    /// Deterministically generate `k` "soft" colours by sampling an evenly
    /// spaced grid of the RGB cube. Deterministic in `k` alone — two
    /// processes asked for the same `k` always produce byte-identical
    /// palettes, which is what makes the disk cache safe to share across
    /// sessions.
    pub fn generate(k: u16) -> Self {
        let side = (k as f64).cbrt().ceil().max(1.0) as u32;
        let mut colours = Vec::with_capacity(k as usize);
        'outer: for ri in 0..side {
            for gi in 0..side {
                for bi in 0..side {
                    if colours.len() as u16 >= k {
                        break 'outer;
                    }
                    let level = |i: u32| -> u8 {
                        if side == 1 {
                            128
                        } else {
                            ((i * 255) / (side - 1)) as u8
                        }
                    };
                    colours.push((level(ri), level(gi), level(bi)));
                }
            }
        }
        Self { colours }
    }

    pub fn len(&self) -> usize {
        self.colours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colours.is_empty()
    }

    pub fn colours(&self) -> &[(u8, u8, u8)] {
        &self.colours
    }

    /// Nearest palette index to `(r, g, b)` by squared Euclidean distance.
    fn nearest(&self, r: u8, g: u8, b: u8) -> u8 {
        let (r, g, b) = (r as i32, g as i32, b as i32);
        self.colours
            .iter()
            .enumerate()
            .map(|(idx, &(pr, pg, pb))| {
                let dr = r - pr as i32;
                let dg = g - pg as i32;
                let db = b - pb as i32;
                (idx, dr * dr + dg * dg + db * db)
            })
            .min_by_key(|&(_, dist)| dist)
            .map(|(idx, _)| idx as u8)
            .unwrap_or(0)
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.colours.iter().flat_map(|&(r, g, b)| [r, g, b]).collect()
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            colours: bytes.chunks_exact(3).map(|c| (c[0], c[1], c[2])).collect(),
        }
    }
}

/// A `256^3`-entry lookup table mapping every possible `(r, g, b)` to its
/// nearest palette index, built once per `K` and shared by every session
/// that requests that `K`.
pub(crate) struct Lut {
    palette: Palette,
    table: Vec<u8>,
}

impl Lut {
    fn build(palette: Palette) -> Self {
        let mut table = vec![0u8; 256 * 256 * 256];
        for r in 0..256usize {
            for g in 0..256usize {
                for b in 0..256usize {
                    let idx = (r << 16) | (g << 8) | b;
                    table[idx] = palette.nearest(r as u8, g as u8, b as u8);
                }
            }
        }
        Self { palette, table }
    }

    fn lookup(&self, r: u8, g: u8, b: u8) -> u8 {
        let idx = ((r as usize) << 16) | ((g as usize) << 8) | (b as usize);
        self.table[idx]
    }
}

/// Injected at session construction rather than kept as a process-global
/// singleton. The on-disk file is written atomically (write-to-temp, then
/// rename) and is read-only after creation, so concurrent sessions asking
/// for the same `K` may share it safely.
#[derive(Clone)]
pub struct PaletteCache {
    dir: PathBuf,
}

impl PaletteCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn cache_path(&self, k: u16) -> PathBuf {
        self.dir.join(format!("palette-k{k}.lut"))
    }

    /// Load the cached LUT for `k` from disk, or build and persist a new
    /// one on a miss. Crate-private: `Lut` is an implementation detail of
    /// this module, reached from outside only through
    /// [`PaletteQuantiser::from_cache`].
    pub(crate) fn get_or_build(&self, k: u16) -> Result<Arc<Lut>, RelayError> {
        let path = self.cache_path(k);
        if let Ok(bytes) = std::fs::read(&path) {
            if let Some(lut) = Self::parse(k, &bytes) {
                return Ok(Arc::new(lut));
            }
            tracing::warn!(k, path = %path.display(), "palette cache file corrupt, rebuilding");
        }

        let palette = Palette::generate(k);
        let lut = Lut::build(palette);
        self.persist(&path, &lut)?;
        Ok(Arc::new(lut))
    }

    fn parse(k: u16, bytes: &[u8]) -> Option<Lut> {
        let palette_len = k as usize * 3;
        if bytes.len() != palette_len + 256 * 256 * 256 {
            return None;
        }
        let palette = Palette::from_bytes(&bytes[..palette_len]);
        let table = bytes[palette_len..].to_vec();
        Some(Lut { palette, table })
    }

    fn persist(&self, path: &Path, lut: &Lut) -> Result<(), RelayError> {
        let io_err = |e: std::io::Error| {
            RelayError::Configuration(format!("palette cache write to {}: {e}", self.dir.display()))
        };
        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        let tmp_path = path.with_extension("lut.tmp");
        let mut file = std::fs::File::create(&tmp_path).map_err(io_err)?;
        file.write_all(&lut.palette.to_bytes()).map_err(io_err)?;
        file.write_all(&lut.table).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        std::fs::rename(&tmp_path, path).map_err(io_err)?;
        Ok(())
    }
}

/// Nearest-palette-index quantisation backed by a cached LUT.
#[derive(Clone)]
pub struct PaletteQuantiser {
    k: u16,
    lut: Arc<Lut>,
}

impl PaletteQuantiser {
    /// Build directly from an already-known palette, bypassing the disk
    /// cache (used in tests and whenever the caller already holds a
    /// `Palette`, e.g. after receiving one negotiated out-of-band).
    pub fn new(k: u16, palette: Palette) -> Result<Self, RelayError> {
        validate_k(k)?;
        if palette.len() != k as usize {
            return Err(RelayError::Configuration(format!(
                "palette length {} does not match k={k}",
                palette.len()
            )));
        }
        Ok(Self {
            k,
            lut: Arc::new(Lut::build(palette)),
        })
    }

    /// Build from a session-wide [`PaletteCache`], reusing a previously
    /// persisted LUT when available.
    pub fn from_cache(k: u16, cache: &PaletteCache) -> Result<Self, RelayError> {
        validate_k(k)?;
        Ok(Self {
            k,
            lut: cache.get_or_build(k)?,
        })
    }

    pub fn k(&self) -> u16 {
        self.k
    }

    pub fn palette(&self) -> &Palette {
        &self.lut.palette
    }

    pub fn quantise(&self, frame: &Frame) -> QuantisedFrame {
        let (h, w) = frame.shape();
        let mut data = Vec::with_capacity(h * w);
        for y in 0..h {
            for x in 0..w {
                let (r, g, b) = frame.pixel(y, x);
                data.push(self.lut.lookup(r, g, b));
            }
        }
        QuantisedFrame::new(h, w, self.k, data)
    }

    pub fn dequantise(&self, frame: &QuantisedFrame) -> Frame {
        let (h, w) = frame.shape();
        let mut data = Vec::with_capacity(h * w * 3);
        for &q in frame.data() {
            let (r, g, b) = self.lut.palette.colours()[q as usize];
            data.extend_from_slice(&[r, g, b]);
        }
        Frame::new(h, w, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_exactly_k_colours() {
        let p = Palette::generate(4);
        assert_eq!(p.len(), 4);
        let p = Palette::generate(200);
        assert_eq!(p.len(), 200);
    }

    #[test]
    fn generate_is_deterministic() {
        assert_eq!(Palette::generate(16), Palette::generate(16));
    }

    #[test]
    fn quantise_maps_exact_palette_colour_to_its_own_index() {
        let palette = Palette::generate(8);
        let (r, g, b) = palette.colours()[3];
        let q = PaletteQuantiser::new(8, palette).unwrap();
        let frame = Frame::new(1, 1, vec![r, g, b]);
        assert_eq!(q.quantise(&frame).data(), &[3]);
    }

    #[test]
    fn dequantise_round_trips_palette_colour() {
        let palette = Palette::generate(8);
        let q = PaletteQuantiser::new(8, palette.clone()).unwrap();
        let quantised = QuantisedFrame::new(1, 1, 8, vec![2]);
        let back = q.dequantise(&quantised);
        assert_eq!(back.pixel(0, 0), palette.colours()[2]);
    }

    #[test]
    fn rejects_palette_length_mismatch() {
        let palette = Palette::generate(8);
        assert!(PaletteQuantiser::new(4, palette).is_err());
    }
}
