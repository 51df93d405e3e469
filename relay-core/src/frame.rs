//! Frame types flowing through the pipeline.
//!
//! `Frame` is the dense RGB capture as it leaves the screen-capture
//! collaborator; `QuantisedFrame` is what every stage from the Quantiser
//! onward operates on. Distinct from any wire-level message type — these
//! are in-process working buffers, never serialized directly.

/// A dense, contiguous (height, width, 3) RGB frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    height: usize,
    width: usize,
    data: Vec<u8>,
}

impl Frame {
    /// Build a frame from raw RGB bytes. `data.len()` must equal
    /// `height * width * 3`.
    pub fn new(height: usize, width: usize, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            height * width * 3,
            "frame data length does not match height*width*3"
        );
        Self { height, width, data }
    }

    /// An all-zero frame of the given shape.
    pub fn zeroed(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            data: vec![0u8; height * width * 3],
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The RGB triple at `(y, x)`.
    pub fn pixel(&self, y: usize, x: usize) -> (u8, u8, u8) {
        let i = (y * self.width + x) * 3;
        (self.data[i], self.data[i + 1], self.data[i + 2])
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// A single-channel frame whose values are palette indices in `[0, k)`.
///
/// Invariant: every value is strictly less than the `k` the frame was
/// quantised or constructed against — checked at every construction site,
/// never assumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantisedFrame {
    height: usize,
    width: usize,
    k: u16,
    data: Vec<u8>,
}

impl QuantisedFrame {
    /// Build a quantised frame, panicking in debug builds if any value is
    /// out of range. Callers that cannot guarantee the invariant up front
    /// should use [`QuantisedFrame::try_new`].
    pub fn new(height: usize, width: usize, k: u16, data: Vec<u8>) -> Self {
        Self::try_new(height, width, k, data).expect("quantised value out of range")
    }

    /// Fallible constructor — used by the Packer's `unpack` path where the
    /// bytes come from an untrusted peer.
    pub fn try_new(
        height: usize,
        width: usize,
        k: u16,
        data: Vec<u8>,
    ) -> Result<Self, crate::error::RelayError> {
        if data.len() != height * width {
            return Err(crate::error::RelayError::ShapeMismatch {
                expected: (height, width),
                actual: (0, data.len()),
            });
        }
        if let Some(&bad) = data.iter().find(|&&v| v as u16 >= k) {
            return Err(crate::error::RelayError::Codec(format!(
                "quantised value {bad} out of range for k={k}"
            )));
        }
        Ok(Self { height, width, k, data })
    }

    /// The all-zero quantised frame of shape `(height, width)` and modulus
    /// `k` — the DeltaEngine's initial reference.
    pub fn zeroed(height: usize, width: usize, k: u16) -> Self {
        Self {
            height,
            width,
            k,
            data: vec![0u8; height * width],
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn k(&self) -> u16 {
        self.k
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_frame_has_correct_shape() {
        let f = Frame::zeroed(2, 3);
        assert_eq!(f.shape(), (2, 3));
        assert_eq!(f.data().len(), 18);
    }

    #[test]
    fn quantised_rejects_out_of_range_value() {
        let err = QuantisedFrame::try_new(1, 2, 4, vec![0, 5]).unwrap_err();
        assert!(matches!(err, crate::error::RelayError::Codec(_)));
    }

    #[test]
    fn quantised_rejects_shape_mismatch() {
        let err = QuantisedFrame::try_new(2, 2, 4, vec![0, 1, 2]).unwrap_err();
        assert!(matches!(err, crate::error::RelayError::ShapeMismatch { .. }));
    }

    #[test]
    fn pixel_reads_correct_triple() {
        let f = Frame::new(1, 2, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(f.pixel(0, 1), (4, 5, 6));
    }
}
