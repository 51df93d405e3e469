//! Error taxonomy for the relay pipeline and streaming protocol.
//!
//! All fallible operations return `Result<T, RelayError>`. No panics on
//! invalid input — every error is typed and recoverable, except where the
//! propagation policy mandates a session close (see variant docs below).

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for `relay-core`.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Invalid `K`, `s`, or shape, raised at construction time. Fatal to the
    /// session — there is no partially-valid configuration to fall back to.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A frame, quantised frame, or packed array did not match the shape
    /// the session was built for. The call is rejected and no state is
    /// mutated.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// The peer closed the connection or the socket became unusable. The
    /// session transitions to `CLOSED`.
    #[error("transport terminated: {0}")]
    TransportTerminated(String),

    /// A bounded wait expired. `soft` distinguishes the encoder's
    /// request-gate poll (recoverable, loop back) from every other timeout
    /// (hard — the session closes).
    #[error("transport timeout after {elapsed:?} (soft={soft})")]
    TransportTimeout { elapsed: Duration, soft: bool },

    /// Truncated or self-inconsistent compressed/packed data. The codec
    /// layers never recover from this: the reference frame would be left
    /// in a state the peer does not share, so the session closes.
    #[error("codec error: {0}")]
    Codec(String),
}

impl RelayError {
    /// A hard transport timeout (anything but the request-gate poll).
    pub fn hard_timeout(elapsed: Duration) -> Self {
        RelayError::TransportTimeout { elapsed, soft: false }
    }

    /// The encoder's request-gate timeout — recoverable, the caller should
    /// loop back to capturing the next frame.
    pub fn soft_timeout(elapsed: Duration) -> Self {
        RelayError::TransportTimeout { elapsed, soft: true }
    }

    /// True if this error, per the propagation policy in the design notes,
    /// should be absorbed locally rather than surfaced to close the
    /// session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RelayError::TransportTimeout { soft: true, .. })
    }
}
