//! Collaborator interfaces the session consumes but never implements.
//! Concrete screen capture lives in `relay-host` (platform-gated, DXGI-style
//! on Windows); a concrete renderer lives in `relay-viewer` (a logging stub,
//! since pygame-equivalent rendering is out of scope here). Both traits are
//! synchronous by design: a blocking, OS-bound call invoked from the
//! session's single task, not an async trait spanning an executor boundary.

use crate::error::RelayError;
use crate::frame::Frame;
use crate::session::types::CursorPosition;

/// Provides a screen capture and the current cursor position on demand.
pub trait ScreenCapture: Send {
    /// The screen's native `(width, height)`, sent during the handshake.
    fn screen_size(&self) -> (u16, u16);

    /// Capture the current frame and cursor position.
    fn capture(&mut self) -> Result<(Frame, CursorPosition), RelayError>;
}

/// Consumes a decoded frame and the cursor position delivered alongside it.
pub trait Renderer: Send {
    fn present(&mut self, frame: Frame, cursor: CursorPosition) -> Result<(), RelayError>;
}
