//! [`Renderer`] implementations. Real rendering is a pygame equivalent
//! explicitly out of scope per §1; [`LoggingRenderer`] logs each delivered
//! frame's shape and cursor position at `debug` level and tracks a running
//! frame count, standing in for whatever presentation surface a GUI build of
//! this binary would add. [`MailboxRenderer`] instead hands each frame to a
//! [`relay_core::FrameMailboxTx`] so the decode loop and the render loop can
//! run on separate tasks per §5's permitted concurrency model — the decode
//! task never blocks on however long presentation takes.

use relay_core::session::collab::Renderer;
use relay_core::session::types::CursorPosition;
use relay_core::{Frame, FrameMailboxTx, RelayError};

pub struct LoggingRenderer {
    frames_presented: u64,
}

impl LoggingRenderer {
    pub fn new() -> Self {
        Self { frames_presented: 0 }
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    fn log(&mut self, frame: &Frame, cursor: CursorPosition) {
        self.frames_presented += 1;
        tracing::debug!(
            frame = self.frames_presented,
            height = frame.height(),
            width = frame.width(),
            cursor_x = cursor.x,
            cursor_y = cursor.y,
            "frame delivered"
        );
    }
}

impl Default for LoggingRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for LoggingRenderer {
    fn present(&mut self, frame: Frame, cursor: CursorPosition) -> Result<(), RelayError> {
        self.log(&frame, cursor);
        Ok(())
    }
}

/// A [`Renderer`] that never does presentation work itself — it just drops
/// the decoded frame into the mailbox's write half and returns immediately,
/// so the decoder session's loop stays hot regardless of how the render
/// task downstream keeps up.
pub struct MailboxRenderer {
    tx: FrameMailboxTx,
}

impl MailboxRenderer {
    pub fn new(tx: FrameMailboxTx) -> Self {
        Self { tx }
    }
}

impl Renderer for MailboxRenderer {
    fn present(&mut self, frame: Frame, cursor: CursorPosition) -> Result<(), RelayError> {
        self.tx.put(frame, cursor);
        Ok(())
    }
}

/// Drains the mailbox's read half on its own task, logging each frame
/// through a [`LoggingRenderer`] as it arrives. Runs until the decode task
/// drops its [`FrameMailboxTx`], at which point `recv` returns `None`.
pub async fn run_render_loop(mut rx: relay_core::FrameMailboxRx) {
    let mut renderer = LoggingRenderer::new();
    while let Some(delivered) = rx.recv().await {
        renderer.log(&delivered.frame, delivered.cursor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_presented_frames() {
        let mut renderer = LoggingRenderer::new();
        let frame = Frame::zeroed(2, 2);
        renderer.present(frame.clone(), CursorPosition::default()).unwrap();
        renderer.present(frame, CursorPosition::new(1, 1)).unwrap();
        assert_eq!(renderer.frames_presented(), 2);
    }

    #[tokio::test]
    async fn mailbox_renderer_feeds_render_loop() {
        let (tx, rx) = relay_core::frame_mailbox();
        let mut renderer = MailboxRenderer::new(tx);
        renderer.present(Frame::zeroed(4, 4), CursorPosition::new(5, 6)).unwrap();
        assert_eq!(rx.latest().unwrap().frame.shape(), (4, 4));
    }
}
