//! `FrameMailbox` — the single-slot, replace-on-write channel §5 allows the
//! viewer to put between its decode task and its renderer: "a small
//! single-slot mailbox passes the latest decoded frame to the renderer
//! (replace-on-write, discard older)". Built on `tokio::sync::watch`, which
//! already has exactly this semantics: a new `send` overwrites whatever the
//! reader hasn't picked up yet, and the reader always observes the latest
//! value rather than queuing every intermediate one.
//!
//! This is the *only* cross-task sharing the design notes permit in the
//! decoder path — single writer (the decode task), single reader (the
//! render task).

use tokio::sync::watch;

use crate::frame::Frame;
use crate::session::types::CursorPosition;

/// A decoded frame paired with the cursor position delivered alongside it.
#[derive(Debug, Clone)]
pub struct MailboxFrame {
    pub frame: Frame,
    pub cursor: CursorPosition,
}

/// The write half, held by the decode task.
#[derive(Clone)]
pub struct FrameMailboxTx(watch::Sender<Option<MailboxFrame>>);

/// The read half, held by the render task.
pub struct FrameMailboxRx(watch::Receiver<Option<MailboxFrame>>);

/// Build a fresh, empty mailbox and its two halves.
pub fn channel() -> (FrameMailboxTx, FrameMailboxRx) {
    let (tx, rx) = watch::channel(None);
    (FrameMailboxTx(tx), FrameMailboxRx(rx))
}

impl FrameMailboxTx {
    /// Replace whatever's in the slot, discarding it unread if the render
    /// task hasn't picked it up yet.
    pub fn put(&self, frame: Frame, cursor: CursorPosition) {
        let _ = self.0.send(Some(MailboxFrame { frame, cursor }));
    }
}

impl FrameMailboxRx {
    /// The slot's current contents without waiting, `None` before the
    /// first frame arrives.
    pub fn latest(&self) -> Option<MailboxFrame> {
        self.0.borrow().clone()
    }

    /// Suspend until the slot has been written to since the last
    /// observation, then return its contents. This is the render task's
    /// suspension point — it never sees a value it has already consumed,
    /// and it never sees more than one value per intervening write burst.
    pub async fn recv(&mut self) -> Option<MailboxFrame> {
        if self.0.changed().await.is_err() {
            return None;
        }
        self.0.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mailbox_has_no_latest() {
        let (_tx, rx) = channel();
        assert!(rx.latest().is_none());
    }

    #[test]
    fn put_replaces_unread_value() {
        let (tx, rx) = channel();
        tx.put(Frame::zeroed(2, 2), CursorPosition::new(1, 1));
        tx.put(Frame::zeroed(3, 3), CursorPosition::new(2, 2));
        let latest = rx.latest().unwrap();
        assert_eq!(latest.frame.shape(), (3, 3));
        assert_eq!(latest.cursor, CursorPosition::new(2, 2));
    }

    #[tokio::test]
    async fn recv_wakes_on_new_value() {
        let (tx, mut rx) = channel();
        tx.put(Frame::zeroed(1, 1), CursorPosition::default());
        let got = rx.recv().await.unwrap();
        assert_eq!(got.frame.shape(), (1, 1));
    }

    #[tokio::test]
    async fn recv_returns_none_once_sender_dropped_and_exhausted() {
        let (tx, mut rx) = channel();
        tx.put(Frame::zeroed(1, 1), CursorPosition::default());
        rx.recv().await.unwrap();
        drop(tx);
        assert!(rx.recv().await.is_none());
    }
}
