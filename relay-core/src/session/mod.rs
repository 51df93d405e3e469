//! A live connection's moving parts: the negotiated [`types::SessionConfig`],
//! the [`delta::DeltaEngine`] reference-frame state, the
//! [`pipeline::PipelineCoordinator`] that composes the codec stages, the
//! [`transport::FrameTransport`] framing layer, and the
//! [`encoder::EncoderSession`] / [`decoder::DecoderSession`] state machines
//! that drive a connection end to end.
//!
//! `collab` holds the two traits the session consumes but does not
//! implement — screen capture and rendering are external collaborators
//! provided by `relay-host` and `relay-viewer` respectively.

pub mod collab;
pub mod decoder;
pub mod delta;
pub mod encoder;
pub mod mailbox;
pub mod pipeline;
pub mod transport;
pub mod types;
pub mod wire;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cooperative shutdown signal shared between a session task and whatever
/// spawned it. Sessions check this at every suspension point (§5's
/// "cooperative shutdown") rather than being forcibly aborted.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn signal(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
