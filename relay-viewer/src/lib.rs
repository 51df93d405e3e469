//! Relay viewer -- decoder-side client. Connects to a relay-host control
//! port, runs the handshake and frame-request/receive loop, and hands each
//! decoded frame to a [`renderer::LoggingRenderer`].

pub mod config;
pub mod renderer;
