//! `DecoderSession` — the receiver side of a stream: handshake, then a
//! request/receive/decode/deliver loop per §4.9. Every received frame is
//! fully decoded and delivered; none are skipped, because skipping would
//! desynchronise the reference the encoder already committed to.

use std::time::Duration;

use tokio::net::TcpStream;

use crate::compress::Compressor;
use crate::error::RelayError;
use crate::quantise::Quantiser;
use crate::resize::Resizer;
use crate::session::collab::Renderer;
use crate::session::delta::DeltaEngine;
use crate::session::pipeline::PipelineCoordinator;
use crate::session::transport::FrameTransport;
use crate::session::types::{CursorPosition, SessionConfig};
use crate::session::wire::{encode_k, FrameHeader};
use crate::session::ShutdownFlag;

/// Default bound on waiting for a requested frame to arrive; expiry is a
/// hard timeout (the session closes), unlike the encoder's soft
/// request-gate poll.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Single-byte request message the decoder sends to ask for a frame.
const REQUEST_BYTE: u8 = 0x01;

pub struct DecoderSession<R: Renderer> {
    transport: FrameTransport,
    coordinator: PipelineCoordinator,
    delta: DeltaEngine,
    renderer: R,
    config: SessionConfig,
    original_shape: (usize, usize),
}

impl<R: Renderer> DecoderSession<R> {
    /// Run the handshake over an already-connected stream: receive the
    /// host's native width/height, then send the requested K and scale
    /// percent.
    pub async fn handshake(
        stream: TcpStream,
        renderer: R,
        k: u16,
        scale_percent: u8,
        quantiser: Quantiser,
        compressor: Compressor,
    ) -> Result<Self, RelayError> {
        let mut transport = FrameTransport::new(stream);
        transport.set_timeout(DEFAULT_RECV_TIMEOUT);

        let width = u16::from_be_bytes(transport.recv_raw(2).await?.try_into().unwrap());
        let height = u16::from_be_bytes(transport.recv_raw(2).await?.try_into().unwrap());

        transport.send_raw(&[encode_k(k)]).await?;
        transport.send_raw(&[scale_percent]).await?;

        let config = SessionConfig::new(width, height, k, scale_percent)?;
        let resizer = Resizer::new(scale_percent)?;
        let (h, w) = config.reference_shape();
        let delta = DeltaEngine::new(h, w, k);
        let coordinator = PipelineCoordinator::new(resizer, quantiser, compressor);

        tracing::info!(
            width = config.screen_width,
            height = config.screen_height,
            k = config.k,
            scale_percent = config.scale_percent,
            "decoder session handshake complete"
        );

        Ok(Self {
            transport,
            coordinator,
            delta,
            renderer,
            config,
            original_shape: (height as usize, width as usize),
        })
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// The §4.9 main loop: request a frame, receive and decode it, deliver
    /// it to the renderer. Runs until `shutdown` is signalled or a
    /// transport error occurs.
    pub async fn run(&mut self, shutdown: &ShutdownFlag) -> Result<(), RelayError> {
        while !shutdown.is_set() {
            self.run_once().await?;
        }
        Ok(())
    }

    pub async fn run_once(&mut self) -> Result<(), RelayError> {
        self.transport.send_raw(&[REQUEST_BYTE]).await?;
        let message = self.transport.recv_framed().await?;
        let (header, payload) = FrameHeader::decode(&message)?;

        let (_, frame) = self.coordinator.decode(payload, &mut self.delta, self.original_shape)?;
        let cursor = CursorPosition::new(header.cursor_x, header.cursor_y);
        self.renderer.present(frame, cursor)?;
        Ok(())
    }
}
