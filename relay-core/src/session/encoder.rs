//! `EncoderSession` — the sender side of a stream: handshake, then a
//! capture/encode/request-gate loop per §4.8. The commit-ordering discipline
//! is the one invariant this module exists to protect: the reference is
//! advanced only *after* a request is observed, never eagerly, so a dropped
//! frame never desynchronises the two `DeltaEngine`s.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::net::TcpStream;

use crate::compress::Compressor;
use crate::error::RelayError;
use crate::quantise::Quantiser;
use crate::resize::Resizer;
use crate::session::collab::ScreenCapture;
use crate::session::delta::DeltaEngine;
use crate::session::pipeline::PipelineCoordinator;
use crate::session::transport::FrameTransport;
use crate::session::types::SessionConfig;
use crate::session::wire::{decode_k, FrameHeader};
use crate::session::ShutdownFlag;

/// Default wait for the viewer's request byte before discarding the
/// just-encoded frame and looping back to capture the next one.
pub const DEFAULT_REQUEST_GATE_TIMEOUT: Duration = Duration::from_millis(10);

pub struct EncoderSession<C: ScreenCapture> {
    transport: FrameTransport,
    coordinator: PipelineCoordinator,
    delta: DeltaEngine,
    capture: C,
    config: SessionConfig,
    frame_index: u32,
    request_gate_timeout: Duration,
}

impl<C: ScreenCapture> EncoderSession<C> {
    /// Run the handshake over an already-connected stream: send the
    /// capture's native width/height, receive the viewer's chosen K and
    /// scale percent, then build the pipeline from them.
    pub async fn handshake(
        stream: TcpStream,
        mut capture: C,
        compressor: Compressor,
        quantiser_for_k: impl FnOnce(u16) -> Result<Quantiser, RelayError>,
    ) -> Result<Self, RelayError> {
        let (width, height) = capture.screen_size();
        let mut transport = FrameTransport::new(stream);

        transport.send_raw(&width.to_be_bytes()).await?;
        transport.send_raw(&height.to_be_bytes()).await?;

        let k_byte = transport.recv_raw(1).await?[0];
        let scale_byte = transport.recv_raw(1).await?[0];

        let config = SessionConfig::new(width, height, decode_k(k_byte), scale_byte)?;

        let quantiser = quantiser_for_k(config.k)?;
        let resizer = Resizer::new(config.scale_percent)?;
        let (h, w) = config.reference_shape();
        let delta = DeltaEngine::new(h, w, config.k);
        let coordinator = PipelineCoordinator::new(resizer, quantiser, compressor);

        tracing::info!(
            width = config.screen_width,
            height = config.screen_height,
            k = config.k,
            scale_percent = config.scale_percent,
            "encoder session handshake complete"
        );

        Ok(Self {
            transport,
            coordinator,
            delta,
            capture,
            config,
            frame_index: 0,
            request_gate_timeout: DEFAULT_REQUEST_GATE_TIMEOUT,
        })
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn set_request_gate_timeout(&mut self, timeout: Duration) {
        self.request_gate_timeout = timeout;
    }

    /// The §4.8 main loop: capture, encode holding a candidate reference,
    /// poll for a request, and on success commit the reference and send.
    /// Runs until `shutdown` is signalled or a hard transport error occurs.
    pub async fn run(&mut self, shutdown: &ShutdownFlag) -> Result<(), RelayError> {
        while !shutdown.is_set() {
            self.run_once().await?;
        }
        Ok(())
    }

    /// One iteration of the loop; public so callers can drive it explicitly
    /// (tests, or a caller wanting finer-grained control than `run`).
    pub async fn run_once(&mut self) -> Result<(), RelayError> {
        let (frame, cursor) = self.capture.capture()?;
        let captured_ms = now_ms();

        let (_, candidate, payload) = self.coordinator.encode(&frame, &self.delta)?;
        let encoded_ms = now_ms();

        match self.transport.recv_raw_soft(1, self.request_gate_timeout).await {
            Ok(_) => {
                self.delta.advance(candidate)?;
                let header = FrameHeader {
                    frame_index: self.frame_index,
                    captured_ms,
                    encoded_ms,
                    cursor_x: cursor.x,
                    cursor_y: cursor.y,
                };
                let message = header.encode(&payload);
                self.transport.send_framed(&message).await?;
                self.frame_index = self.frame_index.wrapping_add(1);
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                tracing::debug!("request gate timed out, discarding frame");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
