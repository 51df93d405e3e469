//! `HostService` — accepts viewer connections and drives one
//! [`EncoderSession`] per connection to completion (bind, loop
//! `listener.accept()`, run the session, stop on a shared flag).
//!
//! There is no separate UDP data plane or TCP input channel here: the whole
//! session — handshake, frame stream, and the request gate — runs over the
//! one accepted `TcpStream` via `relay_core::session`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use relay_core::quantise::{PaletteCache, PaletteQuantiser};
use relay_core::{Compressor, EncoderSession, Quantiser, RelayError, ShutdownFlag};

use crate::capture::DxgiScreenCapture;
use crate::config::{HostConfig, QuantiserKind};

/// The top-level host service: owns the TCP control listener and spawns an
/// encoder session per accepted connection.
pub struct HostService {
    config: HostConfig,
    running: Arc<AtomicBool>,
}

impl HostService {
    pub fn new(config: HostConfig) -> Self {
        Self { config, running: Arc::new(AtomicBool::new(false)) }
    }

    /// A handle that can be used to stop the service from another task or
    /// the Windows SCM handler.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Accept viewer connections until stopped. Only one session runs at a
    /// time per §1's explicit non-goal of multi-viewer fan-out — a new
    /// connection is accepted only once the previous one's session task has
    /// finished.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.running.store(true, Ordering::SeqCst);

        let addr = format!("0.0.0.0:{}", self.config.network.control_port);
        let listener = TcpListener::bind(&addr).await?;
        info!("relay-host listening on {addr}");

        while self.running.load(Ordering::SeqCst) {
            let accept = tokio::select! {
                result = listener.accept() => result,
                _ = wait_for_stop(&self.running) => break,
            };

            let (stream, peer) = match accept {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("accept error: {e}");
                    continue;
                }
            };
            info!("viewer connected from {peer}");

            let capture = match DxgiScreenCapture::new(
                self.config.session.monitor_index,
                self.config.session.capture_timeout_ms,
            ) {
                Ok(c) => c,
                Err(e) => {
                    error!("failed to open screen capture: {e}");
                    continue;
                }
            };

            let compressor = Compressor::new(self.config.session.compression_level);
            let quantiser_kind = self.config.session.quantiser;
            let palette_cache_dir = self.config.session.palette_cache_dir.clone();
            let request_gate_timeout =
                std::time::Duration::from_millis(self.config.session.request_gate_timeout_ms);

            let session = EncoderSession::handshake(stream, capture, compressor, move |k| {
                build_quantiser(quantiser_kind, k, &palette_cache_dir)
            })
            .await;

            let mut session = match session {
                Ok(s) => s,
                Err(e) => {
                    warn!("handshake with {peer} failed: {e}");
                    continue;
                }
            };
            session.set_request_gate_timeout(request_gate_timeout);

            let shutdown = ShutdownFlag::new();
            if let Err(e) = session.run(&shutdown).await {
                warn!("session with {peer} ended: {e}");
            } else {
                info!("session with {peer} ended");
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("relay-host service stopped");
        Ok(())
    }
}

fn build_quantiser(kind: QuantiserKind, k: u16, palette_cache_dir: &str) -> Result<Quantiser, RelayError> {
    match kind {
        QuantiserKind::Greyscale => Quantiser::greyscale(k),
        QuantiserKind::RgbPalette => {
            let cache = PaletteCache::new(palette_cache_dir);
            Ok(Quantiser::RgbPalette(PaletteQuantiser::from_cache(k, &cache)?))
        }
    }
}

async fn wait_for_stop(running: &Arc<AtomicBool>) {
    loop {
        if !running.load(Ordering::SeqCst) {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_creates_with_defaults() {
        let svc = HostService::new(HostConfig::default());
        assert!(!svc.is_running());
    }

    #[test]
    fn stop_handle_works() {
        let svc = HostService::new(HostConfig::default());
        let handle = svc.stop_handle();
        handle.store(true, Ordering::SeqCst);
        assert!(svc.is_running());
        svc.stop();
        assert!(!svc.is_running());
    }

    #[test]
    fn build_quantiser_greyscale() {
        let q = build_quantiser(QuantiserKind::Greyscale, 4, "").unwrap();
        assert_eq!(q.k(), 4);
    }
}
