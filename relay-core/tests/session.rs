//! Full encoder/decoder pair over a localhost TCP loopback, using an
//! ephemeral bound listener to pick a free local port.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};

use relay_core::{
    Compressor, CursorPosition, DecoderSession, EncoderSession, Frame, Quantiser, RelayError,
    Renderer, ScreenCapture, ShutdownFlag,
};

struct CountingCapture {
    width: u16,
    height: u16,
    counter: Arc<AtomicU32>,
}

impl ScreenCapture for CountingCapture {
    fn screen_size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn capture(&mut self) -> Result<(Frame, CursorPosition), RelayError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let fill = (n % 4) as u8;
        let data = vec![fill; self.width as usize * self.height as usize * 3];
        let frame = Frame::new(self.height as usize, self.width as usize, data);
        Ok((frame, CursorPosition::new((n % 1000) as u16, (n % 800) as u16)))
    }
}

struct CollectingRenderer {
    presented: Arc<Mutex<Vec<(usize, usize, CursorPosition)>>>,
}

impl Renderer for CollectingRenderer {
    fn present(&mut self, frame: Frame, cursor: CursorPosition) -> Result<(), RelayError> {
        self.presented.lock().unwrap().push((frame.height(), frame.width(), cursor));
        Ok(())
    }
}

async fn ephemeral_loopback() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
    let (server, _) = listener.accept().await.unwrap();
    (server, client.await.unwrap())
}

/// Geometry handshake, then the encoder runs freely while the decoder
/// issues a bounded number of requests; it should receive exactly that many
/// frames, each of the original screen shape.
#[tokio::test]
async fn full_encoder_decoder_loopback_session() {
    let (host_stream, viewer_stream) = ephemeral_loopback().await;

    let capture = CountingCapture {
        width: 16,
        height: 12,
        counter: Arc::new(AtomicU32::new(0)),
    };
    let presented = Arc::new(Mutex::new(Vec::new()));
    let renderer = CollectingRenderer { presented: presented.clone() };

    let encoder_handle = tokio::spawn(async move {
        EncoderSession::handshake(host_stream, capture, Compressor::default(), Quantiser::greyscale)
            .await
            .unwrap()
    });
    let decoder_handle = tokio::spawn(async move {
        DecoderSession::handshake(
            viewer_stream,
            renderer,
            4,
            100,
            Quantiser::greyscale(4).unwrap(),
            Compressor::default(),
        )
        .await
        .unwrap()
    });

    let mut encoder = encoder_handle.await.unwrap();
    let mut decoder = decoder_handle.await.unwrap();

    assert_eq!(encoder.config().reference_shape(), (12, 16));
    assert_eq!(decoder.config().reference_shape(), (12, 16));

    let shutdown = ShutdownFlag::new();
    let encoder_shutdown = shutdown.clone();
    let encoder_task = tokio::spawn(async move { encoder.run(&encoder_shutdown).await });

    for _ in 0..3 {
        decoder.run_once().await.unwrap();
    }
    shutdown.signal();

    let _ = tokio::time::timeout(Duration::from_secs(2), encoder_task).await;

    let frames = presented.lock().unwrap();
    assert_eq!(frames.len(), 3);
    for (h, w, _) in frames.iter() {
        assert_eq!((*h, *w), (12, 16));
    }
}

/// A decoder that never requests a frame should see the connection reach a
/// clean handshake but make no progress beyond it — encoder frames are
/// discarded, never delivered, until asked for.
#[tokio::test]
async fn no_request_means_no_delivery() {
    let (host_stream, viewer_stream) = ephemeral_loopback().await;

    let capture = CountingCapture {
        width: 8,
        height: 8,
        counter: Arc::new(AtomicU32::new(0)),
    };
    let presented = Arc::new(Mutex::new(Vec::new()));
    let renderer = CollectingRenderer { presented: presented.clone() };

    let encoder_handle = tokio::spawn(async move {
        EncoderSession::handshake(host_stream, capture, Compressor::default(), Quantiser::greyscale)
            .await
            .unwrap()
    });
    let decoder_handle = tokio::spawn(async move {
        DecoderSession::handshake(
            viewer_stream,
            renderer,
            4,
            100,
            Quantiser::greyscale(4).unwrap(),
            Compressor::default(),
        )
        .await
        .unwrap()
    });

    let mut encoder = encoder_handle.await.unwrap();
    let _decoder = decoder_handle.await.unwrap();

    for _ in 0..5 {
        encoder.run_once().await.unwrap();
    }

    assert!(presented.lock().unwrap().is_empty());
}
