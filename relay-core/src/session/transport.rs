//! `FrameTransport` — a length-prefixed message layer over a reliable byte
//! stream: a `TcpStream` wrapper with `set_nodelay` plus a
//! fixed-header-then-payload framing scheme, but built directly over
//! `TcpStream` rather than `tokio_util::codec::Framed` — the session needs
//! exact-count `send_raw`/`recv_raw` primitives and a short, separately
//! timed request-gate poll that a `Decoder`/`Encoder` pair doesn't expose.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::RelayError;

/// Default length-prefix width in bytes.
pub const DEFAULT_HEADER_SIZE: usize = 4;

/// Default hard timeout applied to `send_raw`, `recv_raw`, and the framed
/// operations built on them.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A length-prefixed message layer over a `TcpStream`.
///
/// `closed()` latches `true` the first time any operation observes a
/// terminated peer, a hard timeout, or an I/O error; every subsequent call
/// fails fast with `TransportTerminated` rather than touching the socket
/// again. A soft (request-gate) timeout never latches it — see
/// [`recv_raw_soft`](Self::recv_raw_soft).
pub struct FrameTransport {
    stream: TcpStream,
    header_size: usize,
    timeout: Duration,
    closed: bool,
}

impl FrameTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self::with_header_size(stream, DEFAULT_HEADER_SIZE)
    }

    pub fn with_header_size(stream: TcpStream, header_size: usize) -> Self {
        let _ = stream.set_nodelay(true);
        Self { stream, header_size, timeout: DEFAULT_TIMEOUT, closed: false }
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn closed(&self) -> bool {
        self.closed
    }

    /// The largest payload `send_framed` will accept: `2^(8*header_size) - 1`.
    pub fn max_payload_len(&self) -> u64 {
        if self.header_size >= 8 {
            u64::MAX
        } else {
            (1u64 << (8 * self.header_size)) - 1
        }
    }

    /// Write exactly `buf.len()` bytes, subject to the transport's timeout.
    pub async fn send_raw(&mut self, buf: &[u8]) -> Result<(), RelayError> {
        if self.closed {
            return Err(RelayError::TransportTerminated("transport closed".into()));
        }
        match tokio::time::timeout(self.timeout, self.stream.write_all(buf)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.closed = true;
                Err(RelayError::TransportTerminated(e.to_string()))
            }
            Err(_) => {
                self.closed = true;
                Err(RelayError::hard_timeout(self.timeout))
            }
        }
    }

    /// Read exactly `n` bytes, accumulating short reads, subject to the
    /// transport's timeout. A zero-byte read on an open socket means the
    /// peer is gone.
    pub async fn recv_raw(&mut self, n: usize) -> Result<Vec<u8>, RelayError> {
        self.recv_raw_inner(n, self.timeout, false).await
    }

    /// Like `recv_raw`, but `timeout` expiring is reported as a *soft*
    /// timeout (recoverable, connection stays open) rather than latching
    /// `closed`. Used by the encoder's request-gate poll.
    pub async fn recv_raw_soft(&mut self, n: usize, timeout: Duration) -> Result<Vec<u8>, RelayError> {
        self.recv_raw_inner(n, timeout, true).await
    }

    async fn recv_raw_inner(&mut self, n: usize, timeout: Duration, soft: bool) -> Result<Vec<u8>, RelayError> {
        if self.closed {
            return Err(RelayError::TransportTerminated("transport closed".into()));
        }
        match tokio::time::timeout(timeout, read_exact_accumulate(&mut self.stream, n)).await {
            Ok(Ok(buf)) => Ok(buf),
            Ok(Err(e)) => {
                self.closed = true;
                Err(e)
            }
            Err(_) => {
                if soft {
                    Err(RelayError::soft_timeout(timeout))
                } else {
                    self.closed = true;
                    Err(RelayError::hard_timeout(timeout))
                }
            }
        }
    }

    /// Send a header-size length prefix followed by `payload`.
    pub async fn send_framed(&mut self, payload: &[u8]) -> Result<(), RelayError> {
        let len = payload.len() as u64;
        if len > self.max_payload_len() {
            return Err(RelayError::Codec(format!(
                "payload of {len} bytes exceeds the {}-byte header's maximum of {}",
                self.header_size,
                self.max_payload_len()
            )));
        }
        let len_bytes = len.to_be_bytes();
        let header = len_bytes[8 - self.header_size..].to_vec();
        self.send_raw(&header).await?;
        self.send_raw(payload).await
    }

    /// Receive a length-prefixed message, subject to the transport's
    /// timeout for both the header and the payload.
    pub async fn recv_framed(&mut self) -> Result<Vec<u8>, RelayError> {
        let header = self.recv_raw(self.header_size).await?;
        let mut len_bytes = [0u8; 8];
        len_bytes[8 - self.header_size..].copy_from_slice(&header);
        let len = u64::from_be_bytes(len_bytes) as usize;
        self.recv_raw(len).await
    }
}

async fn read_exact_accumulate(stream: &mut TcpStream, n: usize) -> Result<Vec<u8>, RelayError> {
    let mut buf = vec![0u8; n];
    let mut filled = 0;
    while filled < n {
        let read = stream
            .read(&mut buf[filled..])
            .await
            .map_err(|e| RelayError::TransportTerminated(e.to_string()))?;
        if read == 0 {
            return Err(RelayError::TransportTerminated("peer closed connection".into()));
        }
        filled += read;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn loopback_pair() -> (FrameTransport, FrameTransport) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let (server_stream, _) = listener.accept().await.unwrap();
        let client_stream = client.await.unwrap();
        (FrameTransport::new(server_stream), FrameTransport::new(client_stream))
    }

    #[tokio::test]
    async fn send_recv_raw_round_trips() {
        let (mut a, mut b) = loopback_pair().await;
        a.send_raw(b"hello").await.unwrap();
        let received = b.recv_raw(5).await.unwrap();
        assert_eq!(received, b"hello");
    }

    #[tokio::test]
    async fn send_recv_framed_round_trips() {
        let (mut a, mut b) = loopback_pair().await;
        a.send_framed(b"a small payload").await.unwrap();
        let received = b.recv_framed().await.unwrap();
        assert_eq!(received, b"a small payload");
    }

    #[tokio::test]
    async fn recv_raw_soft_timeout_is_recoverable_and_does_not_close() {
        let (a, mut b) = loopback_pair().await;
        let err = b.recv_raw_soft(1, Duration::from_millis(10)).await.unwrap_err();
        assert!(err.is_recoverable());
        assert!(!b.closed());
        drop(a);
    }

    #[tokio::test]
    async fn recv_raw_hard_timeout_closes_transport() {
        let (a, mut b) = loopback_pair().await;
        b.set_timeout(Duration::from_millis(10));
        let err = b.recv_raw(1).await.unwrap_err();
        assert!(!err.is_recoverable());
        assert!(b.closed());
        drop(a);
    }

    #[tokio::test]
    async fn peer_close_is_transport_terminated() {
        let (a, mut b) = loopback_pair().await;
        drop(a);
        let err = b.recv_raw(1).await.unwrap_err();
        assert!(matches!(err, RelayError::TransportTerminated(_)));
        assert!(b.closed());
    }

    #[tokio::test]
    async fn oversize_payload_is_rejected_before_sending() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let (server_stream, _) = listener.accept().await.unwrap();
        let _client_stream = client.await.unwrap();
        let mut transport = FrameTransport::with_header_size(server_stream, 1);
        let oversized = vec![0u8; 300];
        let err = transport.send_framed(&oversized).await.unwrap_err();
        assert!(matches!(err, RelayError::Codec(_)));
    }

    #[tokio::test]
    async fn closed_transport_rejects_further_calls() {
        let (a, mut b) = loopback_pair().await;
        drop(a);
        let _ = b.recv_raw(1).await;
        assert!(b.closed());
        let err = b.recv_raw(1).await.unwrap_err();
        assert!(matches!(err, RelayError::TransportTerminated(_)));
    }
}
