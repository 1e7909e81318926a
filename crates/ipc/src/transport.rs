//! Frame transports
//!
//! A transport moves opaque binary frames. It knows nothing about requests,
//! responses or correlation.

use std::fmt;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// A bidirectional, message-framed channel
///
/// `recv_frame` has no timeout; wrap it in `tokio::time::timeout` to impose
/// one. Implementations must make `recv_frame` cancel-safe: dropping the
/// future before it completes must not lose a frame.
#[async_trait]
pub trait FrameTransport: Send {
    /// Write one frame
    async fn send_frame(&mut self, frame: Vec<u8>) -> Result<()>;

    /// Wait for the next inbound frame
    async fn recv_frame(&mut self) -> Result<Vec<u8>>;
}

/// Binary WebSocket frames over TCP or TLS
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WebSocketTransport {
    /// Open a WebSocket connection (`ws://` or `wss://`)
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, response) = tokio_tungstenite::connect_async(url).await?;
        debug!(url, status = %response.status(), "WebSocket connected");
        Ok(Self { stream })
    }

    /// Send a close frame and flush it
    pub async fn close(&mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

impl fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl FrameTransport for WebSocketTransport {
    async fn send_frame(&mut self, frame: Vec<u8>) -> Result<()> {
        trace!(bytes = frame.len(), "Sending frame");
        self.stream.send(Message::Binary(frame)).await?;
        Ok(())
    }

    async fn recv_frame(&mut self) -> Result<Vec<u8>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Binary(frame))) => {
                    trace!(bytes = frame.len(), "Received frame");
                    return Ok(frame);
                }
                // Pongs are queued by tungstenite and flushed on the next write
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Text(_))) => return Err(Error::UnexpectedFrame("text")),
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Server closed the connection");
                    return Err(Error::ConnectionClosed);
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Err(Error::ConnectionClosed),
            }
        }
    }
}

/// In-process loopback transport
///
/// Frames written to one end arrive at the other in the order they were
/// written. Useful for hosting a server in the same process and for tests.
#[derive(Debug)]
pub struct MemoryTransport {
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    inbound: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MemoryTransport {
    /// Create two connected ends
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            Self {
                outbound: a_tx,
                inbound: b_rx,
            },
            Self {
                outbound: b_tx,
                inbound: a_rx,
            },
        )
    }
}

#[async_trait]
impl FrameTransport for MemoryTransport {
    async fn send_frame(&mut self, frame: Vec<u8>) -> Result<()> {
        self.outbound
            .send(frame)
            .map_err(|_| Error::ConnectionClosed)
    }

    async fn recv_frame(&mut self) -> Result<Vec<u8>> {
        self.inbound.recv().await.ok_or(Error::ConnectionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_pair_preserves_order() {
        let (mut a, mut b) = MemoryTransport::pair();
        a.send_frame(vec![1]).await.unwrap();
        a.send_frame(vec![2]).await.unwrap();
        b.send_frame(vec![3]).await.unwrap();

        assert_eq!(b.recv_frame().await.unwrap(), vec![1]);
        assert_eq!(b.recv_frame().await.unwrap(), vec![2]);
        assert_eq!(a.recv_frame().await.unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_memory_peer_drop_closes() {
        let (mut a, b) = MemoryTransport::pair();
        drop(b);
        assert!(matches!(a.recv_frame().await, Err(Error::ConnectionClosed)));
        assert!(matches!(a.send_frame(vec![0]).await, Err(Error::ConnectionClosed)));
    }
}
