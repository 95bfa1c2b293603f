//! Transport module - TCP socket handling.
//!
//! Wraps `tokio::net::TcpStream` behind the narrow surface the protocol
//! engine needs: connect, ordered byte delivery, and an explicit
//! shutdown. The engine itself never touches the socket; the client
//! driver is generic over `AsyncRead + AsyncWrite`, so tests substitute
//! an in-memory duplex stream for this type.

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;

use crate::error::Result;

/// Connected TCP transport to an ADB server.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connect to `host:port`.
    ///
    /// Resolution of the returned future is the transport's "connected"
    /// event; callers must not write frames before it completes.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        // Handshake frames are tiny; don't let them sit in Nagle's buffer
        stream.set_nodelay(true)?;
        tracing::debug!("connected to {}:{}", host, port);
        Ok(Self { stream })
    }

    /// Shut down the write half and release the socket.
    ///
    /// Errors are ignored: the peer may already be gone, and the socket
    /// is dropped either way.
    pub async fn shutdown(&mut self) {
        let _ = self.stream.shutdown().await;
    }

    /// Get a reference to the underlying stream.
    pub fn inner(&self) -> &TcpStream {
        &self.stream
    }
}

impl AsyncRead for TcpTransport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for TcpTransport {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}
