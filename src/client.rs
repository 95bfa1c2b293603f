//! Client builder and session driver.
//!
//! The [`ClientBuilder`] provides a fluent API for configuring the
//! target server and timeouts. [`Client::shell`] runs one complete
//! exchange: connect, CNXN handshake, OPEN the shell stream, collect
//! WRTE chunks, and return the output once the server closes the stream.
//!
//! # Example
//!
//! ```ignore
//! use adbwire::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::builder()
//!         .host("192.168.1.40")
//!         .port(5555)
//!         .build();
//!
//!     let output = client.shell("getprop ro.product.model").await?;
//!     println!("{}", output);
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::connection::Connection;
use crate::error::{AdbError, Result};
use crate::protocol::DEFAULT_MAX_INBOUND_PAYLOAD;
use crate::transport::TcpTransport;

/// Default adbd TCP port.
pub const DEFAULT_PORT: u16 = 5555;

/// Default window in which the server must produce data.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Builder for configuring and creating an ADB client.
pub struct ClientBuilder {
    host: String,
    port: u16,
    device_name: String,
    io_timeout: Duration,
    max_inbound_payload: u32,
}

impl ClientBuilder {
    /// Create a new client builder with default settings.
    pub fn new() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            device_name: "adbwire".to_string(),
            io_timeout: DEFAULT_IO_TIMEOUT,
            max_inbound_payload: DEFAULT_MAX_INBOUND_PAYLOAD,
        }
    }

    /// Set the server host (default: `127.0.0.1`).
    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Set the server port (default: 5555).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the device name used in the `host::<device-name>` identity.
    ///
    /// Default: `adbwire`.
    pub fn device_name(mut self, name: &str) -> Self {
        self.device_name = name.to_string();
        self
    }

    /// Set how long the session may go without server data before it is
    /// failed with [`AdbError::Timeout`].
    ///
    /// Default: 5 seconds.
    pub fn io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    /// Set the maximum accepted inbound frame payload.
    ///
    /// Default: 256 KiB.
    pub fn max_inbound_payload(mut self, max: u32) -> Self {
        self.max_inbound_payload = max;
        self
    }

    /// Build the client.
    pub fn build(self) -> Client {
        let connection =
            Connection::with_max_inbound_payload(&self.device_name, self.max_inbound_payload);
        Client {
            host: self.host,
            port: self.port,
            io_timeout: self.io_timeout,
            connection,
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// ADB client holding one connection slot.
///
/// At most one shell exchange may be in flight per client; a second
/// request while one is active is rejected with [`AdbError::Busy`].
pub struct Client {
    host: String,
    port: u16,
    io_timeout: Duration,
    connection: Connection,
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Run one shell command and return its captured output.
    ///
    /// Opens a fresh TCP connection, performs the handshake, streams the
    /// command's output and closes. Failure is a distinct `Err`, never an
    /// empty string; an empty `Ok` means the server closed the stream
    /// without producing output. The connection slot and the socket are
    /// released on every exit path.
    pub async fn shell(&mut self, command: &str) -> Result<String> {
        // Busy check happens before any I/O and must not reset state
        let greeting = self.connection.start(command)?;

        let result = match TcpTransport::connect(&self.host, self.port).await {
            Ok(mut transport) => {
                let result =
                    run_session(&mut transport, &mut self.connection, greeting, self.io_timeout)
                        .await;
                transport.shutdown().await;
                result
            }
            Err(e) => Err(e),
        };

        if let Err(ref e) = result {
            tracing::error!("shell {:?} failed: {}", command, e);
            self.connection.abort();
        }
        self.connection.reset();
        result
    }
}

/// Drive one started connection over a byte stream until it terminates.
///
/// Writes the CNXN greeting, then alternates between reading transport
/// chunks (bounded by `io_timeout`) and writing whatever frames the
/// state machine emits. Generic over the stream so tests can drive the
/// engine through an in-memory duplex pipe.
pub async fn run_session<S>(
    stream: &mut S,
    connection: &mut Connection,
    greeting: Bytes,
    io_timeout: Duration,
) -> Result<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(&greeting).await?;
    stream.flush().await?;

    let mut buf = vec![0u8; 4 * 1024];

    loop {
        let n = match timeout(io_timeout, stream.read(&mut buf)).await {
            Err(_) => return Err(AdbError::Timeout),
            Ok(Ok(0)) => {
                // EOF: benign after CLSE, an error mid-exchange
                connection.on_disconnected()?;
                break;
            }
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(e.into()),
        };

        let step = connection.ingest(&buf[..n])?;
        for frame in &step.outgoing {
            stream.write_all(frame).await?;
        }
        if !step.outgoing.is_empty() {
            stream.flush().await?;
        }
        if step.done {
            break;
        }
    }

    Ok(connection.take_output())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = ClientBuilder::new();
        assert_eq!(builder.host, "127.0.0.1");
        assert_eq!(builder.port, DEFAULT_PORT);
        assert_eq!(builder.device_name, "adbwire");
        assert_eq!(builder.io_timeout, DEFAULT_IO_TIMEOUT);
    }

    #[test]
    fn test_builder_method_chaining() {
        let builder = Client::builder()
            .host("10.0.0.7")
            .port(5556)
            .device_name("workstation")
            .io_timeout(Duration::from_secs(30))
            .max_inbound_payload(64 * 1024);

        assert_eq!(builder.host, "10.0.0.7");
        assert_eq!(builder.port, 5556);
        assert_eq!(builder.device_name, "workstation");
        assert_eq!(builder.io_timeout, Duration::from_secs(30));
        assert_eq!(builder.max_inbound_payload, 64 * 1024);
    }
}
