//! # adbwire
//!
//! Async client for the ADB (Android Debug Bridge) host transport
//! protocol. Connects to an ADB server over TCP, performs the CNXN
//! handshake, opens a `shell:` stream and collects its output until the
//! server closes the stream.
//!
//! ## Architecture
//!
//! - **Protocol layer** ([`protocol`]): the 24-byte message header codec
//!   and a frame buffer that reassembles messages from arbitrarily
//!   chunked transport reads.
//! - **Connection state machine** ([`connection`]): pure, I/O-free
//!   engine advancing CNXN → OPEN → OKAY/WRTE → CLSE one frame at a
//!   time, emitting the frames to send in response.
//! - **Transport and client** ([`transport`], [`client`]): tokio TCP
//!   socket plus the driver loop that feeds bytes into the engine and
//!   writes its replies, with an idle timeout.
//!
//! Servers that require AUTH are not supported; the connection fails
//! with a protocol violation instead of attempting the RSA exchange.
//!
//! ## Example
//!
//! ```ignore
//! use adbwire::Client;
//!
//! let mut client = Client::builder().host("192.168.1.40").build();
//! let output = client.shell("echo hi").await?;
//! assert_eq!(output, "hi\n");
//! ```

pub mod client;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod transport;

pub use client::{run_session, Client, ClientBuilder};
pub use connection::{Connection, Ingest, State, LOCAL_STREAM_ID};
pub use error::{AdbError, Result};
pub use transport::TcpTransport;
