//! Error types for adbwire.

use thiserror::Error;

use crate::protocol::Command;

/// Main error type for all adbwire operations.
#[derive(Debug, Error)]
pub enum AdbError {
    /// A shell request was made while a connection is already in flight.
    #[error("a shell request is already in flight")]
    Busy,

    /// I/O error reported by the transport (connect, read or write).
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Protocol error (oversized payload, misuse of the connection, etc.).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A well-formed frame arrived in a state that does not expect it.
    #[error("protocol violation: unexpected {command} while {state}")]
    UnexpectedCommand {
        /// Command word of the offending frame.
        command: Command,
        /// Connection state at the time the frame arrived.
        state: &'static str,
    },

    /// The header magic or the payload checksum failed validation.
    #[error("framing corruption: {0}")]
    FramingCorruption(String),

    /// No data arrived from the server within the allotted window.
    #[error("timed out waiting for server data")]
    Timeout,

    /// The server closed the connection before the stream finished.
    ///
    /// Carries whatever shell output had been collected so far, so the
    /// caller can decide whether a partial result is usable.
    #[error("server disconnected with {} bytes of partial output", .partial.len())]
    Disconnected {
        /// Shell output collected before the disconnect.
        partial: Vec<u8>,
    },
}

/// Result type alias using AdbError.
pub type Result<T> = std::result::Result<T, AdbError>;
