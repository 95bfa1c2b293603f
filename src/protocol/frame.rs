//! Frame struct with typed accessors.
//!
//! Represents a complete ADB message with header and payload. Uses
//! `bytes::Bytes` for zero-copy payload sharing.

use bytes::Bytes;

use super::wire_format::{Command, Header, HEADER_SIZE};

/// A complete ADB message.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from header and payload.
    pub fn new(header: Header, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Create a frame from header and raw bytes (copies data).
    pub fn from_parts(header: Header, payload: &[u8]) -> Self {
        Self {
            header,
            payload: Bytes::copy_from_slice(payload),
        }
    }

    /// Get the command word.
    #[inline]
    pub fn command(&self) -> Command {
        self.header.command
    }

    /// Get the first command argument.
    #[inline]
    pub fn arg0(&self) -> u32 {
        self.header.arg0
    }

    /// Get the second command argument.
    #[inline]
    pub fn arg1(&self) -> u32 {
        self.header.arg1
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

/// Build a complete wire frame as a single byte vector.
///
/// Encodes a header for `payload` (length, checksum and magic computed)
/// and appends the payload verbatim. This is the codec's encode half; the
/// caller is responsible for staying under the payload size negotiated in
/// the CNXN handshake.
pub fn build_frame(command: Command, arg0: u32, arg1: u32, payload: &[u8]) -> Vec<u8> {
    let header = Header::new(command, arg0, arg1, payload);
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(payload);
    buf
}

#[cfg(test)]
mod tests {
    use super::super::wire_format::checksum;
    use super::*;

    #[test]
    fn test_frame_accessors() {
        let header = Header::new(Command::Wrte, 5, 0x1234, b"hello");
        let frame = Frame::new(header, Bytes::from_static(b"hello"));

        assert_eq!(frame.command(), Command::Wrte);
        assert_eq!(frame.arg0(), 5);
        assert_eq!(frame.arg1(), 0x1234);
        assert_eq!(frame.payload(), b"hello");
        assert_eq!(frame.payload_len(), 5);
    }

    #[test]
    fn test_frame_from_parts() {
        let header = Header::new(Command::Okay, 2, 7, b"");
        let frame = Frame::from_parts(header, b"");

        assert_eq!(frame.command(), Command::Okay);
        assert!(frame.payload().is_empty());
    }

    #[test]
    fn test_build_frame_layout() {
        let bytes = build_frame(Command::Open, 2, 0x1234, b"shell:ls\0");

        assert_eq!(bytes.len(), HEADER_SIZE + 9);
        assert_eq!(&bytes[0..4], b"OPEN");
        assert_eq!(&bytes[HEADER_SIZE..], b"shell:ls\0");

        let header = Header::decode(&bytes[..HEADER_SIZE]).unwrap();
        assert_eq!(header.arg0, 2);
        assert_eq!(header.arg1, 0x1234);
        assert_eq!(header.payload_length, 9);
        assert_eq!(header.payload_checksum, checksum(b"shell:ls\0"));
    }

    #[test]
    fn test_build_frame_empty_payload() {
        let bytes = build_frame(Command::Okay, 2, 0x1234, b"");
        assert_eq!(bytes.len(), HEADER_SIZE);
    }
}
