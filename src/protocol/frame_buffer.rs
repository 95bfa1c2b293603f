//! Frame buffer for accumulating partial reads.
//!
//! A TCP transport delivers bytes at arbitrary chunk boundaries, never
//! aligned to message boundaries. This buffer retains leftover bytes
//! between deliveries and extracts complete frames as they become
//! available, using `bytes::BytesMut` for zero-copy buffer management.
//!
//! Parsing is a two-state machine:
//! - `WaitingForHeader`: need at least 24 bytes
//! - `WaitingForPayload`: header parsed, need `payload_length` more bytes
//!
//! Both the header magic and the byte-sum payload checksum are verified
//! on receipt; a mismatch is [`AdbError::FramingCorruption`]. The wire
//! carries no resynchronization marker, so a corrupt frame poisons the
//! stream and the connection must be torn down.

use bytes::{Bytes, BytesMut};

use super::frame::Frame;
use super::wire_format::{Header, DEFAULT_MAX_INBOUND_PAYLOAD, HEADER_SIZE};
use crate::error::{AdbError, Result};

/// State machine for frame parsing.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for a complete header (need 24 bytes).
    WaitingForHeader,
    /// Header parsed, waiting for payload bytes.
    WaitingForPayload { header: Header },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads, in delivery order.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum accepted inbound payload size.
    max_payload: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer with the default inbound payload cap.
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_INBOUND_PAYLOAD)
    }

    /// Create a new frame buffer with a custom inbound payload cap.
    pub fn with_max_payload(max_payload: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4 * 1024),
            state: State::WaitingForHeader,
            max_payload,
        }
    }

    /// Append raw bytes without extracting frames.
    ///
    /// Use together with [`next_frame`](Self::next_frame) when the caller
    /// wants to react to each frame before parsing the next one.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Returns every frame that is now complete, in wire order; an empty
    /// vector means more bytes are needed. Partial data is retained for
    /// the next push.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.extend(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Try to extract a single frame from the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` if a complete, validated frame was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` on framing corruption or an oversized payload
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            match &self.state {
                State::WaitingForHeader => {
                    if self.buffer.len() < HEADER_SIZE {
                        return Ok(None);
                    }

                    // Magic and command word are validated here
                    let header = Header::decode(&self.buffer[..HEADER_SIZE])?;

                    if header.payload_length > self.max_payload {
                        return Err(AdbError::Protocol(format!(
                            "payload length {} exceeds inbound limit {}",
                            header.payload_length, self.max_payload
                        )));
                    }

                    let _ = self.buffer.split_to(HEADER_SIZE);

                    if header.payload_length == 0 {
                        if header.payload_checksum != 0 {
                            return Err(AdbError::FramingCorruption(format!(
                                "empty {} frame carries checksum {:#010x}",
                                header.command, header.payload_checksum
                            )));
                        }
                        return Ok(Some(Frame::new(header, Bytes::new())));
                    }

                    self.state = State::WaitingForPayload { header };
                }

                State::WaitingForPayload { header } => {
                    let header = *header;
                    if self.buffer.len() < header.payload_length as usize {
                        return Ok(None);
                    }

                    let payload = self.buffer.split_to(header.payload_length as usize).freeze();
                    self.state = State::WaitingForHeader;

                    if !header.verify_payload(&payload) {
                        return Err(AdbError::FramingCorruption(format!(
                            "{} payload checksum mismatch (header {:#010x})",
                            header.command, header.payload_checksum
                        )));
                    }

                    return Ok(Some(Frame::new(header, payload)));
                }
            }
        }
    }

    /// Get the number of buffered, not-yet-parsed bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset the parse state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForHeader;
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
