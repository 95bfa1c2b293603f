//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the ADB message layer:
//! - 24-byte header encoding/decoding with magic and checksum validation
//! - Frame buffer for accumulating partial reads
//! - Frame struct with typed accessors

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{build_frame, Frame};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{
    checksum, Command, Header, DEFAULT_MAX_INBOUND_PAYLOAD, HEADER_SIZE, MAX_PAYLOAD,
    PROTOCOL_VERSION,
};
