//! Wire format encoding and decoding.
//!
//! Implements the 24-byte ADB message header:
//! ```text
//! ┌─────────┬─────────┬─────────┬──────────┬──────────┬─────────┐
//! │ Command │ Arg0    │ Arg1    │ Length   │ Checksum │ Magic   │
//! │ 4 bytes │ 4 bytes │ 4 bytes │ 4 bytes  │ 4 bytes  │ 4 bytes │
//! └─────────┴─────────┴─────────┴──────────┴──────────┴─────────┘
//! ```
//!
//! All fields are Little Endian. The payload (`Length` bytes) follows the
//! header directly, no padding. `Magic` must equal `Command ^ 0xffffffff`;
//! `Checksum` is the wrapping sum of the unsigned payload bytes (upstream
//! sources name the field `data_crc32`, but it is not CRC32).

use std::fmt;

use crate::error::{AdbError, Result};

/// Header size in bytes (fixed, exactly 24).
pub const HEADER_SIZE: usize = 24;

/// ADB protocol version sent as CNXN arg0.
pub const PROTOCOL_VERSION: u32 = 0x0100_0000;

/// Maximum payload size advertised to the server in CNXN arg1.
pub const MAX_PAYLOAD: u32 = 4096;

/// Default inbound payload cap applied when decoding.
///
/// Servers negotiate far below this; a length field past it means the
/// stream is garbage, not a large frame.
pub const DEFAULT_MAX_INBOUND_PAYLOAD: u32 = 256 * 1024;

/// ADB command vocabulary (32-bit little-endian ASCII tetragrams).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Command {
    /// Synchronize (unused by the shell flow).
    Sync = 0x434e5953,
    /// Connect handshake.
    Cnxn = 0x4e584e43,
    /// Authentication challenge (recognized, not supported).
    Auth = 0x48545541,
    /// Open a stream.
    Open = 0x4e45504f,
    /// Ready-to-receive / stream open ack.
    Okay = 0x59414b4f,
    /// Close a stream.
    Clse = 0x45534c43,
    /// Data chunk on a stream.
    Wrte = 0x45545257,
}

impl Command {
    /// Map a raw command word to the vocabulary.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0x434e5953 => Some(Command::Sync),
            0x4e584e43 => Some(Command::Cnxn),
            0x48545541 => Some(Command::Auth),
            0x4e45504f => Some(Command::Open),
            0x59414b4f => Some(Command::Okay),
            0x45534c43 => Some(Command::Clse),
            0x45545257 => Some(Command::Wrte),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Sync => write!(f, "SYNC"),
            Command::Cnxn => write!(f, "CNXN"),
            Command::Auth => write!(f, "AUTH"),
            Command::Open => write!(f, "OPEN"),
            Command::Okay => write!(f, "OKAY"),
            Command::Clse => write!(f, "CLSE"),
            Command::Wrte => write!(f, "WRTE"),
        }
    }
}

/// Wrapping byte-sum checksum over a payload.
pub fn checksum(data: &[u8]) -> u32 {
    data.iter().fold(0u32, |acc, &b| acc.wrapping_add(b as u32))
}

/// Decoded ADB message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Command identifying the message type.
    pub command: Command,
    /// First command-specific argument.
    pub arg0: u32,
    /// Second command-specific argument.
    pub arg1: u32,
    /// Payload length in bytes (0 is allowed).
    pub payload_length: u32,
    /// Wrapping byte sum of the payload.
    pub payload_checksum: u32,
    /// Bitwise complement of the command word.
    pub magic: u32,
}

impl Header {
    /// Create a header for the given payload, computing length, checksum
    /// and magic.
    pub fn new(command: Command, arg0: u32, arg1: u32, payload: &[u8]) -> Self {
        Self {
            command,
            arg0,
            arg1,
            payload_length: payload.len() as u32,
            payload_checksum: checksum(payload),
            magic: (command as u32) ^ 0xffff_ffff,
        }
    }

    /// Encode the header to bytes (Little Endian).
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode the header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is smaller than `HEADER_SIZE` (24 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0..4].copy_from_slice(&(self.command as u32).to_le_bytes());
        buf[4..8].copy_from_slice(&self.arg0.to_le_bytes());
        buf[8..12].copy_from_slice(&self.arg1.to_le_bytes());
        buf[12..16].copy_from_slice(&self.payload_length.to_le_bytes());
        buf[16..20].copy_from_slice(&self.payload_checksum.to_le_bytes());
        buf[20..24].copy_from_slice(&self.magic.to_le_bytes());
    }

    /// Decode a header from bytes (Little Endian).
    ///
    /// Validates the magic invariant (`magic == command ^ 0xffffffff`) and
    /// that the command word belongs to the vocabulary; a violation of
    /// either is [`AdbError::FramingCorruption`].
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(AdbError::Protocol(format!(
                "header needs {} bytes, got {}",
                HEADER_SIZE,
                buf.len()
            )));
        }

        let raw_command = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let arg0 = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let arg1 = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
        let payload_length = u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]);
        let payload_checksum = u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]);
        let magic = u32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]);

        if magic != raw_command ^ 0xffff_ffff {
            return Err(AdbError::FramingCorruption(format!(
                "magic {:#010x} does not complement command {:#010x}",
                magic, raw_command
            )));
        }

        let command = Command::from_u32(raw_command).ok_or_else(|| {
            AdbError::FramingCorruption(format!("unknown command word {:#010x}", raw_command))
        })?;

        Ok(Self {
            command,
            arg0,
            arg1,
            payload_length,
            payload_checksum,
            magic,
        })
    }

    /// Check the payload against the header's length and checksum fields.
    pub fn verify_payload(&self, payload: &[u8]) -> bool {
        self.payload_length as usize == payload.len() && self.payload_checksum == checksum(payload)
    }
}
