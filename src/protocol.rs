//! Module for validating Omnik frames out of the byte stream read from a device.
//!
//! A frame on the wire looks like
//!
//! ```text
//! 0x3A 0x3A <sender:2> <receiver:2> <control:1> <function:1> <len:1> <payload:len> <checksum:2>
//! ```
//!
//! All multi byte values are big endian. The checksum is the low 16 bits of the sum of every byte
//! in front of it.

use bytes::Bytes;
use std::fmt;

/// Byte that is repeated twice at the start of every frame.
pub const START_MARKER: u8 = 0x3A;
/// Offset of the first payload byte, which is also the length of the header.
pub const HEADER_LEN: usize = 9;
/// Number of bytes needed before the header fields are read.
pub const MIN_FRAME_LEN: usize = 11;
/// Width of the trailing checksum.
pub const CHECKSUM_LEN: usize = 2;
/// Longest frame the length field can announce.
pub const MAX_FRAME_LEN: usize = HEADER_LEN + u8::MAX as usize + CHECKSUM_LEN;

/// Identifies the layout and meaning of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageKey {
    pub control: u8,
    pub function: u8,
}

impl MessageKey {
    pub const fn new(control: u8, function: u8) -> MessageKey {
        MessageKey { control, function }
    }

    /// Dense identifier with the control code in the high byte.
    pub const fn id(&self) -> u16 {
        ((self.control as u16) << 8) | self.function as u16
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}/0x{:02X}", self.control, self.function)
    }
}

/// A frame whose checksum has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFrame {
    sender: u16,
    receiver: u16,
    key: MessageKey,
    payload: Bytes,
    checksum: u16,
}

impl ParsedFrame {
    pub fn sender(&self) -> u16 {
        self.sender
    }

    pub fn receiver(&self) -> u16 {
        self.receiver
    }

    pub fn key(&self) -> MessageKey {
        self.key
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn checksum(&self) -> u16 {
        self.checksum
    }
}

/// Low 16 bits of the arithmetic sum of all bytes.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |sum, &byte| sum.wrapping_add(byte as u16))
}

/// Check whether the buffer holds a complete frame and return it if possible.
///
/// The buffer is not modified. `FrameCheckError::Incomplete` means more bytes are needed (this
/// includes a buffer that does not start with the marker), every other error means the candidate
/// frame has been seen completely and has to be dropped as a unit.
pub fn try_validate(buffer: &[u8]) -> Result<ParsedFrame, error::FrameCheckError> {
    use error::FrameCheckError;

    if buffer.len() < 2 || buffer[0] != START_MARKER || buffer[1] != START_MARKER {
        return Err(FrameCheckError::Incomplete);
    }
    if buffer.len() < MIN_FRAME_LEN {
        return Err(FrameCheckError::Incomplete);
    }

    let payload_len = buffer[8] as usize;
    let checksum_at = HEADER_LEN + payload_len;
    if buffer.len() < checksum_at + CHECKSUM_LEN {
        return Err(FrameCheckError::Incomplete);
    }

    let expected = u16::from_be_bytes([buffer[checksum_at], buffer[checksum_at + 1]]);
    let actual = checksum(&buffer[..checksum_at]);
    if actual != expected {
        return Err(FrameCheckError::ChecksumMismatch { actual, expected });
    }

    Ok(ParsedFrame {
        sender: u16::from_be_bytes([buffer[2], buffer[3]]),
        receiver: u16::from_be_bytes([buffer[4], buffer[5]]),
        key: MessageKey::new(buffer[6], buffer[7]),
        payload: Bytes::copy_from_slice(&buffer[HEADER_LEN..checksum_at]),
        checksum: expected,
    })
}

/// Build the wire representation of a frame. Used to talk to simulators and in tests.
pub fn encode(
    sender: u16,
    receiver: u16,
    key: MessageKey,
    payload: &[u8],
) -> Result<Vec<u8>, error::EncodeError> {
    let len = u8::try_from(payload.len())
        .map_err(|_| error::EncodeError::PayloadTooLong { len: payload.len() })?;
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
    frame.extend_from_slice(&[START_MARKER, START_MARKER]);
    frame.extend_from_slice(&sender.to_be_bytes());
    frame.extend_from_slice(&receiver.to_be_bytes());
    frame.extend_from_slice(&[key.control, key.function, len]);
    frame.extend_from_slice(payload);
    let sum = checksum(&frame);
    frame.extend_from_slice(&sum.to_be_bytes());
    Ok(frame)
}

pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug, PartialEq)]
    pub enum FrameCheckError {
        #[error("No complete frame in buffer")]
        Incomplete,
        #[error("Checksum mismatch: actual={actual:#06X} expected={expected:#06X}")]
        ChecksumMismatch { actual: u16, expected: u16 },
    }

    #[derive(Error, Debug, PartialEq)]
    pub enum EncodeError {
        #[error("Payload of {len} bytes does not fit the length byte")]
        PayloadTooLong { len: usize },
    }
}
