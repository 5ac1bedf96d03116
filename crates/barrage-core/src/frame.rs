//! Binary frame encoding
//!
//! Danmaku frame format (all fields big-endian):
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ Byte 0-3:   Total length (uint32, header + body)                │
//! │ Byte 4-5:   Header length (uint16, always 16 on encode)         │
//! │ Byte 6-7:   Protocol version (uint16)                           │
//! │             0=plain, 1=heartbeat, 2=zlib, 3=brotli              │
//! │ Byte 8-11:  Operation (uint32)                                  │
//! │ Byte 12-15: Sequence (uint32)                                   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ Body (total length - header length bytes)                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use crate::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};

/// Fixed header size
pub const HEADER_SIZE: usize = 16;

/// Operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Operation {
    Heartbeat = 2,
    HeartbeatReply = 3,
    Command = 5,
    Auth = 7,
    AuthReply = 8,
}

impl Operation {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            2 => Some(Operation::Heartbeat),
            3 => Some(Operation::HeartbeatReply),
            5 => Some(Operation::Command),
            7 => Some(Operation::Auth),
            8 => Some(Operation::AuthReply),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Body encoding tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ProtocolVersion {
    /// Uncompressed JSON body
    Plain = 0,
    /// Heartbeat/auth frames, never compressed
    Heartbeat = 1,
    /// Body is a zlib stream of concatenated frames
    Zlib = 2,
    /// Body is a brotli stream; not supported, dropped on decode
    Brotli = 3,
}

impl ProtocolVersion {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(ProtocolVersion::Plain),
            1 => Some(ProtocolVersion::Heartbeat),
            2 => Some(ProtocolVersion::Zlib),
            3 => Some(ProtocolVersion::Brotli),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        self as u16
    }
}

/// A decoded wire frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub total_len: u32,
    pub header_len: u16,
    pub protocol_version: u16,
    pub operation: u32,
    pub sequence: u32,
    pub body: Bytes,
}

impl Frame {
    /// Create a frame with the standard header length
    pub fn new(operation: u32, protocol_version: u16, sequence: u32, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self {
            total_len: (HEADER_SIZE + body.len()) as u32,
            header_len: HEADER_SIZE as u16,
            protocol_version,
            operation,
            sequence,
            body,
        }
    }

    /// Typed operation, if the code is one we know
    pub fn op(&self) -> Option<Operation> {
        Operation::from_u32(self.operation)
    }

    /// Typed protocol version, if the tag is one we know
    pub fn version(&self) -> Option<ProtocolVersion> {
        ProtocolVersion::from_u16(self.protocol_version)
    }

    /// Encode frame to bytes
    pub fn encode(&self) -> Result<Bytes> {
        encode_parts(self.operation, self.protocol_version, self.sequence, &self.body)
    }
}

/// Write a header and body into a fresh buffer.
pub(crate) fn encode_parts(
    operation: u32,
    protocol_version: u16,
    sequence: u32,
    body: &[u8],
) -> Result<Bytes> {
    let total = HEADER_SIZE
        .checked_add(body.len())
        .filter(|total| *total <= u32::MAX as usize)
        .ok_or(Error::PayloadTooLarge(body.len()))?;

    let mut buf = BytesMut::with_capacity(total);
    buf.put_u32(total as u32);
    buf.put_u16(HEADER_SIZE as u16);
    buf.put_u16(protocol_version);
    buf.put_u32(operation);
    buf.put_u32(sequence);
    buf.extend_from_slice(body);

    Ok(buf.freeze())
}

/// Raw header fields read from the front of a slice.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawHeader {
    pub total_len: u32,
    pub header_len: u16,
    pub protocol_version: u16,
    pub operation: u32,
    pub sequence: u32,
}

impl RawHeader {
    /// Read a header; `None` when fewer than `HEADER_SIZE` bytes remain.
    pub fn read(buf: &[u8]) -> Option<Self> {
        let header: &[u8; HEADER_SIZE] = buf.get(..HEADER_SIZE)?.try_into().ok()?;
        Some(Self {
            total_len: u32::from_be_bytes([header[0], header[1], header[2], header[3]]),
            header_len: u16::from_be_bytes([header[4], header[5]]),
            protocol_version: u16::from_be_bytes([header[6], header[7]]),
            operation: u32::from_be_bytes([header[8], header[9], header[10], header[11]]),
            sequence: u32::from_be_bytes([header[12], header[13], header[14], header[15]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let encoded = Frame::new(Operation::Auth.code(), 1, 1, b"{}".as_slice())
            .encode()
            .unwrap();

        assert_eq!(encoded.len(), 18);
        assert_eq!(&encoded[0..4], &[0, 0, 0, 18]);
        assert_eq!(&encoded[4..6], &[0, 16]);
        assert_eq!(&encoded[6..8], &[0, 1]);
        assert_eq!(&encoded[8..12], &[0, 0, 0, 7]);
        assert_eq!(&encoded[12..16], &[0, 0, 0, 1]);
        assert_eq!(&encoded[16..], b"{}");
    }

    #[test]
    fn test_raw_header_short_buffer() {
        assert!(RawHeader::read(&[0u8; 15]).is_none());
        assert!(RawHeader::read(&[0u8; 16]).is_some());
    }

    #[test]
    fn test_operation_codes() {
        for op in [
            Operation::Heartbeat,
            Operation::HeartbeatReply,
            Operation::Command,
            Operation::Auth,
            Operation::AuthReply,
        ] {
            assert_eq!(Operation::from_u32(op.code()), Some(op));
        }
        assert_eq!(Operation::from_u32(1000), None);
    }
}
