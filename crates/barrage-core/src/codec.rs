//! Frame codec
//!
//! `encode` writes one frame. `decode_all` scans a buffer that may hold any
//! number of concatenated frames, expanding zlib-batched frames in place.
//!
//! Decoding never fails. Live streams routinely deliver trailing garbage or a
//! partially-sent frame, so a bad header simply ends the scan and whatever was
//! decoded up to that point is returned.

use crate::frame::{encode_parts, RawHeader};
use crate::{Error, Frame, ProtocolVersion, Result, HEADER_SIZE};
use bytes::Bytes;
use flate2::read::ZlibDecoder;
use std::io::Read;
use tracing::{debug, trace};

/// Deepest nesting level that is still expanded. The caller's buffer is level 0.
pub const MAX_DECOMPRESS_DEPTH: usize = 2;

/// Upper bound on a single inflated body
pub const MAX_INFLATED_SIZE: usize = 16 * 1024 * 1024;

/// Encode a frame to bytes
pub fn encode(operation: u32, protocol_version: u16, sequence: u32, body: &[u8]) -> Result<Bytes> {
    encode_parts(operation, protocol_version, sequence, body)
}

/// Decode every complete frame in `buf`, expanding zlib batches.
///
/// Frames tagged with the unsupported brotli version are dropped.
pub fn decode_all(buf: &[u8]) -> Vec<Frame> {
    decode_at_depth(Bytes::copy_from_slice(buf), 0)
}

fn decode_at_depth(buf: Bytes, depth: usize) -> Vec<Frame> {
    if depth > MAX_DECOMPRESS_DEPTH {
        debug!("Compressed frame nested past depth {}, dropping", MAX_DECOMPRESS_DEPTH);
        return Vec::new();
    }

    let raw = scan_frames(&buf);
    let mut frames = Vec::with_capacity(raw.len());

    for frame in raw {
        match frame.version() {
            Some(ProtocolVersion::Zlib) => match inflate(&frame.body) {
                Ok(inflated) => frames.extend(decode_at_depth(Bytes::from(inflated), depth + 1)),
                Err(e) => debug!("Dropping compressed frame: {}", e),
            },
            Some(ProtocolVersion::Brotli) => {
                trace!("Dropping brotli frame (op {})", frame.operation);
            }
            _ => frames.push(frame),
        }
    }

    frames
}

/// Split a buffer into frames without touching their bodies.
fn scan_frames(buf: &Bytes) -> Vec<Frame> {
    let mut frames = Vec::new();
    let mut offset = 0usize;

    while let Some(header) = RawHeader::read(&buf[offset..]) {
        let total = header.total_len as usize;
        let header_len = header.header_len as usize;

        if total == 0 || header_len < HEADER_SIZE || total < header_len {
            trace!(offset, total, header_len, "Invalid frame header, stopping scan");
            break;
        }
        let end = match offset.checked_add(total) {
            Some(end) if end <= buf.len() => end,
            _ => {
                trace!(offset, total, available = buf.len(), "Truncated frame, stopping scan");
                break;
            }
        };

        frames.push(Frame {
            total_len: header.total_len,
            header_len: header.header_len,
            protocol_version: header.protocol_version,
            operation: header.operation,
            sequence: header.sequence,
            body: buf.slice(offset + header_len..end),
        });

        offset = end;
    }

    frames
}

fn inflate(body: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(body.len().max(256) * 4);
    ZlibDecoder::new(body)
        .take(MAX_INFLATED_SIZE as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| Error::Decompress(e.to_string()))?;

    if out.len() > MAX_INFLATED_SIZE {
        return Err(Error::Decompress(format!(
            "inflated body exceeds {} bytes",
            MAX_INFLATED_SIZE
        )));
    }
    Ok(out)
}
