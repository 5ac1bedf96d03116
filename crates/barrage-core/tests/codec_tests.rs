//! Codec tests: batching, truncation and nested zlib expansion

use barrage_core::codec::MAX_DECOMPRESS_DEPTH;
use barrage_core::{decode_all, encode, Operation, ProtocolVersion, HEADER_SIZE};
use flate2::{write::ZlibEncoder, Compression};
use std::io::Write;

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn command(seq: u32, body: &str) -> Vec<u8> {
    encode(Operation::Command.code(), ProtocolVersion::Plain.code(), seq, body.as_bytes())
        .unwrap()
        .to_vec()
}

fn zlib_wrap(inner: &[u8]) -> Vec<u8> {
    encode(
        Operation::Command.code(),
        ProtocolVersion::Zlib.code(),
        0,
        &deflate(inner),
    )
    .unwrap()
    .to_vec()
}

#[test]
fn test_multiple_frames_in_one_buffer() {
    let mut buf = encode(Operation::Heartbeat.code(), 1, 1, &[]).unwrap().to_vec();
    buf.extend(encode(Operation::Heartbeat.code(), 1, 2, &[]).unwrap());

    let frames = decode_all(&buf);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].sequence, 1);
    assert_eq!(frames[1].sequence, 2);
}

#[test]
fn test_truncation_at_every_offset() {
    let first = command(1, r#"{"cmd":"DANMU_MSG","info":[]}"#);
    let second = command(2, r#"{"cmd":"ROOM_CHANGE"}"#);
    let mut buf = first.clone();
    buf.extend_from_slice(&second);

    for cut in 0..=buf.len() {
        let frames = decode_all(&buf[..cut]);
        let expected = if cut < first.len() {
            0
        } else if cut < buf.len() {
            1
        } else {
            2
        };
        assert_eq!(frames.len(), expected, "cut at {}", cut);
        if expected >= 1 {
            assert_eq!(frames[0].sequence, 1);
        }
    }
}

#[test]
fn test_trailing_garbage_is_ignored() {
    let mut buf = command(1, r#"{"cmd":"A"}"#);
    buf.extend_from_slice(&[0xFF; 7]);

    let frames = decode_all(&buf);
    assert_eq!(frames.len(), 1);
}

#[test]
fn test_zlib_batch_expands() {
    let inner_body = r#"{"cmd":"DANMU_MSG"}"#;
    let mut inner = command(1, inner_body);
    inner.extend(command(2, inner_body));

    let frames = decode_all(&zlib_wrap(&inner));
    assert_eq!(frames.len(), 2);
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame.operation, Operation::Command.code());
        assert_eq!(frame.protocol_version, ProtocolVersion::Plain.code());
        assert_eq!(frame.sequence, i as u32 + 1);
        assert_eq!(frame.body.as_ref(), inner_body.as_bytes());
    }
}

#[test]
fn test_nested_zlib_within_depth_bound() {
    let leaf = command(9, r#"{"cmd":"DANMU_MSG"}"#);

    let mut buf = leaf.clone();
    for _ in 0..MAX_DECOMPRESS_DEPTH {
        buf = zlib_wrap(&buf);
    }

    let frames = decode_all(&buf);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].sequence, 9);
}

#[test]
fn test_nested_zlib_past_depth_bound_is_dropped() {
    let leaf = command(9, r#"{"cmd":"DANMU_MSG"}"#);

    let mut too_deep = leaf;
    for _ in 0..=MAX_DECOMPRESS_DEPTH {
        too_deep = zlib_wrap(&too_deep);
    }

    // The over-deep branch yields nothing; its plain sibling still decodes.
    let mut buf = too_deep;
    buf.extend(command(1, r#"{"cmd":"SIBLING"}"#));

    let frames = decode_all(&buf);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].sequence, 1);
}

#[test]
fn test_corrupt_zlib_does_not_abort_siblings() {
    let mut buf = command(1, r#"{"cmd":"A"}"#);
    buf.extend(
        encode(
            Operation::Command.code(),
            ProtocolVersion::Zlib.code(),
            2,
            b"definitely not zlib",
        )
        .unwrap(),
    );
    buf.extend(command(3, r#"{"cmd":"B"}"#));

    let sequences: Vec<u32> = decode_all(&buf).iter().map(|f| f.sequence).collect();
    assert_eq!(sequences, vec![1, 3]);
}

#[test]
fn test_brotli_frames_are_dropped() {
    let mut buf = encode(
        Operation::Command.code(),
        ProtocolVersion::Brotli.code(),
        1,
        b"\x1b\x00\x00",
    )
    .unwrap()
    .to_vec();
    buf.extend(command(2, r#"{"cmd":"A"}"#));

    let frames = decode_all(&buf);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].sequence, 2);
}

#[test]
fn test_unknown_operation_passes_through() {
    let buf = encode(12345, 0, 1, b"?").unwrap();
    let frames = decode_all(&buf);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].operation, 12345);
}

#[test]
fn test_overrunning_length_stops_scan() {
    let mut buf = command(1, r#"{"cmd":"A"}"#);
    let mut bogus = command(2, r#"{"cmd":"B"}"#);
    bogus[0..4].copy_from_slice(&(u32::MAX).to_be_bytes());
    buf.extend(bogus);

    let frames = decode_all(&buf);
    assert_eq!(frames.len(), 1);
}

#[test]
fn test_empty_and_short_buffers() {
    assert!(decode_all(&[]).is_empty());
    assert!(decode_all(&[0u8; HEADER_SIZE - 1]).is_empty());
}
