//! Frame encoding tests for Barrage core

use barrage_core::{decode_all, encode, Frame, Operation, ProtocolVersion, HEADER_SIZE};
use bytes::Bytes;

#[test]
fn test_frame_basic() {
    let body = Bytes::from_static(br#"{"cmd":"DANMU_MSG"}"#);
    let frame = Frame::new(Operation::Command.code(), 0, 1, body.clone());

    let encoded = frame.encode().expect("encode failed");
    assert_eq!(encoded.len(), HEADER_SIZE + body.len());

    let decoded = decode_all(&encoded);
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0], frame);
}

#[test]
fn test_frame_roundtrip_fields() {
    let cases: [(u32, u16, u32, &[u8]); 5] = [
        (Operation::Heartbeat.code(), 1, 2, b""),
        (Operation::HeartbeatReply.code(), 1, 0, &[0, 0, 0, 5]),
        (Operation::Auth.code(), 1, 1, br#"{"uid":0}"#),
        (Operation::AuthReply.code(), 0, u32::MAX, br#"{"code":0}"#),
        (4242, 0, 77, b"opaque"),
    ];

    for (op, version, seq, body) in cases {
        let encoded = encode(op, version, seq, body).expect("encode failed");
        let decoded = decode_all(&encoded);

        assert_eq!(decoded.len(), 1, "op {}", op);
        let frame = &decoded[0];
        assert_eq!(frame.operation, op);
        assert_eq!(frame.protocol_version, version);
        assert_eq!(frame.sequence, seq);
        assert_eq!(frame.header_len as usize, HEADER_SIZE);
        assert_eq!(frame.total_len as usize, HEADER_SIZE + body.len());
        assert_eq!(frame.body.as_ref(), body);
    }
}

#[test]
fn test_frame_typed_accessors() {
    let frame = Frame::new(Operation::AuthReply.code(), 1, 1, Bytes::new());
    assert_eq!(frame.op(), Some(Operation::AuthReply));
    assert_eq!(frame.version(), Some(ProtocolVersion::Heartbeat));

    let unknown = Frame::new(99, 9, 1, Bytes::new());
    assert_eq!(unknown.op(), None);
    assert_eq!(unknown.version(), None);
}

#[test]
fn test_empty_body_frame() {
    let encoded = encode(Operation::Heartbeat.code(), 1, 3, &[]).unwrap();
    assert_eq!(encoded.len(), HEADER_SIZE);

    let decoded = decode_all(&encoded);
    assert_eq!(decoded.len(), 1);
    assert!(decoded[0].body.is_empty());
}
