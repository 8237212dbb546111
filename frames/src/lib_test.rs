use super::*;

fn sample_frame() -> Frame {
    Frame::new("new_message")
        .with_data("id", "m-1")
        .with_data("username", "Bob")
        .with_data("message", "hi")
        .with_data("tags", serde_json::json!(["a", "b"]))
}

#[test]
fn new_frame_starts_with_empty_object_payload() {
    let frame = Frame::new("user_left");
    assert_eq!(frame.event, "user_left");
    assert_eq!(frame.data, serde_json::json!({}));
}

#[test]
fn with_data_replaces_existing_key() {
    let frame = Frame::new("error")
        .with_data("message", "first")
        .with_data("message", "second");
    assert_eq!(frame.str_field("message"), Some("second"));
}

#[test]
fn encode_decode_preserves_frame() {
    let frame = sample_frame();
    let decoded = decode_frame(&encode_frame(&frame)).expect("decode should succeed");
    assert_eq!(decoded, frame);
}

#[test]
fn encode_frame_writes_event_and_data_members() {
    let text = encode_frame(&Frame::new("join_chat").with_data("room", "general"));
    let value: Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(value["event"], "join_chat");
    assert_eq!(value["data"]["room"], "general");
}

#[test]
fn decode_frame_rejects_malformed_text() {
    let err = decode_frame("{not json").expect_err("text should fail");
    assert!(matches!(err, CodecError::Json(_)));
}

#[test]
fn decode_frame_rejects_non_object_envelope() {
    let err = decode_frame("[1, 2, 3]").expect_err("array should fail");
    assert!(matches!(err, CodecError::Json(_)));
}

#[test]
fn decode_frame_requires_event_name() {
    let err = decode_frame(r#"{"data": {}}"#).expect_err("missing event");
    assert!(matches!(err, CodecError::MissingEvent));

    let err = decode_frame(r#"{"event": "  ", "data": {}}"#).expect_err("blank event");
    assert!(matches!(err, CodecError::MissingEvent));
}

#[test]
fn decode_frame_defaults_missing_or_null_data_to_empty_object() {
    let frame = decode_frame(r#"{"event": "user_left"}"#).expect("decode");
    assert_eq!(frame.data, serde_json::json!({}));

    let frame = decode_frame(r#"{"event": "user_left", "data": null}"#).expect("decode");
    assert_eq!(frame.data, serde_json::json!({}));
}

#[test]
fn decode_frame_rejects_scalar_data() {
    let err = decode_frame(r#"{"event": "error", "data": "boom"}"#).expect_err("scalar data");
    assert!(matches!(err, CodecError::InvalidData(ref event) if event == "error"));
}

#[test]
fn decode_frame_ignores_unknown_envelope_members() {
    let frame = decode_frame(r#"{"event": "connect", "data": {"sid": "abc"}, "nsp": "/"}"#)
        .expect("decode");
    assert_eq!(frame.str_field("sid"), Some("abc"));
}

#[test]
fn str_field_returns_none_for_non_string_values() {
    let frame = Frame::new("signal_update").with_data("confidence", 87.5);
    assert_eq!(frame.str_field("confidence"), None);
    assert_eq!(frame.str_field("missing"), None);
}
