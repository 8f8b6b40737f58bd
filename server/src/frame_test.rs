use super::*;

#[test]
fn request_sets_fields() {
    let frame = Frame::request("change:insert", Data::new());
    assert_eq!(frame.syscall, "change:insert");
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(frame.owner_id.is_none());
    assert!(frame.ts > 0);
}

#[test]
fn reply_inherits_context() {
    let owner_id = Uuid::new_v4();
    let req = Frame::request("feed:subscribe", Data::new()).with_owner_id(owner_id);
    let done = req.done_with(Data::new());

    assert_eq!(done.parent_id, Some(req.id));
    assert_eq!(done.owner_id, Some(owner_id));
    assert_eq!(done.syscall, "feed:subscribe");
    assert_eq!(done.status, Status::Done);
}

#[test]
fn prefix_and_op_extraction() {
    let frame = Frame::request("feed:subscribe", Data::new());
    assert_eq!(frame.prefix(), "feed");
    assert_eq!(frame.op(), "subscribe");

    let frame = Frame::request("noseparator", Data::new());
    assert_eq!(frame.prefix(), "noseparator");
    assert_eq!(frame.op(), "");
}

#[test]
fn error_from_typed() {
    #[derive(Debug, thiserror::Error)]
    #[error("not found")]
    struct NotFound;

    impl ErrorCode for NotFound {
        fn error_code(&self) -> &'static str {
            "E_NOT_FOUND"
        }
    }

    let req = Frame::request("feed:subscribe", Data::new());
    let err = req.error_from(&NotFound);

    assert_eq!(err.status, Status::Error);
    assert_eq!(err.data.get("code").and_then(|v| v.as_str()), Some("E_NOT_FOUND"));
    assert_eq!(err.data.get("message").and_then(|v| v.as_str()), Some("not found"));
    assert_eq!(
        err.data
            .get("retryable")
            .and_then(serde_json::Value::as_bool),
        Some(false)
    );
}

#[test]
fn wire_round_trip_keeps_ids_and_data() {
    let owner_id = Uuid::new_v4();
    let original = Frame::request("change:update", Data::new())
        .with_owner_id(owner_id)
        .with_from("system")
        .with_data("table", "orders");

    let wire = frames::Frame::from(&original);
    assert_eq!(wire.owner_id, Some(owner_id.to_string()));

    let bytes = frames::encode_frame(&wire);
    let restored = Frame::try_from(frames::decode_frame(&bytes).expect("decode")).expect("convert");

    assert_eq!(restored.id, original.id);
    assert_eq!(restored.owner_id, Some(owner_id));
    assert_eq!(restored.from.as_deref(), Some("system"));
    assert_eq!(restored.data.get("table").and_then(|v| v.as_str()), Some("orders"));
}

#[test]
fn wire_frame_with_bad_uuid_is_rejected() {
    let mut wire = frames::Frame::from(&Frame::request("feed:ping", Data::new()));
    wire.id = "not-a-uuid".into();
    let err = Frame::try_from(wire).expect_err("should fail");
    assert!(matches!(err, FrameError::InvalidId { field: "id", .. }));
}

#[test]
fn wire_frame_with_scalar_data_is_rejected() {
    let mut wire = frames::Frame::from(&Frame::request("feed:ping", Data::new()));
    wire.data = serde_json::json!(42);
    assert!(matches!(Frame::try_from(wire), Err(FrameError::DataNotObject)));
}
