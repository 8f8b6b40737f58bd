use super::*;
use crate::services::feed::ChangeEvent;
use crate::state::test_helpers::test_app_state;
use serde_json::json;
use tokio::time::{Duration, timeout};

fn request_bytes(syscall: &str, data: Data) -> Vec<u8> {
    let req = Frame::request(syscall, data);
    frames::encode_frame(&frames::Frame::from(&req))
}

fn subscribe_data(table: &str, events: &[&str]) -> Data {
    let mut data = Data::new();
    data.insert("table".into(), json!(table));
    data.insert("events".into(), json!(events));
    data
}

/// Register a socket the way `run_ws` does and hand back its receiver.
async fn connect(state: &AppState, peer: Peer) -> (Uuid, mpsc::Receiver<Frame>) {
    let client_id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel(CLIENT_CHANNEL_CAPACITY);
    state
        .feed
        .subscribe(peer.owner_id(), client_id, tx, peer.initial_filter())
        .await;
    (client_id, rx)
}

fn order_change(kind: ChangeKind, order_id: Uuid) -> ChangeEvent {
    ChangeEvent {
        table: FeedTable::Orders,
        kind,
        record: json!({ "id": order_id, "status": "waiting" }),
        order_id: Some(order_id),
    }
}

async fn recv_feed(rx: &mut mpsc::Receiver<Frame>) -> Frame {
    timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("feed receive timed out")
        .expect("feed channel closed unexpectedly")
}

async fn assert_no_feed(rx: &mut mpsc::Receiver<Frame>) {
    assert!(
        timeout(Duration::from_millis(80), rx.recv()).await.is_err(),
        "expected no feed frame"
    );
}

fn only(frames: Vec<Frame>) -> Frame {
    assert_eq!(frames.len(), 1, "expected one reply frame");
    frames.into_iter().next().expect("reply")
}

// =============================================================================
// owner subscriptions
// =============================================================================

#[tokio::test]
async fn owner_receives_subscribed_order_changes() {
    let state = test_app_state();
    let peer = Peer::Owner(Uuid::new_v4());
    let (client_id, mut rx) = connect(&state, peer).await;

    let reply = only(
        process_inbound_binary(&state, peer, client_id, &request_bytes("feed:subscribe", subscribe_data("orders", &["*"])))
            .await,
    );
    assert_eq!(reply.status, Status::Done);
    assert_eq!(reply.data["table"], "orders");
    assert_eq!(reply.data["events"], json!(["INSERT", "UPDATE", "DELETE"]));

    let order_id = Uuid::new_v4();
    let reached = state
        .feed
        .publish(peer.owner_id(), &order_change(ChangeKind::Insert, order_id))
        .await;
    assert_eq!(reached, 1);

    let frame = recv_feed(&mut rx).await;
    assert_eq!(frame.syscall, "change:insert");
    assert_eq!(frame.data["table"], "orders");
    assert_eq!(frame.data["event"], "INSERT");
    assert_eq!(frame.data["record"]["id"], order_id.to_string());
    assert_eq!(frame.owner_id, Some(peer.owner_id()));
}

#[tokio::test]
async fn owner_without_subscription_sees_no_changes() {
    let state = test_app_state();
    let peer = Peer::Owner(Uuid::new_v4());
    let (_, mut rx) = connect(&state, peer).await;

    state
        .feed
        .publish(peer.owner_id(), &order_change(ChangeKind::Insert, Uuid::new_v4()))
        .await;
    assert_no_feed(&mut rx).await;
}

#[tokio::test]
async fn event_filter_limits_delivery() {
    let state = test_app_state();
    let peer = Peer::Owner(Uuid::new_v4());
    let (client_id, mut rx) = connect(&state, peer).await;

    process_inbound_binary(&state, peer, client_id, &request_bytes("feed:subscribe", subscribe_data("orders", &["UPDATE"])))
        .await;

    let order_id = Uuid::new_v4();
    state
        .feed
        .publish(peer.owner_id(), &order_change(ChangeKind::Insert, order_id))
        .await;
    assert_no_feed(&mut rx).await;

    state
        .feed
        .publish(peer.owner_id(), &order_change(ChangeKind::Update, order_id))
        .await;
    assert_eq!(recv_feed(&mut rx).await.syscall, "change:update");
}

#[tokio::test]
async fn unsubscribe_stops_delivery() {
    let state = test_app_state();
    let peer = Peer::Owner(Uuid::new_v4());
    let (client_id, mut rx) = connect(&state, peer).await;

    process_inbound_binary(&state, peer, client_id, &request_bytes("feed:subscribe", subscribe_data("orders", &[]))).await;
    let mut data = Data::new();
    data.insert("table".into(), json!("orders"));
    let reply = only(process_inbound_binary(&state, peer, client_id, &request_bytes("feed:unsubscribe", data)).await);
    assert_eq!(reply.status, Status::Done);

    state
        .feed
        .publish(peer.owner_id(), &order_change(ChangeKind::Insert, Uuid::new_v4()))
        .await;
    assert_no_feed(&mut rx).await;
}

#[tokio::test]
async fn other_restaurants_changes_stay_private() {
    let state = test_app_state();
    let peer = Peer::Owner(Uuid::new_v4());
    let (client_id, mut rx) = connect(&state, peer).await;
    process_inbound_binary(&state, peer, client_id, &request_bytes("feed:subscribe", subscribe_data("orders", &["*"])))
        .await;

    let reached = state
        .feed
        .publish(Uuid::new_v4(), &order_change(ChangeKind::Insert, Uuid::new_v4()))
        .await;
    assert_eq!(reached, 0);
    assert_no_feed(&mut rx).await;
}

// =============================================================================
// customer watchers
// =============================================================================

#[tokio::test]
async fn customer_sees_only_its_order() {
    let state = test_app_state();
    let owner_id = Uuid::new_v4();
    let order_id = Uuid::new_v4();
    let (_, mut rx) = connect(&state, Peer::Customer { owner_id, order_id }).await;

    state
        .feed
        .publish(owner_id, &order_change(ChangeKind::Update, Uuid::new_v4()))
        .await;
    assert_no_feed(&mut rx).await;

    state
        .feed
        .publish(owner_id, &order_change(ChangeKind::Update, order_id))
        .await;
    let frame = recv_feed(&mut rx).await;
    assert_eq!(frame.syscall, "change:update");
    assert_eq!(frame.data["record"]["id"], order_id.to_string());
}

#[tokio::test]
async fn customer_cannot_change_subscription() {
    let state = test_app_state();
    let peer = Peer::Customer { owner_id: Uuid::new_v4(), order_id: Uuid::new_v4() };
    let (client_id, _rx) = connect(&state, peer).await;

    let reply = only(
        process_inbound_binary(&state, peer, client_id, &request_bytes("feed:subscribe", subscribe_data("menu_items", &["*"])))
            .await,
    );
    assert_eq!(reply.status, Status::Error);
    assert_eq!(reply.data["code"], "E_WATCHER_PINNED");
}

// =============================================================================
// dispatch
// =============================================================================

#[tokio::test]
async fn ping_replies_done() {
    let state = test_app_state();
    let peer = Peer::Owner(Uuid::new_v4());
    let (client_id, _rx) = connect(&state, peer).await;

    let req = Frame::request("feed:ping", Data::new());
    let reply = only(process_inbound(&state, peer, client_id, req.clone()).await);
    assert_eq!(reply.status, Status::Done);
    assert_eq!(reply.parent_id, Some(req.id));
    assert_eq!(reply.data["pong"], true);
}

#[tokio::test]
async fn unknown_table_and_event_are_rejected() {
    let state = test_app_state();
    let peer = Peer::Owner(Uuid::new_v4());
    let (client_id, _rx) = connect(&state, peer).await;

    let reply = only(
        process_inbound_binary(&state, peer, client_id, &request_bytes("feed:subscribe", subscribe_data("owners", &[]))).await,
    );
    assert_eq!(reply.data["code"], "E_UNKNOWN_TABLE");

    let reply = only(
        process_inbound_binary(&state, peer, client_id, &request_bytes("feed:subscribe", subscribe_data("orders", &["TRUNCATE"])))
            .await,
    );
    assert_eq!(reply.data["code"], "E_UNKNOWN_EVENT");

    let reply = only(process_inbound_binary(&state, peer, client_id, &request_bytes("feed:subscribe", Data::new())).await);
    assert_eq!(reply.data["code"], "E_MISSING_TABLE");
}

#[tokio::test]
async fn unknown_prefix_is_an_error() {
    let state = test_app_state();
    let peer = Peer::Owner(Uuid::new_v4());
    let reply = only(process_inbound_binary(&state, peer, Uuid::new_v4(), &request_bytes("cart:add", Data::new())).await);
    assert_eq!(reply.status, Status::Error);
    assert_eq!(reply.data["message"], "unknown prefix: cart");
}

#[tokio::test]
async fn garbage_bytes_get_a_gateway_error() {
    let state = test_app_state();
    let reply = only(process_inbound_binary(&state, Peer::Owner(Uuid::new_v4()), Uuid::new_v4(), &[0xff, 0xff, 0xff]).await);
    assert_eq!(reply.syscall, "gateway:error");
}

#[tokio::test]
async fn json_text_frames_are_accepted() {
    let state = test_app_state();
    let peer = Peer::Owner(Uuid::new_v4());
    let (client_id, _rx) = connect(&state, peer).await;

    let req = Frame::request("feed:ping", Data::new());
    let text = serde_json::to_string(&frames::Frame::from(&req)).expect("serialize");
    let reply = only(process_inbound_text(&state, peer, client_id, &text).await);
    assert_eq!(reply.status, Status::Done);

    let reply = only(process_inbound_text(&state, peer, client_id, "{not json").await);
    assert_eq!(reply.syscall, "gateway:error");
}

#[test]
fn outbound_encoding_follows_the_connection() {
    let frame = Frame::request("change:update", Data::new()).with_from("system");
    assert!(matches!(encode(&frame, Encoding::Binary), Ok(Message::Binary(_))));

    let Ok(Message::Text(text)) = encode(&frame, Encoding::Text) else {
        panic!("expected a text message");
    };
    let wire: frames::Frame = serde_json::from_str(text.as_str()).expect("wire json");
    assert_eq!(wire.syscall, "change:update");
}

#[tokio::test]
async fn missing_credentials_are_unauthorized() {
    let state = test_app_state();
    let response = authenticate(&state, &WsParams::default())
        .await
        .expect_err("no credentials");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
