use super::*;
use crate::test_helpers::{self, FakeGateway, Recorded};

fn params(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

async fn room_for(gateway: &FakeGateway) -> VideoRoom {
    VideoRoom::new(Janus::new(gateway.config()).unwrap())
}

/// Script create + attach + the videoroom reply for one request.
fn script(gateway: &FakeGateway, data: Value) {
    gateway.push_json(test_helpers::with_id("1234"));
    gateway.push_json(test_helpers::with_id("5678"));
    gateway.push_json(test_helpers::plugin_reply(PLUGIN_NAME, data));
}

/// The plugin message body of the single scripted call.
fn sent_body(gateway: &FakeGateway) -> Value {
    let message: Recorded = gateway.request(2);
    assert_eq!(message.verb(), Some("message"));
    message.body["body"].clone()
}

#[test]
fn plugin_contract() {
    assert_eq!(VideoRoomPlugin.name(), "janus.plugin.videoroom");
    assert_eq!(VideoRoomPlugin.status_key(), "videoroom");
}

#[tokio::test]
async fn list_returns_rooms_and_disconnects() {
    let gateway = FakeGateway::start().await;
    script(&gateway, json!({ "videoroom": "success", "list": [{ "room": 1 }, { "room": 2 }] }));
    let mut videoroom = room_for(&gateway).await;

    let data = videoroom.list().await.unwrap();

    assert_eq!(data["list"].as_array().map(Vec::len), Some(2));
    assert_eq!(sent_body(&gateway), json!({ "request": "list" }));
    assert_eq!(gateway.request(1).body["plugin"], json!(PLUGIN_NAME));
    assert_eq!(gateway.request(3).verb(), Some("destroy"));
}

#[tokio::test]
async fn exists_reads_flag() {
    let gateway = FakeGateway::start().await;
    script(&gateway, json!({ "videoroom": "success", "room": 1234, "exists": true }));
    let mut videoroom = room_for(&gateway).await;

    assert!(videoroom.exists(1234).await.unwrap());
    assert_eq!(sent_body(&gateway), json!({ "request": "exists", "room": 1234 }));
}

#[tokio::test]
async fn exists_false_when_absent() {
    let gateway = FakeGateway::start().await;
    script(&gateway, json!({ "videoroom": "success", "room": 99, "exists": false }));
    let mut videoroom = room_for(&gateway).await;

    assert!(!videoroom.exists(99).await.unwrap());
}

#[tokio::test]
async fn create_sends_defaults_and_returns_credentials() {
    let gateway = FakeGateway::start().await;
    script(&gateway, json!({ "videoroom": "created", "room": 4321, "permanent": false }));
    let mut videoroom = room_for(&gateway).await.with_admin_key(Some("admin".into()));

    let data = videoroom.create(Map::new(), true, true).await.unwrap();

    let body = sent_body(&gateway);
    assert_eq!(body["request"], json!("create"));
    assert_eq!(body["publishers"], json!(2));
    assert_eq!(body["bitrate"], json!(600_000));
    assert_eq!(body["audiolevel_event"], json!(true));
    assert_eq!(body["audio_active_packets"], json!(50));
    assert_eq!(body["audio_level_average"], json!(25));
    assert_eq!(body["notify_joining"], json!(true));
    assert_eq!(body["admin_key"], json!("admin"));
    assert_eq!(body["description"].as_str().map(str::len), Some(DESCRIPTION_LEN));

    let pin = body["pin"].as_str().unwrap();
    let secret = body["secret"].as_str().unwrap();
    assert_eq!(pin.len(), PIN_LEN);
    assert_eq!(secret.len(), SECRET_LEN);
    assert_eq!(data["room"], json!(4321));
    assert_eq!(data["pin"], json!(pin));
    assert_eq!(data["secret"], json!(secret));
}

#[tokio::test]
async fn create_without_credentials_returns_nulls() {
    let gateway = FakeGateway::start().await;
    script(&gateway, json!({ "videoroom": "created", "room": 4321 }));
    let mut videoroom = room_for(&gateway).await;

    let data = videoroom.create(Map::new(), false, false).await.unwrap();

    let body = sent_body(&gateway);
    assert!(body.get("pin").is_none());
    assert!(body.get("secret").is_none());
    assert!(body.get("admin_key").is_none());
    assert_eq!(data["pin"], Value::Null);
    assert_eq!(data["secret"], Value::Null);
}

#[tokio::test]
async fn create_params_override_defaults() {
    let gateway = FakeGateway::start().await;
    script(&gateway, json!({ "videoroom": "created", "room": 7 }));
    let mut videoroom = room_for(&gateway).await;

    let data = videoroom
        .create(params(json!({ "room": 7, "publishers": 10, "pin": "1234" })), true, false)
        .await
        .unwrap();

    let body = sent_body(&gateway);
    assert_eq!(body["publishers"], json!(10));
    assert_eq!(body["room"], json!(7));
    assert_eq!(data["pin"], json!("1234"));
    assert_eq!(data["secret"], Value::Null);
}

#[tokio::test]
async fn create_echoes_non_string_credentials() {
    let gateway = FakeGateway::start().await;
    script(&gateway, json!({ "videoroom": "created", "room": 7 }));
    let mut videoroom = room_for(&gateway).await;

    let data = videoroom
        .create(params(json!({ "room": 7, "pin": 1234, "secret": "" })), false, false)
        .await
        .unwrap();

    assert_eq!(sent_body(&gateway)["pin"], json!(1234));
    assert_eq!(data["pin"], json!(1234));
    assert_eq!(data["secret"], Value::Null);
}

#[tokio::test]
async fn create_rejects_wrong_status() {
    let gateway = FakeGateway::start().await;
    script(&gateway, json!({ "videoroom": "event", "error_code": 427, "error": "Room 7 already exists" }));
    let mut videoroom = room_for(&gateway).await;

    let err = videoroom.create(params(json!({ "room": 7 })), true, true).await.unwrap_err();

    assert!(matches!(
        err,
        GatewayError::UnexpectedPluginResponse { ref expected, .. } if expected == "created"
    ));
}

#[tokio::test]
async fn edit_merges_params() {
    let gateway = FakeGateway::start().await;
    script(&gateway, json!({ "videoroom": "edited", "room": 7 }));
    let mut videoroom = room_for(&gateway).await;

    videoroom.edit(7, params(json!({ "new_description": "standup" })), Some("s3cret")).await.unwrap();

    assert_eq!(
        sent_body(&gateway),
        json!({ "request": "edit", "room": 7, "secret": "s3cret", "new_description": "standup" })
    );
}

#[tokio::test]
async fn destroy_expects_destroyed() {
    let gateway = FakeGateway::start().await;
    script(&gateway, json!({ "videoroom": "destroyed", "room": 7 }));
    let mut videoroom = room_for(&gateway).await;

    let data = videoroom.destroy(7, None).await.unwrap();

    assert_eq!(data["room"], json!(7));
    assert_eq!(sent_body(&gateway), json!({ "request": "destroy", "room": 7 }));
}

#[tokio::test]
async fn allowed_sends_action_and_tokens() {
    let gateway = FakeGateway::start().await;
    script(&gateway, json!({ "videoroom": "success", "room": 7, "allowed": ["a", "b"] }));
    let mut videoroom = room_for(&gateway).await;
    let tokens = vec!["a".to_owned(), "b".to_owned()];

    videoroom.allowed(7, AllowedAction::Add, Some(&tokens), None).await.unwrap();

    assert_eq!(
        sent_body(&gateway),
        json!({ "request": "allowed", "room": 7, "action": "add", "allowed": ["a", "b"] })
    );
}

#[tokio::test]
async fn kick_sends_participant_id() {
    let gateway = FakeGateway::start().await;
    script(&gateway, json!({ "videoroom": "success" }));
    let mut videoroom = room_for(&gateway).await;

    videoroom.kick(7, 42, Some("s3cret")).await.unwrap();

    assert_eq!(sent_body(&gateway), json!({ "request": "kick", "room": 7, "id": 42, "secret": "s3cret" }));
}

#[tokio::test]
async fn list_participants_expects_participants() {
    let gateway = FakeGateway::start().await;
    script(&gateway, json!({ "videoroom": "participants", "room": 7, "participants": [{ "id": 42 }] }));
    let mut videoroom = room_for(&gateway).await;

    let data = videoroom.list_participants(7).await.unwrap();

    assert_eq!(data["participants"][0]["id"], json!(42));
    assert_eq!(sent_body(&gateway)["request"], json!("listparticipants"));
}

#[tokio::test]
async fn list_forwarders_expects_forwarders() {
    let gateway = FakeGateway::start().await;
    script(&gateway, json!({ "videoroom": "forwarders", "room": 7, "publishers": [] }));
    let mut videoroom = room_for(&gateway).await;

    videoroom.list_forwarders(7, None).await.unwrap();

    assert_eq!(sent_body(&gateway), json!({ "request": "listforwarders", "room": 7 }));
}

#[tokio::test]
async fn moderate_sends_mute_and_mid() {
    let gateway = FakeGateway::start().await;
    script(&gateway, json!({ "videoroom": "success" }));
    let mut videoroom = room_for(&gateway).await;

    videoroom.moderate(7, 42, true, Some("0"), None).await.unwrap();

    assert_eq!(
        sent_body(&gateway),
        json!({ "request": "moderate", "room": 7, "id": 42, "mute": true, "mid": "0" })
    );
}

#[tokio::test]
async fn enable_recording_sends_flag() {
    let gateway = FakeGateway::start().await;
    script(&gateway, json!({ "videoroom": "success", "record": true }));
    let mut videoroom = room_for(&gateway).await;

    videoroom.enable_recording(7, true, Some("s3cret"), Some("1234")).await.unwrap();

    assert_eq!(
        sent_body(&gateway),
        json!({ "request": "enable_recording", "room": 7, "record": true, "secret": "s3cret", "pin": "1234" })
    );
}

#[tokio::test]
async fn batch_keeps_session_until_forced() {
    let gateway = FakeGateway::start().await;
    script(&gateway, json!({ "videoroom": "success", "exists": true }));
    gateway.push_json(test_helpers::plugin_reply(PLUGIN_NAME, json!({ "videoroom": "success", "list": [] })));
    let mut videoroom = room_for(&gateway).await;
    videoroom.without_disconnect();

    assert!(videoroom.exists(7).await.unwrap());
    videoroom.list().await.unwrap();
    assert_eq!(gateway.request_count(), 4);

    assert!(videoroom.disconnect(true).await.is_confirmed());
    assert_eq!(gateway.request(4).verb(), Some("destroy"));
    assert_eq!(gateway.request(4).path, FakeGateway::path("/1234"));
}
