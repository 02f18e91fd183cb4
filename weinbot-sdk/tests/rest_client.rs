//! REST client tests against a local fake of the platform API.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{patch, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};

use weinbot_sdk::client::{CommandSpec, RestClient, RestError};
use weinbot_sdk::component::MessagePayload;

#[derive(Default)]
struct Seen {
    requests: Vec<(String, Value, Option<String>)>,
}

type Shared = Arc<Mutex<Seen>>;

fn auth(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn create_message(
    State(seen): State<Shared>,
    Path(channel): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    seen.lock()
        .unwrap()
        .requests
        .push((format!("POST /channels/{channel}/messages"), body, auth(&headers)));
    Json(json!({ "id": "m-1", "channel_id": channel, "content": "ignored" }))
}

async fn create_dm(State(seen): State<Shared>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let recipient = body["recipient_id"].as_str().unwrap_or_default().to_string();
    seen.lock()
        .unwrap()
        .requests
        .push(("POST /users/@me/channels".into(), body, None));
    if recipient == "blocked" {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "code": 50007, "message": "Cannot send messages to this user" })),
        );
    }
    (StatusCode::OK, Json(json!({ "id": format!("dm-{recipient}"), "type": 1 })))
}

async fn edit_original(
    State(seen): State<Shared>,
    Path((app, token)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    seen.lock()
        .unwrap()
        .requests
        .push((format!("PATCH /webhooks/{app}/{token}"), body, None));
    Json(json!({ "id": "orig", "channel_id": "c" }))
}

async fn register(State(seen): State<Shared>, Path(app): Path<String>, Json(body): Json<Value>) -> Json<Value> {
    let n = body.as_array().map(|a| a.len()).unwrap_or(0);
    seen.lock()
        .unwrap()
        .requests
        .push((format!("PUT /applications/{app}/commands"), body, None));
    Json(Value::Array((0..n).map(|i| json!({ "id": i.to_string() })).collect()))
}

async fn stalled() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "id": "late", "channel_id": "c" }))
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::BAD_GATEWAY, "upstream exploded")
}

async fn start_fake_api() -> (String, Shared) {
    let seen: Shared = Arc::default();
    let app = Router::new()
        .route("/channels/{channel}/messages", post(create_message))
        .route("/channels/{channel}/messages/{message}", patch(broken))
        .route("/users/@me/channels", post(create_dm))
        .route("/webhooks/{app}/{token}/messages/@original", patch(edit_original))
        .route("/applications/{app}/commands", put(register))
        .route("/stalled/channels/{channel}/messages", post(stalled))
        .with_state(seen.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), seen)
}

#[tokio::test]
async fn create_message_returns_reference_and_sends_bot_token() {
    let (base, seen) = start_fake_api().await;
    let client = RestClient::new("secret-token", "app-1").with_base(base);

    let msg = client
        .create_message("staff", &MessagePayload::text("Neue Bestellung"))
        .await
        .unwrap();
    assert_eq!(msg.id, "m-1");
    assert_eq!(msg.channel_id, "staff");

    let seen = seen.lock().unwrap();
    let (route, body, auth) = &seen.requests[0];
    assert_eq!(route, "POST /channels/staff/messages");
    assert_eq!(body["content"], "Neue Bestellung");
    assert_eq!(auth.as_deref(), Some("Bot secret-token"));
}

#[tokio::test]
async fn dm_refusal_is_reported_as_blocked() {
    let (base, _seen) = start_fake_api().await;
    let client = RestClient::new("t", "app-1").with_base(base);

    assert_eq!(client.create_dm("42").await.unwrap(), "dm-42");

    let err = client.create_dm("blocked").await.unwrap_err();
    assert!(err.is_dm_blocked(), "unexpected error: {err}");
    match err {
        RestError::Api { status, code, message } => {
            assert_eq!(status, 403);
            assert_eq!(code, Some(50007));
            assert!(message.contains("Cannot send"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn non_json_errors_keep_the_body() {
    let (base, _seen) = start_fake_api().await;
    let client = RestClient::new("t", "app-1").with_base(base);

    let err = client
        .edit_message("staff", "m-1", &MessagePayload::text("x"))
        .await
        .unwrap_err();
    assert!(!err.is_dm_blocked());
    match err {
        RestError::Api { status, code, message } => {
            assert_eq!(status, 502);
            assert_eq!(code, None);
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn edit_original_and_register_commands() {
    let (base, seen) = start_fake_api().await;
    let client = RestClient::new("t", "app-1").with_base(format!("{base}/"));

    client
        .edit_original_response("tok-9", &MessagePayload::text("Ergebnis"))
        .await
        .unwrap();

    let n = client
        .register_commands(
            None,
            &[
                CommandSpec::chat_input("bestellen", "Wein bestellen"),
                CommandSpec::chat_input("münze", "Wirf eine Münze"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(n, 2);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.requests[0].0, "PATCH /webhooks/app-1/tok-9");
    assert_eq!(seen.requests[0].1["content"], "Ergebnis");
    assert_eq!(seen.requests[1].0, "PUT /applications/app-1/commands");
    assert_eq!(seen.requests[1].1[1]["name"], "münze");
    assert_eq!(seen.requests[1].1[0]["type"], 1);
}

#[tokio::test]
async fn hung_request_times_out() {
    let (base, _seen) = start_fake_api().await;
    let client = RestClient::new("t", "app-1")
        .with_base(format!("{base}/stalled"))
        .with_timeout(Duration::from_millis(100));

    let started = std::time::Instant::now();
    let err = client
        .create_message("staff", &MessagePayload::text("hallo"))
        .await
        .unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(2));
    match err {
        RestError::Transport(e) => assert!(e.is_timeout(), "unexpected error: {e}"),
        other => panic!("expected a timeout, got {other}"),
    }
}
