//! Gotify client against an in-process stub server

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use chrono::DateTime;
use omada_to_gotify::notification::gotify::TOKEN_HEADER;
use omada_to_gotify::{
    GotifyClient, GotifyConfig, NotificationChannel, NotificationMessage, SendResult,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};

const TOKEN: &str = "someAppToken";

/// Request seen by the stub: token header and JSON body
type Received = Arc<Mutex<Vec<(Option<String>, Value)>>>;

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    reply: &'static str,
    received: Received,
}

async fn handle_message(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    let token = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    state.received.lock().unwrap().push((token, body));
    (state.status, state.reply.to_string())
}

/// Start a stub Gotify, returning its base URL and the request log
async fn spawn_stub(status: StatusCode, reply: &'static str) -> (String, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        status,
        reply,
        received: received.clone(),
    };
    let app = Router::new()
        .route("/message", post(handle_message))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/", addr), received)
}

fn client(url: String) -> GotifyClient {
    GotifyClient::new(GotifyConfig {
        url,
        token: TOKEN.to_string(),
        timeout_secs: 5,
    })
    .unwrap()
}

fn sample_message() -> NotificationMessage {
    NotificationMessage::new(
        "Omada Controller NNNNNN: Test Site",
        "The controller failed to send site logs to 192.168.10.11 automatically (1 logs in total).\nTimestamp: 2025-09-22 22:21:53 +0000 UTC",
        4,
    )
    .with_date(DateTime::from_timestamp_millis(1_758_579_713_747).unwrap())
}

#[tokio::test]
async fn test_send_posts_message() {
    let (url, received) = spawn_stub(StatusCode::OK, r#"{"id":1}"#).await;
    let gotify = client(url);

    let result = gotify.send(&sample_message()).await.unwrap();
    assert_eq!(result, SendResult::Sent);

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    let (token, body) = &received[0];
    assert_eq!(token.as_deref(), Some(TOKEN));
    assert_eq!(body["title"], "Omada Controller NNNNNN: Test Site");
    assert_eq!(body["priority"], 4);
    assert_eq!(body["date"], "2025-09-22T22:21:53.747Z");
    assert!(body["message"].as_str().unwrap().starts_with("The controller failed"));
}

#[tokio::test]
async fn test_send_surfaces_gotify_error() {
    let (url, received) = spawn_stub(
        StatusCode::UNAUTHORIZED,
        r#"{"error":"Unauthorized","errorCode":401,"errorDescription":"you need to provide a valid access token or user credentials to access this api"}"#,
    )
    .await;
    let gotify = client(url);

    let err = gotify.send(&sample_message()).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("401"), "{}", msg);
    assert!(msg.contains("valid access token"), "{}", msg);
    assert_eq!(received.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_send_plain_error_body() {
    let (url, _) = spawn_stub(StatusCode::INTERNAL_SERVER_ERROR, "boom").await;
    let err = client(url).send(&sample_message()).await.unwrap_err();
    assert!(err.to_string().contains("boom"));
}

#[tokio::test]
async fn test_send_connection_refused() {
    // Grab a free port, then close it again
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = client(format!("http://{}", addr)).send(&sample_message()).await;
    assert!(result.is_err());
}
