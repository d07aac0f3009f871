//! Webhook HTTP server
//!
//! Accepts `POST` on any path from the Omada controller, checks the `Access_token`
//! header against the shared secret, then normalizes and relays the body.
//!
//! | outcome                    | status |
//! |----------------------------|--------|
//! | relayed (or dry-run)       | 200    |
//! | bad or missing token       | 403    |
//! | body is not a valid payload| 400    |
//! | body over the size limit   | 413    |
//! | delivery failed            | 502    |

use crate::config::DEFAULT_MAX_BODY_BYTES;
use crate::notification::{
    DiagnosticSink, NotificationChannel, NotificationMessage, Normalizer, SendResult, TracingSink,
};
use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};

/// Header the controller puts the shared secret in
pub const ACCESS_TOKEN_HEADER: &str = "access_token";

/// Shared per-server state for the handler
#[derive(Clone)]
struct WebhookState {
    shared_secret: Arc<str>,
    normalizer: Arc<Normalizer<Arc<dyn DiagnosticSink>>>,
    channel: Arc<dyn NotificationChannel>,
}

/// Omada → notification channel relay
pub struct WebhookServer {
    state: WebhookState,
    max_body_bytes: usize,
}

impl WebhookServer {
    pub fn new(shared_secret: impl Into<String>, channel: Arc<dyn NotificationChannel>) -> Self {
        let sink: Arc<dyn DiagnosticSink> = Arc::new(TracingSink);
        Self {
            state: WebhookState {
                shared_secret: Arc::from(shared_secret.into()),
                normalizer: Arc::new(Normalizer::with_sink(sink)),
                channel,
            },
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Send normalizer diagnostics somewhere other than `tracing`
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.state.normalizer = Arc::new(Normalizer::with_sink(sink));
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// The controller's webhook URL may carry any path; all of them land here
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", post(handle_webhook))
            .route("/{*path}", post(handle_webhook))
            .layer(DefaultBodyLimit::max(self.max_body_bytes))
            .with_state(self.state.clone())
    }

    /// Listen on `addr` until Ctrl-C
    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        info!(
            addr = %addr,
            channel = self.state.channel.name(),
            "Webhook server listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Webhook server failed")
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn handle_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !is_authorized(&headers, &state.shared_secret) {
        warn!("Rejected webhook with missing or wrong access token");
        return (StatusCode::FORBIDDEN, "Not authorized\n").into_response();
    }

    let message = match state.normalizer.parse(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "Error parsing Omada notification message");
            return (StatusCode::BAD_REQUEST, "Message parsing error\n").into_response();
        }
    };

    let notification = NotificationMessage::from(&message);
    match state.channel.send(&notification).await {
        Ok(SendResult::Sent) | Ok(SendResult::Skipped(_)) => StatusCode::OK.into_response(),
        Ok(SendResult::Failed(reason)) => {
            error!(channel = state.channel.name(), reason = %reason, "Notification was refused");
            (StatusCode::BAD_GATEWAY, "Failed to deliver notification\n").into_response()
        }
        Err(e) => {
            error!(channel = state.channel.name(), error = %e, "Error sending notification");
            (StatusCode::BAD_GATEWAY, "Failed to deliver notification\n").into_response()
        }
    }
}

/// Exact, case-sensitive match of the first `Access_token` value
fn is_authorized(headers: &HeaderMap, shared_secret: &str) -> bool {
    match headers.get(ACCESS_TOKEN_HEADER) {
        Some(value) => constant_time_eq(value.as_bytes(), shared_secret.as_bytes()),
        None => false,
    }
}

#[must_use]
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"vewySecwet", b"vewySecwet"));
        assert!(!constant_time_eq(b"vewySecwet", b"vewySecwet_"));
        assert!(!constant_time_eq(b"vewySecwet", b"VEWYSECWET"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_is_authorized() {
        let mut headers = HeaderMap::new();
        assert!(!is_authorized(&headers, "vewySecwet"));

        headers.insert("access_token", HeaderValue::from_static("vewySecwet"));
        assert!(is_authorized(&headers, "vewySecwet"));
        assert!(!is_authorized(&headers, "vewysecwet"));
    }

    #[test]
    fn test_empty_token_never_matches_configured_secret() {
        let mut headers = HeaderMap::new();
        headers.insert("access_token", HeaderValue::from_static(""));
        assert!(!is_authorized(&headers, "vewySecwet"));
    }
}
