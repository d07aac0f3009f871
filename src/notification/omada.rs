//! Omada webhook payload parsing and normalization
//!
//! The controller must be configured to send the "Omada format" webhook;
//! the Google Chat format is not supported.
//!
//! An actual payload as sent by a controller:
//! ```json
//! {
//!   "Site": "Some Site",
//!   "description": "This is a webhook message from Omada Controller",
//!   "shardSecret": "xxxxxxxxxxx",
//!   "text": [
//!     "The controller failed to send site logs to 192.168.10.11 automatically (1 logs in total)."
//!   ],
//!   "Controller": "Omada Controller_ZZZZZZ",
//!   "timestamp": 1758579713747
//! }
//! ```

use super::message_type::{classify, MessageType};
use super::redact::{redact_payload, SECRET_MASK};
use super::sink::{DiagnosticSink, Level, TracingSink};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Controller label used for test pings that don't name a controller
pub const TEST_CONTROLLER: &str = "Omada Webhook Test";

/// Incoming webhook body, as the controller sends it
///
/// Every field may be absent or null. Unknown fields are ignored.
#[derive(Clone, Default, Deserialize)]
pub struct RawPayload {
    #[serde(rename = "Site", default)]
    pub site: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub text: Option<Vec<String>>,
    #[serde(rename = "Controller", default)]
    pub controller: Option<String>,
    /// Milliseconds since the unix epoch; 0 means unknown
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Taken as any JSON value so a mistyped secret can't end up in a serde error message
    #[serde(rename = "shardSecret", default)]
    shared_secret: Option<serde_json::Value>,
}

impl std::fmt::Debug for RawPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawPayload")
            .field("site", &self.site)
            .field("description", &self.description)
            .field("text", &self.text)
            .field("controller", &self.controller)
            .field("timestamp", &self.timestamp)
            .field("shared_secret", &self.shared_secret.as_ref().map(|_| SECRET_MASK))
            .finish()
    }
}

/// The payload could not be decoded at all
#[derive(Debug, thiserror::Error)]
#[error("error decoding the message into the Omada message format: {source}")]
pub struct ParseError {
    redacted_payload: String,
    source: serde_json::Error,
}

impl ParseError {
    /// The offending payload with the shared secret masked
    pub fn redacted_payload(&self) -> &str {
        &self.redacted_payload
    }
}

/// A classified Omada message, ready to be turned into a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMessage {
    controller: String,
    site: String,
    lines: Vec<String>,
    date: DateTime<Utc>,
    timestamp_substituted: bool,
    message_type: MessageType,
}

impl NormalizedMessage {
    pub fn controller(&self) -> &str {
        &self.controller
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn priority(&self) -> i32 {
        self.message_type.priority()
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.date.timestamp_millis()
    }

    /// True when the payload carried no usable timestamp and "now" was used
    pub fn timestamp_substituted(&self) -> bool {
        self.timestamp_substituted
    }

    /// `"<controller>: <site>"`, separator included even when either side is empty
    pub fn title(&self) -> String {
        format!("{}: {}", self.controller, self.site)
    }

    pub fn body(&self) -> String {
        self.lines.join("\n")
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }
}

/// Render a timestamp the way it appears in the notification body,
/// e.g. `2022-01-01 00:00:00 +0000 UTC`
pub fn human_readable_timestamp(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d %H:%M:%S %z UTC").to_string()
}

/// Turns raw webhook bytes into [`NormalizedMessage`]s
///
/// Holds no per-request state; one instance can serve every request.
#[derive(Debug, Clone, Default)]
pub struct Normalizer<S = TracingSink> {
    sink: S,
}

impl Normalizer<TracingSink> {
    pub fn new() -> Self {
        Self { sink: TracingSink }
    }
}

impl<S: DiagnosticSink> Normalizer<S> {
    pub fn with_sink(sink: S) -> Self {
        Self { sink }
    }

    /// Parse and classify a webhook body, using the wall clock for missing timestamps
    pub fn parse(&self, body: &[u8]) -> Result<NormalizedMessage, ParseError> {
        self.parse_at(body, Utc::now())
    }

    /// Same as [`parse`](Self::parse) with an explicit "now"
    pub fn parse_at(&self, body: &[u8], now: DateTime<Utc>) -> Result<NormalizedMessage, ParseError> {
        // Redact first: this copy is the only form of the body that may be logged
        let redacted = redact_payload(body);
        self.sink.append(
            Level::Info,
            &format!("Processing incoming message: `{}`", redacted),
        );

        let raw: RawPayload = match serde_json::from_slice(body) {
            Ok(raw) => raw,
            Err(source) => {
                self.sink.append(
                    Level::Warn,
                    &format!(
                        "Error decoding the message into the Omada message format: {}; the message was: `{}`",
                        source, redacted
                    ),
                );
                return Err(ParseError {
                    redacted_payload: redacted,
                    source,
                });
            }
        };

        Ok(self.normalize(raw, now))
    }

    fn normalize(&self, raw: RawPayload, now: DateTime<Utc>) -> NormalizedMessage {
        let description = raw.description.unwrap_or_default();
        let text = raw.text.unwrap_or_default();

        let message_type = classify(&description, &text);
        self.sink.append(
            Level::Info,
            &format!(
                "The message is detected to be of type `{}` and is given priority {}",
                message_type,
                message_type.priority()
            ),
        );

        let mut lines = text;
        if lines.is_empty() && message_type == MessageType::Test {
            lines.push(description);
        }

        let mut controller = raw.controller.unwrap_or_default();
        if controller.is_empty() && message_type == MessageType::Test {
            controller = TEST_CONTROLLER.to_string();
        }

        let (date, timestamp_substituted) = self.resolve_timestamp(raw.timestamp, now);

        // A test ping without its own timestamp stays just the description
        if !(timestamp_substituted && message_type == MessageType::Test) {
            lines.push(format!("Timestamp: {}", human_readable_timestamp(&date)));
        }

        NormalizedMessage {
            controller,
            site: raw.site.unwrap_or_default(),
            lines,
            date,
            timestamp_substituted,
            message_type,
        }
    }

    fn resolve_timestamp(&self, timestamp: Option<i64>, now: DateTime<Utc>) -> (DateTime<Utc>, bool) {
        // Millisecond precision, like the timestamps the controller sends
        let now = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);

        match timestamp {
            Some(0) | None => {
                self.sink.append(
                    Level::Info,
                    &format!(
                        "Message is missing a timestamp; inserted current msec epoch of {}",
                        now.timestamp_millis()
                    ),
                );
                (now, true)
            }
            Some(millis) => match DateTime::from_timestamp_millis(millis) {
                Some(date) => (date, false),
                None => {
                    self.sink.append(
                        Level::Warn,
                        &format!(
                            "Message timestamp {} is out of range; inserted current msec epoch of {}",
                            millis,
                            now.timestamp_millis()
                        ),
                    );
                    (now, true)
                }
            },
        }
    }
}

/// Parse a webhook body with a tracing-backed [`Normalizer`]
pub fn parse(body: &[u8]) -> Result<NormalizedMessage, ParseError> {
    Normalizer::new().parse(body)
}
