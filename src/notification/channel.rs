//! Notification channel trait and the outbound message record

use super::omada::NormalizedMessage;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Notification as handed to a delivery channel
///
/// Serializes to the body Gotify's `POST /message` expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub title: String,
    pub message: String,
    pub priority: i32,
    pub date: DateTime<Utc>,
}

impl NotificationMessage {
    pub fn new(title: impl Into<String>, message: impl Into<String>, priority: i32) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            priority,
            date: Utc::now(),
        }
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }
}

impl From<&NormalizedMessage> for NotificationMessage {
    fn from(msg: &NormalizedMessage) -> Self {
        Self {
            title: msg.title(),
            message: msg.body(),
            priority: msg.priority(),
            date: msg.date(),
        }
    }
}

/// Outcome of a delivery attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    /// Delivered
    Sent,
    /// Deliberately not delivered, e.g. dry-run
    Skipped(String),
    /// The remote end refused the message
    Failed(String),
}

/// Destination for notifications
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Channel name, used in logs
    fn name(&self) -> &str;

    /// Deliver one message. No retries.
    async fn send(&self, message: &NotificationMessage) -> Result<SendResult>;
}

/// Logs messages instead of delivering them
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunChannel;

#[async_trait]
impl NotificationChannel for DryRunChannel {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn send(&self, message: &NotificationMessage) -> Result<SendResult> {
        info!(
            channel = "dry-run",
            title = %message.title,
            priority = message.priority,
            date = %message.date,
            "[DRY-RUN] Would send notification"
        );
        Ok(SendResult::Skipped("dry-run".to_string()))
    }
}
