//! Gotify REST client
//!
//! Sends notifications with `POST <gotify_url>/message`, authenticated by an
//! application token.

use super::channel::{NotificationChannel, NotificationMessage, SendResult};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

/// Header carrying the application token
pub const TOKEN_HEADER: &str = "X-Gotify-Key";

/// Gotify client configuration
#[derive(Clone)]
pub struct GotifyConfig {
    /// Server base URL (e.g. https://gotify.example.com/)
    pub url: String,
    /// Application token
    pub token: String,
    /// Request timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for GotifyConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:80".to_string(),
            token: String::new(),
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for GotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GotifyConfig")
            .field("url", &self.url)
            .field("token", &"****")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Error body returned by Gotify
#[derive(Debug, Deserialize)]
pub struct GotifyError {
    #[serde(default)]
    pub error: String,
    #[serde(rename = "errorCode", default)]
    pub error_code: u16,
    #[serde(rename = "errorDescription", default)]
    pub error_description: String,
}

/// Gotify delivery channel
#[derive(Debug)]
pub struct GotifyClient {
    client: Client,
    config: GotifyConfig,
}

impl GotifyClient {
    pub fn new(config: GotifyConfig) -> Result<Self> {
        if config.token.is_empty() {
            bail!("Gotify application token is required");
        }
        reqwest::Url::parse(&config.url)
            .with_context(|| format!("Invalid Gotify URL: {}", config.url))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    /// Endpoint messages are posted to
    pub fn message_url(&self) -> String {
        format!("{}/message", self.config.url.trim_end_matches('/'))
    }

    /// Post one message to Gotify
    pub async fn send_message(&self, message: &NotificationMessage) -> Result<()> {
        let response = self
            .client
            .post(self.message_url())
            .header(TOKEN_HEADER, &self.config.token)
            .json(message)
            .send()
            .await
            .context("HTTP request to Gotify failed")?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<GotifyError>(&body) {
            Ok(err) if !err.error_description.is_empty() => {
                format!("{} ({}): {}", err.error, err.error_code, err.error_description)
            }
            _ => body,
        };
        Err(anyhow!("Gotify returned {}: {}", status, detail))
    }
}

#[async_trait]
impl NotificationChannel for GotifyClient {
    fn name(&self) -> &str {
        "gotify"
    }

    async fn send(&self, message: &NotificationMessage) -> Result<SendResult> {
        match self.send_message(message).await {
            Ok(()) => {
                info!(channel = "gotify", priority = message.priority, "Message sent");
                Ok(SendResult::Sent)
            }
            Err(e) => {
                error!(channel = "gotify", error = %e, "Could not send message to Gotify");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gotify_config_default() {
        let config = GotifyConfig::default();
        assert_eq!(config.url, "http://localhost:80");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_gotify_client_requires_token() {
        let result = GotifyClient::new(GotifyConfig::default());
        assert!(result.unwrap_err().to_string().contains("token"));
    }

    #[test]
    fn test_gotify_client_rejects_bad_url() {
        let config = GotifyConfig {
            url: "not a url".to_string(),
            token: "abc".to_string(),
            ..Default::default()
        };
        assert!(GotifyClient::new(config).is_err());
    }

    #[test]
    fn test_message_url_joins_cleanly() {
        for url in ["http://gotify.local", "http://gotify.local/"] {
            let client = GotifyClient::new(GotifyConfig {
                url: url.to_string(),
                token: "abc".to_string(),
                ..Default::default()
            })
            .unwrap();
            assert_eq!(client.message_url(), "http://gotify.local/message");
        }
    }

    #[test]
    fn test_debug_hides_token() {
        let config = GotifyConfig {
            token: "someAppToken".to_string(),
            ..Default::default()
        };
        assert!(!format!("{:?}", config).contains("someAppToken"));
    }
}
