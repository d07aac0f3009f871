//! Message type classification for Omada webhook payloads
//!
//! The type decides the Gotify priority of the relayed notification:
//! - TEST (0): the controller UI verifying the webhook, silent
//! - UNRECOGNISED (4): an alert we don't know, still notifies
//! - ONLINE (7): a WAN/device came back
//! - OFFLINE (10): a WAN/device went away

use regex::Regex;
use std::sync::OnceLock;

/// Kind of Omada message, as far as this relay recognises it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Unrecognised,
    Test,
    Offline,
    Online,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Unrecognised => "unrecognised",
            MessageType::Test => "test",
            MessageType::Offline => "offline",
            MessageType::Online => "online",
        }
    }

    /// Gotify priority for this type.
    ///
    /// See https://github.com/gotify/android/issues/18#issuecomment-437403888
    /// for how the Android client maps these to notification behaviour.
    pub fn priority(&self) -> i32 {
        match self {
            MessageType::Test => 0,
            MessageType::Unrecognised => 4,
            MessageType::Online => 7,
            MessageType::Offline => 10,
        }
    }
}

fn test_message_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)webhook test message[.!,;:]?\s*Please ignore").expect("valid regex")
    })
}

fn was_offline_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"The online detection result of \[.+\] was offline").expect("valid regex")
    })
}

fn was_online_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"The online detection result of \[.+\] was online").expect("valid regex")
    })
}

/// Classify a message from its description and text lines
///
/// A test ping in the description wins over anything in the text. Lines are
/// then scanned in order, each checked for offline before online, and the
/// first line that matches either decides.
pub fn classify<S: AsRef<str>>(description: &str, text: &[S]) -> MessageType {
    if test_message_re().is_match(description) {
        return MessageType::Test;
    }

    for line in text {
        let line = line.as_ref();
        if was_offline_re().is_match(line) {
            return MessageType::Offline;
        }
        if was_online_re().is_match(line) {
            return MessageType::Online;
        }
    }

    MessageType::Unrecognised
}
