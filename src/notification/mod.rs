//! Notification pipeline: Omada payload in, Gotify message out
//!
//! # Flow
//! 1. `omada::Normalizer` redacts, parses and classifies the webhook body
//! 2. `channel::NotificationMessage` is built from the normalized message
//! 3. a `NotificationChannel` (`GotifyClient`, or `DryRunChannel`) delivers it
//!
//! # Example
//! ```ignore
//! use omada_to_gotify::notification::{Normalizer, NotificationMessage};
//!
//! let msg = Normalizer::new().parse(body)?;
//! let notification = NotificationMessage::from(&msg);
//! client.send(&notification).await?;
//! ```

pub mod channel;
pub mod gotify;
pub mod message_type;
pub mod omada;
pub mod redact;
pub mod sink;

pub use channel::{DryRunChannel, NotificationChannel, NotificationMessage, SendResult};
pub use gotify::{GotifyClient, GotifyConfig};
pub use message_type::{classify, MessageType};
pub use omada::{human_readable_timestamp, parse, NormalizedMessage, Normalizer, ParseError, RawPayload};
pub use redact::redact_payload;
pub use sink::{DiagnosticSink, Level, MemorySink, TracingSink};
