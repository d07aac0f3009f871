//! omada-to-gotify - relay Omada controller webhook alerts to Gotify

pub mod config;
pub mod notification;
pub mod server;

pub use config::Config;
pub use notification::{
    parse, GotifyClient, GotifyConfig, MessageType, NormalizedMessage, Normalizer,
    NotificationChannel, NotificationMessage, ParseError, SendResult,
};
pub use server::WebhookServer;
