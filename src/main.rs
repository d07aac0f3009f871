//! omada-to-gotify CLI
//!
//! Runs the webhook relay, or parses a single payload for inspection.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use omada_to_gotify::notification::{DryRunChannel, NotificationChannel};
use omada_to_gotify::{Config, GotifyClient, Normalizer, NotificationMessage, WebhookServer};
use serde::Serialize;
use std::io::Read;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "omada-to-gotify")]
#[command(about = "Relay Omada controller webhook alerts to a Gotify server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server (default)
    Serve {
        /// Listen port (overrides PORT)
        #[arg(long, short)]
        port: Option<u16>,
        /// JSON config file (default: ~/.config/omada-to-gotify/config.json)
        #[arg(long, short)]
        config: Option<PathBuf>,
        /// Log notifications instead of sending them to Gotify
        #[arg(long)]
        dry_run: bool,
    },
    /// Parse one webhook payload and print the resulting notification
    Parse {
        /// Payload file (reads stdin when omitted)
        file: Option<PathBuf>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct ParsedNotification<'a> {
    message_type: &'a str,
    timestamp_substituted: bool,
    #[serde(flatten)]
    notification: &'a NotificationMessage,
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity, e.g. RUST_LOG=debug omada-to-gotify
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("omada_to_gotify=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port, config, dry_run }) => serve(port, config, dry_run).await,
        Some(Commands::Parse { file, json }) => parse(file, json),
        None => serve(None, None, false).await,
    }
}

async fn serve(port: Option<u16>, config_path: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let mut config = Config::load(config_path.as_deref())?;
    if let Some(port) = port {
        config.port = port;
    }

    let channel: Arc<dyn NotificationChannel> = if dry_run {
        Arc::new(DryRunChannel)
    } else {
        Arc::new(GotifyClient::new(config.gotify())?)
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.port,
        "omada-to-gotify server starting"
    );

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
    WebhookServer::new(config.shared_secret.clone(), channel)
        .with_max_body_bytes(config.max_body_bytes)
        .serve(addr)
        .await
}

fn parse(file: Option<PathBuf>, json: bool) -> Result<()> {
    let body = match &file {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let message = Normalizer::new().parse(&body)?;
    let notification = NotificationMessage::from(&message);

    if json {
        let view = ParsedNotification {
            message_type: message.message_type().as_str(),
            timestamp_substituted: message.timestamp_substituted(),
            notification: &notification,
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("Type:     {}", message.message_type());
        println!("Priority: {}", notification.priority);
        println!("Date:     {}", notification.date.to_rfc3339());
        println!("Title:    {}", notification.title);
        println!();
        println!("{}", notification.message);
    }

    Ok(())
}
