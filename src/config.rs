//! Runtime configuration
//!
//! Sources, lowest to highest precedence:
//! 1. JSON config file (`--config <path>`, or `~/.config/omada-to-gotify/config.json` if present)
//! 2. Environment variables (`GOTIFY_URL`, `GOTIFY_APP_TOKEN`, `OMADA_SHARED_SECRET`, `PORT`,
//!    `GOTIFY_TIMEOUT_SECS`, `MAX_BODY_BYTES`)
//!
//! The CLI's `--port` is applied on top by the caller.

use crate::notification::GotifyConfig;
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

pub const DEFAULT_PORT: u16 = 8080;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Omada payloads are a few hundred bytes; anything near this is not a webhook
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Config file contents; every key is optional
#[derive(Default, Deserialize)]
pub struct FileConfig {
    pub gotify_url: Option<String>,
    pub gotify_app_token: Option<String>,
    pub shared_secret: Option<String>,
    pub port: Option<u16>,
    pub timeout_secs: Option<u64>,
    pub max_body_bytes: Option<usize>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

/// Resolved configuration
#[derive(Clone)]
pub struct Config {
    pub gotify_url: String,
    pub gotify_app_token: String,
    pub shared_secret: String,
    pub port: u16,
    pub timeout_secs: u64,
    pub max_body_bytes: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("gotify_url", &self.gotify_url)
            .field("gotify_app_token", &"****")
            .field("shared_secret", &"****")
            .field("port", &self.port)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl Config {
    /// Load from the config file and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load with a custom environment lookup
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match path {
            Some(path) => FileConfig::read(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => {
                    debug!("Using config file {}", path.display());
                    FileConfig::read(&path)?
                }
                _ => FileConfig::default(),
            },
        };
        Self::from_sources(file, lookup)
    }

    /// Resolve from already-read file values and an environment lookup
    pub fn from_sources<F>(file: FileConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty environment values count as unset
        let env = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let gotify_url = env("GOTIFY_URL")
            .or(file.gotify_url)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow!("GOTIFY_URL environment variable is required"))?;
        validate_url(&gotify_url)?;

        let gotify_app_token = env("GOTIFY_APP_TOKEN")
            .or(file.gotify_app_token)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow!("GOTIFY_APP_TOKEN environment variable is required"))?;

        let shared_secret = env("OMADA_SHARED_SECRET")
            .or(file.shared_secret)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow!("OMADA_SHARED_SECRET environment variable is required"))?;

        let port = parse_env(&env, "PORT")?.or(file.port).unwrap_or(DEFAULT_PORT);
        let timeout_secs = parse_env(&env, "GOTIFY_TIMEOUT_SECS")?
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let max_body_bytes = parse_env(&env, "MAX_BODY_BYTES")?
            .or(file.max_body_bytes)
            .unwrap_or(DEFAULT_MAX_BODY_BYTES);

        Ok(Self {
            gotify_url,
            gotify_app_token,
            shared_secret,
            port,
            timeout_secs,
            max_body_bytes,
        })
    }

    /// `~/.config/omada-to-gotify/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/omada-to-gotify/config.json"))
    }

    pub fn gotify(&self) -> GotifyConfig {
        GotifyConfig {
            url: self.gotify_url.clone(),
            token: self.gotify_app_token.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

fn parse_env<T, F>(env: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    env(key)
        .map(|v| {
            v.trim()
                .parse::<T>()
                .with_context(|| format!("{} must be a number, got `{}`", key, v))
        })
        .transpose()
}

fn validate_url(url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url).with_context(|| format!("Invalid GOTIFY_URL `{}`", url))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => bail!("GOTIFY_URL must be http or https, got `{}`", scheme),
    }
}
