//! Configuration management for the Localify client.
//!
//! Values come from environment variables, optionally seeded from a `.env`
//! file in the local data directory. Every accessor falls back to a default
//! so the client works against the staging backend with no setup.
//!
//! The lookup order is:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Built-in defaults

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use crate::{session::SessionSettings, transport::HttpSettings};

pub const DEFAULT_API_URL: &str = "https://staging.localify.org";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REFRESH_MARGIN_SECS: i64 = 60;
const DEFAULT_REFRESH_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_REFRESH_BACKOFF_MS: u64 = 250;
const DEFAULT_HTTP_MAX_RETRIES: u32 = 2;

/// Returns the directory holding the `.env` file and the token cache.
///
/// - Linux: `~/.local/share/localify`
/// - macOS: `~/Library/Application Support/localify`
/// - Windows: `%LOCALAPPDATA%/localify`
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("localify");
    path
}

/// Loads environment variables from `localify/.env` in the local data
/// directory.
///
/// The directory is created if missing. A missing `.env` file is not an
/// error; a file that exists but cannot be parsed is.
///
/// # Example
///
/// ```
/// use localify::config;
///
/// #[tokio::main]
/// async fn main() {
///     if let Err(e) = config::load_env().await {
///         eprintln!("Configuration error: {}", e);
///     }
/// }
/// ```
pub async fn load_env() -> Result<(), String> {
    let dir = data_dir();
    async_fs::create_dir_all(&dir)
        .await
        .map_err(|e| e.to_string())?;

    let path = dir.join(".env");
    if !path.is_file() {
        return Ok(());
    }

    dotenv::from_path(&path).map_err(|e| e.to_string())
}

/// Base URL of the Localify API (`LOCALIFY_API_URL`).
pub fn api_url() -> String {
    env::var("LOCALIFY_API_URL")
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
}

/// Per-request timeout (`LOCALIFY_REQUEST_TIMEOUT_SECS`).
pub fn request_timeout() -> Duration {
    Duration::from_secs(parsed_or(
        "LOCALIFY_REQUEST_TIMEOUT_SECS",
        DEFAULT_REQUEST_TIMEOUT_SECS,
    ))
}

/// How long before expiry a credential is refreshed
/// (`LOCALIFY_REFRESH_MARGIN_SECS`).
pub fn refresh_margin() -> chrono::Duration {
    chrono::Duration::seconds(parsed_or(
        "LOCALIFY_REFRESH_MARGIN_SECS",
        DEFAULT_REFRESH_MARGIN_SECS,
    ))
}

/// Attempts made for one refresh before giving up on transport failures
/// (`LOCALIFY_REFRESH_MAX_ATTEMPTS`).
pub fn refresh_max_attempts() -> u32 {
    parsed_or("LOCALIFY_REFRESH_MAX_ATTEMPTS", DEFAULT_REFRESH_MAX_ATTEMPTS).max(1)
}

/// First backoff delay between refresh attempts, doubled after each failure
/// (`LOCALIFY_REFRESH_BACKOFF_MS`).
pub fn refresh_backoff() -> Duration {
    Duration::from_millis(parsed_or(
        "LOCALIFY_REFRESH_BACKOFF_MS",
        DEFAULT_REFRESH_BACKOFF_MS,
    ))
}

/// Retries on 429/502/503 responses for a single HTTP request
/// (`LOCALIFY_HTTP_MAX_RETRIES`).
pub fn http_max_retries() -> u32 {
    parsed_or("LOCALIFY_HTTP_MAX_RETRIES", DEFAULT_HTTP_MAX_RETRIES)
}

/// Session settings assembled from the environment.
pub fn session_settings() -> SessionSettings {
    SessionSettings {
        refresh_margin: refresh_margin(),
        max_refresh_attempts: refresh_max_attempts(),
        refresh_backoff: refresh_backoff(),
    }
}

/// HTTP transport settings assembled from the environment.
pub fn http_settings() -> HttpSettings {
    HttpSettings {
        base_url: api_url(),
        timeout: request_timeout(),
        max_retries: http_max_retries(),
    }
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparsable setting");
                default
            }
        },
        Err(_) => default,
    }
}
