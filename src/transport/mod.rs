//! # Transport
//!
//! The seam between the session core and the Localify backend. Everything
//! above this module talks to the [`Transport`] trait; [`HttpTransport`] is
//! the reqwest implementation, split by feature the same way the backend
//! groups its endpoints:
//!
//! ```text
//! AuthSessionManager / SearchGateway / FavoritesRegistry
//!          ↓
//!      Transport (trait)
//!          ↓
//!      HttpTransport
//!     ├── auth       POST /v1/auth/{guest,token,refresh,spotify/link}
//!     ├── user       GET  /v1/@me
//!     ├── search     GET  /v1/search, /v1/artists/search
//!     └── favorites  PUT|DELETE /v1/@me/{kind}/{id}/favorite
//!          ↓
//!      reqwest
//! ```
//!
//! ## Retries
//!
//! `502 Bad Gateway` and `503 Service Unavailable` are retried with a
//! doubling delay, `429 Too Many Requests` honors `Retry-After` up to two
//! minutes. Both are bounded by [`HttpSettings::max_retries`]; anything else
//! is mapped to a [`TransportError`] straight away.

mod auth;
mod favorites;
mod search;
mod user;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::sleep;

use crate::{
    config,
    error::TransportError,
    types::{
        ArtistResult, AuthResponse, BackendErrorResponse, FavoriteCategory, FavoriteKey,
        SearchCatalog, SearchResultSet, UserProfile,
    },
};

const MAX_RETRY_AFTER_SECS: u64 = 120;
const MAX_BACKOFF_MS: u64 = 30_000;

/// Performs the remote calls the session core needs.
///
/// Every call that acts on behalf of a user takes the access token
/// explicitly; implementations keep no credential state of their own.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn create_guest(&self) -> Result<AuthResponse, TransportError>;

    async fn exchange_token(
        &self,
        token: &str,
        secret: &str,
    ) -> Result<AuthResponse, TransportError>;

    async fn refresh(&self, token: &str) -> Result<AuthResponse, TransportError>;

    async fn fetch_user(&self, access_token: &str) -> Result<UserProfile, TransportError>;

    async fn search(
        &self,
        access_token: &str,
        text: &str,
        catalog: SearchCatalog,
    ) -> Result<SearchResultSet, TransportError>;

    async fn search_artists(
        &self,
        access_token: &str,
        text: &str,
        limit: usize,
    ) -> Result<Vec<ArtistResult>, TransportError>;

    /// Marks (`favorite == true`) or unmarks `key` as a favorite.
    async fn set_favorite(
        &self,
        access_token: &str,
        key: &FavoriteKey,
        favorite: bool,
    ) -> Result<(), TransportError>;

    /// Ids of every favorite in `category`.
    async fn fetch_favorites(
        &self,
        access_token: &str,
        category: FavoriteCategory,
    ) -> Result<Vec<String>, TransportError>;

    /// Spotify authorization URL bound to a PKCE code challenge.
    async fn spotify_link(
        &self,
        access_token: &str,
        code_challenge: &str,
    ) -> Result<String, TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            base_url: config::DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
        }
    }
}

/// reqwest-backed [`Transport`].
pub struct HttpTransport {
    client: Client,
    settings: HttpSettings,
}

impl HttpTransport {
    pub fn new(settings: HttpSettings) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(user_agent())
            .build()?;

        Ok(Self { client, settings })
    }

    /// Transport configured from the environment.
    pub fn from_env() -> Result<Self, TransportError> {
        Self::new(config::http_settings())
    }

    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// Sends `request`, retrying transient statuses, and returns the first
    /// successful response.
    async fn execute(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        let mut attempt: u32 = 0;

        loop {
            let Some(this_try) = request.try_clone() else {
                return Err(TransportError::Network(
                    "request cannot be cloned for sending".to_string(),
                ));
            };

            let response = this_try.send().await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if attempt < self.settings.max_retries {
                if let Some(delay) = retry_delay(&response, attempt) {
                    attempt += 1;
                    tracing::debug!(
                        status = status.as_u16(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        url = %response.url(),
                        "retrying request"
                    );
                    sleep(delay).await;
                    continue;
                }
            }

            return Err(status_error(response).await);
        }
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, TransportError> {
        let response = self.execute(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn create_guest(&self) -> Result<AuthResponse, TransportError> {
        self.post_guest().await
    }

    async fn exchange_token(
        &self,
        token: &str,
        secret: &str,
    ) -> Result<AuthResponse, TransportError> {
        self.post_token(token, secret).await
    }

    async fn refresh(&self, token: &str) -> Result<AuthResponse, TransportError> {
        self.post_refresh(token).await
    }

    async fn fetch_user(&self, access_token: &str) -> Result<UserProfile, TransportError> {
        self.get_me(access_token).await
    }

    async fn search(
        &self,
        access_token: &str,
        text: &str,
        catalog: SearchCatalog,
    ) -> Result<SearchResultSet, TransportError> {
        self.get_search(access_token, text, catalog).await
    }

    async fn search_artists(
        &self,
        access_token: &str,
        text: &str,
        limit: usize,
    ) -> Result<Vec<ArtistResult>, TransportError> {
        self.get_artist_search(access_token, text, limit).await
    }

    async fn set_favorite(
        &self,
        access_token: &str,
        key: &FavoriteKey,
        favorite: bool,
    ) -> Result<(), TransportError> {
        if favorite {
            self.put_favorite(access_token, key).await
        } else {
            self.delete_favorite(access_token, key).await
        }
    }

    async fn fetch_favorites(
        &self,
        access_token: &str,
        category: FavoriteCategory,
    ) -> Result<Vec<String>, TransportError> {
        self.get_favorites(access_token, category).await
    }

    async fn spotify_link(
        &self,
        access_token: &str,
        code_challenge: &str,
    ) -> Result<String, TransportError> {
        self.post_spotify_link(access_token, code_challenge).await
    }
}

pub fn user_agent() -> String {
    format!("Localify-Rust/{}", env!("CARGO_PKG_VERSION"))
}

/// Delay before retry number `attempt + 1` of a 502/503: 500ms doubled per
/// attempt, capped at 30s.
pub fn retry_backoff(attempt: u32) -> Duration {
    let backoff_ms = 2u64.saturating_pow(attempt).saturating_mul(500);
    Duration::from_millis(backoff_ms.min(MAX_BACKOFF_MS))
}

/// How long to wait before retrying `response`, or `None` if its status is
/// not worth retrying.
fn retry_delay(response: &Response, attempt: u32) -> Option<Duration> {
    match response.status() {
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => Some(retry_backoff(attempt)),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(1);
            if retry_after <= MAX_RETRY_AFTER_SECS {
                Some(Duration::from_secs(retry_after))
            } else {
                tracing::warn!(retry_after, "Retry-After too long, giving up");
                None
            }
        }
        _ => None,
    }
}

/// Maps a non-success response to a [`TransportError`], pulling the
/// backend's message out of the body when there is one.
async fn status_error(response: Response) -> TransportError {
    let status = response.status();
    let code = status.as_u16();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return TransportError::Unauthorized { status: code };
    }

    if status.is_server_error() {
        return TransportError::Server { status: code };
    }

    let body = response.text().await.unwrap_or_default();
    let parsed: BackendErrorResponse = serde_json::from_str(&body).unwrap_or_default();
    let message = parsed
        .message
        .or(parsed.error)
        .unwrap_or_else(|| body.trim().to_string());

    TransportError::Rejected {
        status: code,
        message,
    }
}
