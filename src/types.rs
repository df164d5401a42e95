use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tabled::Tabled;

use crate::error::ValidationError;

/// The authentication artifact granting API access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_guest: bool,
}

impl Credential {
    /// A bare access token with no refresh token or known expiry.
    pub fn from_access_token(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
            is_guest: false,
        }
    }

    /// Builds a credential from a backend auth response received just now.
    pub fn from_auth_response(res: AuthResponse, is_guest: bool) -> Self {
        // a non-positive lifetime means already expired
        let expires_at = res
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs.max(0)));

        Self {
            access_token: res.token,
            refresh_token: res.refresh_token.filter(|t| !t.is_empty()),
            expires_at,
            is_guest,
        }
    }

    /// True when the credential expires within `margin` from now. A
    /// credential without a known expiry is never considered expiring.
    pub fn expires_within(&self, margin: Duration) -> bool {
        match self.expires_at {
            Some(at) => Utc::now() + margin >= at,
            None => false,
        }
    }

    /// The token sent to the refresh endpoint.
    pub fn refresh_material(&self) -> &str {
        self.refresh_token.as_deref().unwrap_or(&self.access_token)
    }
}

/// Auth payload returned by the guest, exchange and refresh endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeTokenRequest {
    pub token: String,
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotifyLinkRequest {
    pub code_challenge: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyLinkResponse {
    pub url: String,
}

/// Error body the backend sends alongside non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendErrorResponse {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Read-only snapshot of the signed-in identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub apple_id: Option<String>,
    pub spotify_id: Option<String>,
    pub account_creation_date: i64,
    pub profile_image: Option<String>,
    pub spotify_profile_image: Option<String>,
    pub anonymous_user: bool,
    pub email_connected: bool,
    pub apple_connected: bool,
    pub spotify_connected: bool,
    pub email_verified: bool,
    pub email_opt_in: bool,
    pub is_admin: bool,
    pub is_team_member: bool,
}

/// Which catalog a search result came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    #[default]
    Localify,
    Spotify,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistResult {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub spotify_id: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "clamped_popularity")]
    pub popularity: u8,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub source: ResultSource,
}

fn clamped_popularity<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    if raw.is_nan() {
        return Ok(0);
    }
    Ok(raw.round().clamp(0.0, 100.0) as u8)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResult {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub venue_id: String,
    #[serde(default)]
    pub venue_name: String,
    #[serde(default)]
    pub artists: Vec<ArtistResult>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueResult {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityResult {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResultSet {
    pub artists: Vec<ArtistResult>,
    pub events: Vec<EventResult>,
    pub venues: Vec<VenueResult>,
    pub cities: Vec<CityResult>,
    /// Set when the external catalog was consulted.
    pub external_searched: bool,
}

impl SearchResultSet {
    pub fn is_empty(&self) -> bool {
        self.artists.is_empty()
            && self.events.is_empty()
            && self.venues.is_empty()
            && self.cities.is_empty()
    }
}

/// Catalog a search is issued against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCatalog {
    Localify,
    Spotify,
}

/// Kinds of entity that can be favorited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum FavoriteCategory {
    Artist,
    Event,
    Venue,
}

impl FavoriteCategory {
    /// Integer code used across the binding boundary.
    pub fn code(self) -> i32 {
        match self {
            FavoriteCategory::Artist => 0,
            FavoriteCategory::Event => 1,
            FavoriteCategory::Venue => 2,
        }
    }

    /// Path segment of the favorites REST resources.
    pub fn path_segment(self) -> &'static str {
        match self {
            FavoriteCategory::Artist => "artists",
            FavoriteCategory::Event => "events",
            FavoriteCategory::Venue => "venues",
        }
    }
}

impl TryFrom<i32> for FavoriteCategory {
    type Error = ValidationError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(FavoriteCategory::Artist),
            1 => Ok(FavoriteCategory::Event),
            2 => Ok(FavoriteCategory::Venue),
            other => Err(ValidationError::InvalidCategory(other)),
        }
    }
}

impl fmt::Display for FavoriteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FavoriteCategory::Artist => "artist",
            FavoriteCategory::Event => "event",
            FavoriteCategory::Venue => "venue",
        })
    }
}

/// Identifies one favorite-able entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FavoriteKey {
    pub id: String,
    pub category: FavoriteCategory,
}

impl FavoriteKey {
    pub fn new(id: impl Into<String>, category: FavoriteCategory) -> Self {
        Self {
            id: id.into(),
            category,
        }
    }

    pub fn artist(id: impl Into<String>) -> Self {
        Self::new(id, FavoriteCategory::Artist)
    }

    pub fn event(id: impl Into<String>) -> Self {
        Self::new(id, FavoriteCategory::Event)
    }

    pub fn venue(id: impl Into<String>) -> Self {
        Self::new(id, FavoriteCategory::Venue)
    }
}

impl fmt::Display for FavoriteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.id)
    }
}

/// Entry of a favorites listing; only the id matters here.
#[derive(Debug, Clone, Deserialize)]
pub struct FavoriteItem {
    pub id: String,
}

#[derive(Tabled)]
pub struct ArtistTableRow {
    pub name: String,
    pub popularity: u8,
    pub genres: String,
    pub favorite: String,
    pub source: String,
}

#[derive(Tabled)]
pub struct SearchTableRow {
    pub kind: String,
    pub name: String,
    pub detail: String,
    pub favorite: String,
}
