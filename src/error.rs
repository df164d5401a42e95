//! Error taxonomy for the Localify client.
//!
//! Each concern gets its own enum so callers can match on the exact failure
//! kind; [`Error`] wraps them for operations that can fail in more than one
//! way. Errors are `Clone` because a single refresh result is fanned out to
//! every caller waiting on it.

use crate::types::FavoriteKey;

/// Authentication and session failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("guest user creation failed: {0}")]
    GuestCreationFailed(String),

    #[error("token exchange rejected: {0}")]
    InvalidCredentials(String),

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("refresh rejected: {0}")]
    RefreshRejected(String),

    #[error("not authenticated")]
    NotAuthenticated,
}

/// Input rejected before any network attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("search query is empty")]
    EmptyQuery,

    #[error("limit must be a positive integer, got {0}")]
    InvalidLimit(i64),

    #[error("token and secret must not be empty")]
    EmptyCredentials,

    #[error("unknown favorite category code {0}")]
    InvalidCategory(i32),
}

/// Token persistence failures. The in-memory credential is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("token storage I/O failed: {0}")]
    Io(String),

    #[error("token storage encoding failed: {0}")]
    Serde(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serde(err.to_string())
    }
}

/// Background favorite mutation failures, delivered on the registry's
/// failure channel after the local change has been rolled back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("failed to add favorite {key}: {reason}")]
    FavoriteAddFailed { key: FavoriteKey, reason: String },

    #[error("failed to remove favorite {key}: {reason}")]
    FavoriteRemoveFailed { key: FavoriteKey, reason: String },
}

/// What went wrong talking to the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("unauthorized ({status})")]
    Unauthorized { status: u16 },

    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("server error ({status})")]
    Server { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Whether the backend actually answered and said no, as opposed to the
    /// request never completing. Timeouts (408) and rate limiting (429) are
    /// transient and do not count.
    pub fn is_rejection(&self) -> bool {
        match self {
            TransportError::Unauthorized { .. } => true,
            TransportError::Rejected { status, .. } => !matches!(status, 408 | 429),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Crate-wide error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    /// Stable machine-readable name used when the error crosses the bridge.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Auth(AuthError::GuestCreationFailed(_)) => "AuthError.GuestCreationFailed",
            Error::Auth(AuthError::InvalidCredentials(_)) => "AuthError.InvalidCredentials",
            Error::Auth(AuthError::TransportFailure(_)) => "AuthError.TransportFailure",
            Error::Auth(AuthError::RefreshRejected(_)) => "AuthError.RefreshRejected",
            Error::Auth(AuthError::NotAuthenticated) => "AuthError.NotAuthenticated",
            Error::Validation(ValidationError::EmptyQuery) => "ValidationError.EmptyQuery",
            Error::Validation(ValidationError::InvalidLimit(_)) => "ValidationError.InvalidLimit",
            Error::Validation(ValidationError::EmptyCredentials) => {
                "ValidationError.EmptyCredentials"
            }
            Error::Validation(ValidationError::InvalidCategory(_)) => {
                "ValidationError.InvalidCategory"
            }
            Error::Storage(_) => "StorageError",
            Error::Sync(SyncError::FavoriteAddFailed { .. }) => "SyncError.FavoriteAddFailed",
            Error::Sync(SyncError::FavoriteRemoveFailed { .. }) => {
                "SyncError.FavoriteRemoveFailed"
            }
            Error::Transport(_) => "TransportError",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
