//! String-typed boundary adapter.
//!
//! A binding layer (JNI, FFI, the CLI) holds one [`Bridge`] and calls the
//! operations below. Everything structured crosses as JSON; failures come
//! back as `{"error": "<kind>", "message": "<text>"}`. Typed values stay on
//! the core side of this module.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::{
    config,
    error::{Error, SyncError, ValidationError},
    management::{FavoritesRegistry, FileTokenPersistence, TokenStore},
    search::SearchGateway,
    session::{AuthSessionManager, SessionSettings},
    transport::{HttpTransport, Transport},
    types::{FavoriteCategory, FavoriteKey},
};

/// One session context: token store, session manager, search and
/// favorites wired together.
pub struct Bridge {
    session: AuthSessionManager,
    search: SearchGateway,
    favorites: FavoritesRegistry,
    sync_failures: Mutex<broadcast::Receiver<SyncError>>,
}

impl Bridge {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<TokenStore>,
        settings: SessionSettings,
    ) -> Self {
        let session = AuthSessionManager::new(transport, store, settings);
        let favorites = FavoritesRegistry::new(session.clone());
        let search = SearchGateway::new(session.clone(), favorites.clone());
        let sync_failures = Mutex::new(favorites.subscribe_failures());

        Self {
            session,
            search,
            favorites,
            sync_failures,
        }
    }

    /// HTTP transport and on-disk token cache configured from the
    /// environment, resuming any persisted session.
    pub async fn from_env() -> Result<Self, Error> {
        let transport = HttpTransport::from_env()?;
        let store = TokenStore::load(Arc::new(FileTokenPersistence::default_location())).await?;

        Ok(Self::new(
            Arc::new(transport),
            Arc::new(store),
            config::session_settings(),
        ))
    }

    pub fn session(&self) -> &AuthSessionManager {
        &self.session
    }

    pub fn search(&self) -> &SearchGateway {
        &self.search
    }

    pub fn favorites(&self) -> &FavoritesRegistry {
        &self.favorites
    }

    pub async fn create_guest_user(&self) -> String {
        respond(self.session.create_guest_user().await)
    }

    pub async fn exchange_token(&self, token: &str, secret: &str) -> String {
        respond(self.session.exchange_token(token, secret).await)
    }

    pub async fn refresh_auth(&self, force: bool) -> String {
        respond(self.session.refresh_auth(force).await)
    }

    pub async fn fetch_user_details(&self) -> String {
        respond(self.session.fetch_user_details().await)
    }

    pub async fn set_auth_token(&self, token: &str) -> Result<(), String> {
        self.session
            .set_auth_token(token)
            .await
            .map_err(|e| error_json(&Error::from(e)))
    }

    /// The current access token, or an empty string when signed out.
    pub fn get_auth_token(&self) -> String {
        self.session.get_auth_token().unwrap_or_default()
    }

    pub async fn clear_auth(&self) {
        self.session.clear_auth().await;
    }

    pub async fn fetch_search(&self, text: &str, auto_search_external: bool) -> String {
        respond(self.search.search(text, auto_search_external).await)
    }

    pub async fn fetch_search_artists(&self, text: &str, limit: i32) -> String {
        let limit = match usize::try_from(limit) {
            Ok(limit) => limit,
            Err(_) => {
                let invalid = ValidationError::InvalidLimit(i64::from(limit));
                return error_json(&Error::from(invalid));
            }
        };
        respond(self.search.search_artists(text, limit).await)
    }

    /// Category codes: 0 = artist, 1 = event, 2 = venue. Sync failures are
    /// reported later through [`Bridge::take_sync_failures`].
    pub fn add_favorite(&self, id: &str, category: i32) -> Result<(), String> {
        let key = favorite_key(id, category)?;
        self.favorites.add_favorite(key);
        Ok(())
    }

    pub fn remove_favorite(&self, id: &str, category: i32) -> Result<(), String> {
        let key = favorite_key(id, category)?;
        self.favorites.remove_favorite(key);
        Ok(())
    }

    /// Drains the sync failures reported since the last call, as a JSON
    /// array of error objects.
    pub fn take_sync_failures(&self) -> String {
        let mut receiver = self
            .sync_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut failures = Vec::new();
        loop {
            match receiver.try_recv() {
                Ok(failure) => failures.push(error_value(&Error::from(failure))),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "sync failure reports were dropped");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        serde_json::Value::Array(failures).to_string()
    }

    pub fn get_version(&self) -> String {
        crate::version()
    }
}

fn favorite_key(id: &str, category: i32) -> Result<FavoriteKey, String> {
    FavoriteCategory::try_from(category)
        .map(|category| FavoriteKey::new(id, category))
        .map_err(|e| error_json(&Error::from(e)))
}

fn respond<T: Serialize>(result: Result<T, Error>) -> String {
    match result {
        Ok(value) => match serde_json::to_string(&value) {
            Ok(json) => json,
            Err(e) => {
                json!({ "error": "SerializationError", "message": e.to_string() }).to_string()
            }
        },
        Err(e) => error_json(&e),
    }
}

fn error_value(err: &Error) -> serde_json::Value {
    json!({ "error": err.kind(), "message": err.to_string() })
}

fn error_json(err: &Error) -> String {
    error_value(err).to_string()
}
