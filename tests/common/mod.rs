#![allow(dead_code)]

use std::{
    collections::{HashSet, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::Semaphore, time::sleep};

use localify::{
    error::TransportError,
    management::{FavoritesRegistry, TokenStore},
    session::{AuthSessionManager, SessionSettings},
    types::{
        ArtistResult, AuthResponse, Credential, FavoriteCategory, FavoriteKey, ResultSource,
        SearchCatalog, SearchResultSet, UserProfile,
    },
    transport::Transport,
};

/// Scriptable in-process backend counting every call it receives.
#[derive(Default)]
pub struct MockTransport {
    pub guest_calls: AtomicUsize,
    pub exchange_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub user_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub artist_search_calls: AtomicUsize,
    pub favorite_calls: AtomicUsize,

    pub guest_error: Mutex<Option<TransportError>>,
    pub exchange_error: Mutex<Option<TransportError>>,
    /// Consumed front to back; once empty, refreshes succeed.
    pub refresh_script: Mutex<VecDeque<Result<AuthResponse, TransportError>>>,
    pub refresh_delay: Mutex<Duration>,
    pub refresh_tokens_seen: Mutex<Vec<String>>,

    /// Access tokens answered with `Unauthorized`.
    pub revoked_tokens: Mutex<HashSet<String>>,
    pub tokens_seen: Mutex<Vec<String>>,

    pub profile: Mutex<UserProfile>,
    pub local_results: Mutex<SearchResultSet>,
    pub spotify_results: Mutex<SearchResultSet>,
    pub artist_results: Mutex<Vec<ArtistResult>>,

    /// Keys whose favorite mutations fail, with the direction that fails.
    pub failing_favorites: Mutex<HashSet<(FavoriteKey, bool)>>,
    /// When set, every favorite mutation waits for a permit.
    pub favorite_gate: Mutex<Option<Arc<Semaphore>>>,
    pub favorite_log: Mutex<Vec<(FavoriteKey, bool)>>,
    pub remote_favorites: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Holds back favorite mutations until permits are added.
    pub fn gate_favorites(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.favorite_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn fail_favorite(&self, key: FavoriteKey, favorite: bool) {
        self.failing_favorites
            .lock()
            .unwrap()
            .insert((key, favorite));
    }

    pub fn revoke(&self, token: &str) {
        self.revoked_tokens.lock().unwrap().insert(token.to_string());
    }

    pub fn script_refresh(&self, outcome: Result<AuthResponse, TransportError>) {
        self.refresh_script.lock().unwrap().push_back(outcome);
    }

    fn check_token(&self, token: &str) -> Result<(), TransportError> {
        self.tokens_seen.lock().unwrap().push(token.to_string());
        if self.revoked_tokens.lock().unwrap().contains(token) {
            return Err(TransportError::Unauthorized { status: 401 });
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn create_guest(&self) -> Result<AuthResponse, TransportError> {
        self.guest_calls.fetch_add(1, Ordering::SeqCst);
        let error = self.guest_error.lock().unwrap().clone();
        match error {
            Some(e) => Err(e),
            None => Ok(auth_response("guest-token", Some("guest-refresh"), Some(3600))),
        }
    }

    async fn exchange_token(
        &self,
        token: &str,
        _secret: &str,
    ) -> Result<AuthResponse, TransportError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        let error = self.exchange_error.lock().unwrap().clone();
        match error {
            Some(e) => Err(e),
            None => Ok(auth_response(
                &format!("user-{}", token),
                Some("user-refresh"),
                Some(3600),
            )),
        }
    }

    async fn refresh(&self, token: &str) -> Result<AuthResponse, TransportError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.refresh_tokens_seen
            .lock()
            .unwrap()
            .push(token.to_string());

        let delay = *self.refresh_delay.lock().unwrap();
        if !delay.is_zero() {
            sleep(delay).await;
        }

        let scripted = self.refresh_script.lock().unwrap().pop_front();
        match scripted {
            Some(outcome) => outcome,
            None => Ok(auth_response(&format!("refreshed-{}", n), None, Some(3600))),
        }
    }

    async fn fetch_user(&self, access_token: &str) -> Result<UserProfile, TransportError> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        self.check_token(access_token)?;
        Ok(self.profile.lock().unwrap().clone())
    }

    async fn search(
        &self,
        access_token: &str,
        _text: &str,
        catalog: SearchCatalog,
    ) -> Result<SearchResultSet, TransportError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check_token(access_token)?;
        let results = match catalog {
            SearchCatalog::Localify => self.local_results.lock().unwrap().clone(),
            SearchCatalog::Spotify => self.spotify_results.lock().unwrap().clone(),
        };
        Ok(results)
    }

    async fn search_artists(
        &self,
        access_token: &str,
        _text: &str,
        _limit: usize,
    ) -> Result<Vec<ArtistResult>, TransportError> {
        self.artist_search_calls.fetch_add(1, Ordering::SeqCst);
        self.check_token(access_token)?;
        // ignores the limit like a sloppy backend would
        Ok(self.artist_results.lock().unwrap().clone())
    }

    async fn set_favorite(
        &self,
        access_token: &str,
        key: &FavoriteKey,
        favorite: bool,
    ) -> Result<(), TransportError> {
        self.favorite_calls.fetch_add(1, Ordering::SeqCst);
        self.check_token(access_token)?;

        let gate = self.favorite_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        self.favorite_log
            .lock()
            .unwrap()
            .push((key.clone(), favorite));

        let failing = self
            .failing_favorites
            .lock()
            .unwrap()
            .contains(&(key.clone(), favorite));
        if failing {
            return Err(TransportError::Server { status: 500 });
        }
        Ok(())
    }

    async fn fetch_favorites(
        &self,
        access_token: &str,
        _category: FavoriteCategory,
    ) -> Result<Vec<String>, TransportError> {
        self.check_token(access_token)?;
        Ok(self.remote_favorites.lock().unwrap().clone())
    }

    async fn spotify_link(
        &self,
        access_token: &str,
        code_challenge: &str,
    ) -> Result<String, TransportError> {
        self.check_token(access_token)?;
        Ok(format!(
            "https://accounts.spotify.com/authorize?code_challenge={}",
            code_challenge
        ))
    }
}

pub fn auth_response(token: &str, refresh: Option<&str>, expires_in: Option<i64>) -> AuthResponse {
    AuthResponse {
        token: token.to_string(),
        refresh_token: refresh.map(str::to_string),
        expires_in,
    }
}

/// Credential expiring `expires_in_secs` from now.
pub fn credential(token: &str, expires_in_secs: i64) -> Credential {
    Credential::from_auth_response(
        auth_response(token, Some("refresh-token"), Some(expires_in_secs)),
        false,
    )
}

pub fn fast_settings() -> SessionSettings {
    SessionSettings {
        refresh_backoff: Duration::from_millis(1),
        ..SessionSettings::default()
    }
}

pub async fn session_with(
    transport: &Arc<MockTransport>,
    current: Option<Credential>,
) -> AuthSessionManager {
    let store = TokenStore::in_memory();
    if let Some(credential) = current {
        store.set(credential).await.unwrap();
    }
    let transport: Arc<dyn Transport> = transport.clone();
    AuthSessionManager::new(transport, Arc::new(store), fast_settings())
}

/// Session holding a long-lived credential plus a registry on top of it.
pub async fn registry_with(transport: &Arc<MockTransport>) -> FavoritesRegistry {
    let session = session_with(transport, Some(credential("access", 3600))).await;
    FavoritesRegistry::new(session)
}

pub fn artist(id: &str, spotify_id: Option<&str>, is_favorite: bool) -> ArtistResult {
    ArtistResult {
        id: id.to_string(),
        name: format!("Artist {}", id),
        image_url: None,
        spotify_id: spotify_id.map(str::to_string),
        genres: vec!["indie".to_string()],
        popularity: 50,
        is_favorite,
        source: ResultSource::Localify,
    }
}
