//! Session lifecycle: guest bootstrap, token exchange, refresh and teardown.
//!
//! ```text
//! Unauthenticated ──► GuestPending ──► GuestActive ─┐
//!        │                                          ├──► RefreshPending ──► (same active state)
//!        └────────► ExchangePending ──► Authenticated ┘
//!
//! any state ──► Unauthenticated   on clear or rejected refresh
//! ```
//!
//! Refresh is single-flight. The first caller that needs a refresh installs
//! a broadcast sender under the session lock and spawns the network call;
//! every later caller subscribes to that sender instead of calling out. The
//! spawned task owns completion, so dropping any caller (the leader
//! included) never leaves the others waiting forever.

use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{sync::broadcast, time::sleep};

use crate::{
    error::{AuthError, Error, Result, StorageError, TransportError, ValidationError},
    management::TokenStore,
    transport::Transport,
    types::{AuthResponse, Credential, UserProfile},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    GuestPending,
    GuestActive,
    ExchangePending,
    Authenticated,
    RefreshPending,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Refresh once the credential is this close to expiry.
    pub refresh_margin: chrono::Duration,
    /// Refresh attempts before a transport failure is reported.
    pub max_refresh_attempts: u32,
    /// Delay after the first failed attempt; doubles each time.
    pub refresh_backoff: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            refresh_margin: chrono::Duration::seconds(60),
            max_refresh_attempts: 3,
            refresh_backoff: Duration::from_millis(250),
        }
    }
}

type RefreshOutcome = Result<Credential>;

struct SessionInner {
    state: SessionState,
    /// Bumped whenever the credential is replaced or cleared outside of a
    /// refresh; a refresh started under an older generation is discarded.
    generation: u64,
    in_flight: Option<broadcast::Sender<RefreshOutcome>>,
    profile: Option<Arc<UserProfile>>,
}

/// Owns session-lifecycle transitions on top of a [`TokenStore`].
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct AuthSessionManager {
    transport: Arc<dyn Transport>,
    store: Arc<TokenStore>,
    settings: SessionSettings,
    inner: Arc<Mutex<SessionInner>>,
    /// Serializes credential commits against clears.
    commit_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AuthSessionManager {
    /// Creates a manager whose initial state mirrors what `store` holds.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<TokenStore>,
        settings: SessionSettings,
    ) -> Self {
        let state = match store.get() {
            Some(credential) => active_state(&credential),
            None => SessionState::Unauthenticated,
        };

        Self {
            transport,
            store,
            settings,
            inner: Arc::new(Mutex::new(SessionInner {
                state,
                generation: 0,
                in_flight: None,
                profile: None,
            })),
            commit_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn token_store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    pub fn current_credential(&self) -> Option<Credential> {
        self.store.get()
    }

    /// Requests a guest identity. Needs no prior credential.
    pub async fn create_guest_user(&self) -> Result<Credential> {
        let pending = self.begin(SessionState::GuestPending);

        let res = match self.transport.create_guest().await {
            Ok(res) => res,
            Err(e) => {
                tracing::warn!(error = %e, "guest user creation failed");
                return Err(AuthError::GuestCreationFailed(e.to_string()).into());
            }
        };

        let credential = Credential::from_auth_response(res, true);
        self.commit(credential.clone()).await?;
        pending.finish(SessionState::GuestActive);

        tracing::info!("guest session established");
        Ok(credential)
    }

    /// Exchanges a third-party token and secret for a session credential.
    pub async fn exchange_token(&self, token: &str, secret: &str) -> Result<Credential> {
        if token.trim().is_empty() || secret.trim().is_empty() {
            return Err(ValidationError::EmptyCredentials.into());
        }

        let pending = self.begin(SessionState::ExchangePending);

        let res = match self.transport.exchange_token(token, secret).await {
            Ok(res) => res,
            Err(e) if e.is_rejection() => {
                tracing::warn!(error = %e, "token exchange rejected");
                return Err(AuthError::InvalidCredentials(e.to_string()).into());
            }
            Err(e) => {
                tracing::warn!(error = %e, "token exchange did not complete");
                return Err(AuthError::TransportFailure(e.to_string()).into());
            }
        };

        let credential = Credential::from_auth_response(res, false);
        self.commit(credential.clone()).await?;
        pending.finish(SessionState::Authenticated);

        tracing::info!("session established via token exchange");
        Ok(credential)
    }

    /// Returns a credential that is good for at least the refresh margin.
    ///
    /// With `force == false` and a credential that is not close to expiry
    /// this makes no network call. Otherwise a single refresh is issued, or
    /// joined if one is already in flight. A rejected refresh tears the
    /// session down.
    pub async fn refresh_auth(&self, force: bool) -> Result<Credential> {
        let mut outcome = {
            let mut inner = self.lock();

            let Some(current) = self.store.get() else {
                return Err(AuthError::NotAuthenticated.into());
            };

            match &inner.in_flight {
                Some(sender) => {
                    tracing::debug!("joining in-flight refresh");
                    sender.subscribe()
                }
                None => {
                    if !force && !current.expires_within(self.settings.refresh_margin) {
                        return Ok(current);
                    }

                    let (sender, receiver) = broadcast::channel(1);
                    inner.in_flight = Some(sender);
                    inner.state = SessionState::RefreshPending;

                    let session = self.clone();
                    let generation = inner.generation;
                    tokio::spawn(async move {
                        session.run_refresh(current, generation).await;
                    });

                    receiver
                }
            }
        };

        match outcome.recv().await {
            Ok(result) => result,
            Err(_) => Err(AuthError::TransportFailure(
                "refresh finished without reporting a result".to_string(),
            )
            .into()),
        }
    }

    /// Ends the session. Never fails; persistence problems are logged.
    pub async fn clear_auth(&self) {
        let _commit = self.commit_lock.lock().await;
        {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.state = SessionState::Unauthenticated;
            inner.profile = None;
        }

        if let Err(e) = self.store.clear().await {
            tracing::warn!(error = %e, "failed to remove persisted credential");
        }
        tracing::info!("session cleared");
    }

    /// Installs a bare access token as the current credential. A blank
    /// token clears the session instead.
    pub async fn set_auth_token(&self, token: &str) -> std::result::Result<(), StorageError> {
        let token = token.trim();
        if token.is_empty() {
            self.clear_auth().await;
            return Ok(());
        }

        let _commit = self.commit_lock.lock().await;
        self.store.set(Credential::from_access_token(token)).await?;

        let mut inner = self.lock();
        inner.generation += 1;
        inner.state = SessionState::Authenticated;
        inner.profile = None;
        Ok(())
    }

    pub fn get_auth_token(&self) -> Option<String> {
        self.store.get().map(|c| c.access_token)
    }

    /// Fetches a fresh profile snapshot for the signed-in user.
    pub async fn fetch_user_details(&self) -> Result<UserProfile> {
        let transport = Arc::clone(&self.transport);
        let profile = self
            .authorized(|token| {
                let transport = Arc::clone(&transport);
                async move { transport.fetch_user(&token).await }
            })
            .await?;

        self.lock().profile = Some(Arc::new(profile.clone()));
        Ok(profile)
    }

    /// The last profile fetched in this session, if any.
    pub fn last_profile(&self) -> Option<Arc<UserProfile>> {
        self.lock().profile.clone()
    }

    /// Asks the backend for a Spotify authorization URL bound to
    /// `code_challenge`.
    pub async fn link_spotify(&self, code_challenge: &str) -> Result<String> {
        let transport = Arc::clone(&self.transport);
        self.authorized(|token| {
            let transport = Arc::clone(&transport);
            async move { transport.spotify_link(&token, code_challenge).await }
        })
        .await
    }

    /// Runs `call` with a usable access token. If the backend answers
    /// `Unauthorized`, forces one refresh and retries once.
    pub async fn authorized<T, F, Fut>(&self, mut call: F) -> Result<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = std::result::Result<T, TransportError>>,
    {
        let credential = self.usable_credential().await?;

        match call(credential.access_token).await {
            Err(TransportError::Unauthorized { status }) => {
                tracing::debug!(status, "access token refused, forcing refresh");
                let refreshed = self
                    .refresh_auth(true)
                    .await
                    .map_err(not_authenticated_if_rejected)?;
                call(refreshed.access_token).await.map_err(Error::from)
            }
            other => other.map_err(Error::from),
        }
    }

    async fn usable_credential(&self) -> Result<Credential> {
        match self.refresh_auth(false).await {
            Ok(credential) => Ok(credential),
            // the refresh could not reach the backend; the old token may still work
            Err(Error::Auth(AuthError::TransportFailure(reason))) => match self.store.get() {
                Some(current) if !current.expires_within(chrono::Duration::zero()) => {
                    tracing::debug!(%reason, "refresh unavailable, using current token");
                    Ok(current)
                }
                _ => Err(AuthError::TransportFailure(reason).into()),
            },
            Err(e) => Err(not_authenticated_if_rejected(e)),
        }
    }

    async fn run_refresh(&self, current: Credential, generation: u64) {
        let outcome = match self.refresh_with_backoff(&current).await {
            Ok(res) => self.commit_refresh(res, &current, generation).await,
            Err(e) if e.is_rejection() => {
                tracing::warn!(error = %e, "refresh rejected, ending session");
                self.teardown_after_rejection(generation).await;
                Err(AuthError::RefreshRejected(e.to_string()).into())
            }
            Err(e) => {
                tracing::warn!(error = %e, "refresh failed, keeping current credential");
                Err(AuthError::TransportFailure(e.to_string()).into())
            }
        };

        let mut inner = self.lock();
        inner.state = match self.store.get() {
            Some(credential) => active_state(&credential),
            None => SessionState::Unauthenticated,
        };
        if let Some(sender) = inner.in_flight.take() {
            // no receivers left is fine
            let _ = sender.send(outcome);
        }
    }

    async fn refresh_with_backoff(
        &self,
        current: &Credential,
    ) -> std::result::Result<AuthResponse, TransportError> {
        let mut delay = self.settings.refresh_backoff;
        let mut attempt = 1;

        loop {
            match self.transport.refresh(current.refresh_material()).await {
                Ok(res) => return Ok(res),
                Err(e) if e.is_rejection() || attempt >= self.settings.max_refresh_attempts => {
                    return Err(e);
                }
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "refresh attempt failed, backing off");
                    sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
            }
        }
    }

    async fn commit_refresh(
        &self,
        res: AuthResponse,
        previous: &Credential,
        generation: u64,
    ) -> RefreshOutcome {
        let mut refreshed = Credential::from_auth_response(res, previous.is_guest);
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = previous.refresh_token.clone();
        }

        let _commit = self.commit_lock.lock().await;
        if self.lock().generation != generation {
            tracing::debug!("session changed during refresh, discarding result");
            // a login or manual token set during the refresh wins
            return self
                .store
                .get()
                .ok_or_else(|| AuthError::NotAuthenticated.into());
        }

        self.store.set(refreshed.clone()).await?;
        tracing::debug!(guest = refreshed.is_guest, "credential refreshed");
        Ok(refreshed)
    }

    async fn teardown_after_rejection(&self, generation: u64) {
        let _commit = self.commit_lock.lock().await;
        {
            let mut inner = self.lock();
            if inner.generation != generation {
                return;
            }
            inner.generation += 1;
            inner.profile = None;
        }

        if let Err(e) = self.store.clear().await {
            tracing::warn!(error = %e, "failed to remove persisted credential");
        }
    }

    /// Stores a credential from guest creation or exchange.
    async fn commit(&self, credential: Credential) -> std::result::Result<(), StorageError> {
        let _commit = self.commit_lock.lock().await;
        self.store.set(credential).await?;

        let mut inner = self.lock();
        inner.generation += 1;
        inner.profile = None;
        Ok(())
    }

    /// Moves into a pending state; the returned guard puts the previous
    /// state back unless finished.
    fn begin(&self, pending: SessionState) -> PendingTransition<'_> {
        let previous = std::mem::replace(&mut self.lock().state, pending);
        PendingTransition {
            session: self,
            previous,
            finished: false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct PendingTransition<'a> {
    session: &'a AuthSessionManager,
    previous: SessionState,
    finished: bool,
}

impl PendingTransition<'_> {
    fn finish(mut self, state: SessionState) {
        self.session.lock().state = state;
        self.finished = true;
    }
}

impl Drop for PendingTransition<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.session.lock().state = self.previous;
        }
    }
}

fn active_state(credential: &Credential) -> SessionState {
    if credential.is_guest {
        SessionState::GuestActive
    } else {
        SessionState::Authenticated
    }
}

fn not_authenticated_if_rejected(err: Error) -> Error {
    match err {
        Error::Auth(AuthError::RefreshRejected(_)) => AuthError::NotAuthenticated.into(),
        other => other,
    }
}
