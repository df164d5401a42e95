//! Optimistic favorites: local state changes at once and each key's
//! mutations sync to the backend in call order, rolling back on failure.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::{
    sync::{broadcast, watch},
    task::AbortHandle,
};

use crate::{
    error::{Result, SyncError},
    session::AuthSessionManager,
    types::{FavoriteCategory, FavoriteKey},
};

const FAILURE_CHANNEL_CAPACITY: usize = 64;

/// Optimistic local overlay of the user's favorites.
///
/// Mutations change the local value at once and are pushed to the backend
/// by a per-key worker task that drains that key's queue in order. Keys
/// never block each other. When a key's queue runs dry, its local value is
/// reset to the last value the backend confirmed, which undoes any failed
/// mutation without resurrecting it after a later one.
///
/// Methods that mutate spawn tasks and must run inside a tokio runtime.
#[derive(Clone)]
pub struct FavoritesRegistry {
    session: AuthSessionManager,
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<RegistryState>,
    failures: broadcast::Sender<SyncError>,
    /// Mutations queued or in flight across all keys.
    pending: watch::Sender<usize>,
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<FavoriteKey, Entry>,
    /// Bumped by `cancel_pending`; workers from an older epoch stand down.
    epoch: u64,
}

#[derive(Default)]
struct Entry {
    local: bool,
    confirmed: bool,
    queue: VecDeque<bool>,
    worker: Option<AbortHandle>,
}

impl Entry {
    fn is_idle_and_absent(&self) -> bool {
        !self.local && !self.confirmed && self.queue.is_empty()
    }
}

impl FavoritesRegistry {
    pub fn new(session: AuthSessionManager) -> Self {
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        let (pending, _) = watch::channel(0);

        Self {
            session,
            shared: Arc::new(Shared {
                state: Mutex::new(RegistryState::default()),
                failures,
                pending,
            }),
        }
    }

    pub fn add_favorite(&self, key: FavoriteKey) {
        self.enqueue(key, true);
    }

    pub fn remove_favorite(&self, key: FavoriteKey) {
        self.enqueue(key, false);
    }

    /// Local lookup; never touches the network.
    pub fn is_favorite(&self, key: &FavoriteKey) -> bool {
        self.state().entries.get(key).is_some_and(|e| e.local)
    }

    /// The local value if this registry has ever seen `key`.
    pub fn known_state(&self, key: &FavoriteKey) -> Option<bool> {
        self.state().entries.get(key).map(|e| e.local)
    }

    /// Locally favorited keys of `category`, sorted by id.
    pub fn favorites(&self, category: FavoriteCategory) -> Vec<FavoriteKey> {
        let mut keys: Vec<FavoriteKey> = self
            .state()
            .entries
            .iter()
            .filter(|(key, entry)| key.category == category && entry.local)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Receives every background mutation failure from now on.
    pub fn subscribe_failures(&self) -> broadcast::Receiver<SyncError> {
        self.shared.failures.subscribe()
    }

    pub fn pending_count(&self) -> usize {
        *self.shared.pending.borrow()
    }

    /// Waits until no mutation is queued or in flight.
    pub async fn settled(&self) {
        let mut pending = self.shared.pending.subscribe();
        // the sender lives in `self`, so the channel cannot close here
        let _ = pending.wait_for(|count| *count == 0).await;
    }

    /// Stops all workers, drops queued mutations and rolls every key back
    /// to its confirmed value. A request already sent may still land on the
    /// backend.
    pub fn cancel_pending(&self) {
        let mut dropped = 0;
        {
            let mut state = self.state();
            state.epoch += 1;
            for entry in state.entries.values_mut() {
                if let Some(worker) = entry.worker.take() {
                    worker.abort();
                }
                dropped += entry.queue.len();
                entry.queue.clear();
                entry.local = entry.confirmed;
            }
            state.entries.retain(|_, entry| !entry.is_idle_and_absent());
        }

        if dropped > 0 {
            tracing::info!(dropped, "cancelled pending favorite mutations");
        }
        self.shared
            .pending
            .send_modify(|count| *count = count.saturating_sub(dropped));
    }

    /// Replaces what is known about `category` with the backend's list.
    /// Keys with mutations still pending keep their local value.
    pub async fn load_favorites(&self, category: FavoriteCategory) -> Result<usize> {
        let transport = Arc::clone(self.session.transport());
        let ids = self
            .session
            .authorized(|token| {
                let transport = Arc::clone(&transport);
                async move { transport.fetch_favorites(&token, category).await }
            })
            .await?;

        let remote: HashSet<String> = ids.into_iter().collect();
        let mut state = self.state();
        let entries = &mut state.entries;

        for (key, entry) in entries.iter_mut().filter(|(k, _)| k.category == category) {
            entry.confirmed = remote.contains(&key.id);
            if entry.queue.is_empty() {
                entry.local = entry.confirmed;
            }
        }
        for id in &remote {
            entries
                .entry(FavoriteKey::new(id.clone(), category))
                .or_insert_with(|| Entry {
                    local: true,
                    confirmed: true,
                    ..Entry::default()
                });
        }
        entries.retain(|_, entry| !entry.is_idle_and_absent());

        tracing::debug!(%category, count = remote.len(), "favorites loaded");
        Ok(remote.len())
    }

    fn enqueue(&self, key: FavoriteKey, favorite: bool) {
        let mut state = self.state();
        let epoch = state.epoch;
        let entry = state.entries.entry(key.clone()).or_default();
        entry.local = favorite;
        entry.queue.push_back(favorite);
        self.shared.pending.send_modify(|count| *count += 1);

        if entry.worker.is_none() {
            let registry = self.clone();
            let worker = tokio::spawn(async move { registry.drain(key, epoch).await });
            entry.worker = Some(worker.abort_handle());
        }
    }

    /// Pushes `key`'s queued mutations to the backend, oldest first.
    async fn drain(&self, key: FavoriteKey, epoch: u64) {
        loop {
            let favorite = {
                let state = self.state();
                if state.epoch != epoch {
                    return;
                }
                match state.entries.get(&key).and_then(|e| e.queue.front().copied()) {
                    Some(favorite) => favorite,
                    None => return,
                }
            };

            let result = self.push_remote(&key, favorite).await;

            let mut state = self.state();
            if state.epoch != epoch {
                return;
            }
            let entries = &mut state.entries;
            let Some(entry) = entries.get_mut(&key) else {
                return;
            };
            entry.queue.pop_front();

            match result {
                Ok(()) => entry.confirmed = favorite,
                Err(e) => {
                    tracing::warn!(%key, favorite, error = %e, "favorite sync failed");
                    let reason = e.to_string();
                    let failure = if favorite {
                        SyncError::FavoriteAddFailed {
                            key: key.clone(),
                            reason,
                        }
                    } else {
                        SyncError::FavoriteRemoveFailed {
                            key: key.clone(),
                            reason,
                        }
                    };
                    // nobody listening is fine
                    let _ = self.shared.failures.send(failure);
                }
            }

            let done = entry.queue.is_empty();
            if done {
                if entry.local != entry.confirmed {
                    tracing::debug!(%key, restored = entry.confirmed, "rolling back favorite");
                }
                entry.local = entry.confirmed;
                entry.worker = None;
                if entry.is_idle_and_absent() {
                    entries.remove(&key);
                }
            }
            self.shared
                .pending
                .send_modify(|count| *count = count.saturating_sub(1));

            if done {
                return;
            }
        }
    }

    async fn push_remote(&self, key: &FavoriteKey, favorite: bool) -> Result<()> {
        let transport = Arc::clone(self.session.transport());
        self.session
            .authorized(|token| {
                let transport = Arc::clone(&transport);
                async move { transport.set_favorite(&token, key, favorite).await }
            })
            .await
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
