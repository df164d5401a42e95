use tokio::sync::broadcast::error::TryRecvError;

use crate::{
    bridge::Bridge,
    error, info, success,
    types::{FavoriteCategory, FavoriteKey},
    warning,
};

pub async fn add_favorite(bridge: &Bridge, category: FavoriteCategory, id: &str) {
    change(bridge, FavoriteKey::new(id, category), true).await;
}

pub async fn remove_favorite(bridge: &Bridge, category: FavoriteCategory, id: &str) {
    change(bridge, FavoriteKey::new(id, category), false).await;
}

/// Loads and prints the favorites of `category`.
pub async fn list_favorites(bridge: &Bridge, category: FavoriteCategory) {
    let pb = super::spinner(format!("Loading favorite {}s...", category));
    let result = bridge.favorites().load_favorites(category).await;
    pb.finish_and_clear();

    if let Err(e) = result {
        error!("Cannot load favorites. Err: {}", e);
    }

    let keys = bridge.favorites().favorites(category);
    if keys.is_empty() {
        warning!("No favorite {}s yet", category);
        return;
    }

    info!("{} favorite {}s", keys.len(), category);
    for key in keys {
        println!("  {}", key.id);
    }
}

async fn change(bridge: &Bridge, key: FavoriteKey, favorite: bool) {
    if key.id.trim().is_empty() {
        error!("An id is required");
    }

    let registry = bridge.favorites();
    let mut failures = registry.subscribe_failures();
    if favorite {
        registry.add_favorite(key.clone());
    } else {
        registry.remove_favorite(key.clone());
    }

    // the process exits right after, so wait for the backend
    let pb = super::spinner(format!("Syncing {}...", key));
    registry.settled().await;
    pb.finish_and_clear();

    match failures.try_recv() {
        Ok(failure) => error!("{}", failure),
        Err(TryRecvError::Lagged(_)) => error!("Favorite sync failed"),
        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => {}
    }

    if favorite {
        success!("Added {} to favorites", key);
    } else {
        success!("Removed {} from favorites", key);
    }
}
