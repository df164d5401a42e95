mod common;

use common::{MockTransport, registry_with};
use localify::{
    error::SyncError,
    types::{FavoriteCategory, FavoriteKey},
};

#[tokio::test]
async fn test_add_favorite_is_visible_immediately_and_after_sync() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport).await;
    let key = FavoriteKey::artist("42");

    registry.add_favorite(key.clone());
    assert!(registry.is_favorite(&key));

    registry.settled().await;
    assert!(registry.is_favorite(&key));
    assert_eq!(
        *transport.favorite_log.lock().unwrap(),
        vec![(key.clone(), true)]
    );
}

#[tokio::test]
async fn test_add_then_remove_ends_unfavorited() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport).await;
    let key = FavoriteKey::venue("7");

    registry.add_favorite(key.clone());
    registry.remove_favorite(key.clone());
    assert!(!registry.is_favorite(&key));

    registry.settled().await;
    assert!(!registry.is_favorite(&key));
    assert_eq!(
        *transport.favorite_log.lock().unwrap(),
        vec![(key.clone(), true), (key.clone(), false)]
    );
}

#[tokio::test]
async fn test_mutations_reach_backend_in_call_order() {
    let transport = MockTransport::new();
    let gate = transport.gate_favorites();
    let registry = registry_with(&transport).await;
    let key = FavoriteKey::event("e1");

    registry.add_favorite(key.clone());
    registry.remove_favorite(key.clone());
    registry.add_favorite(key.clone());
    assert_eq!(registry.pending_count(), 3);

    gate.add_permits(3);
    registry.settled().await;

    assert_eq!(registry.pending_count(), 0);
    assert!(registry.is_favorite(&key));
    assert_eq!(
        *transport.favorite_log.lock().unwrap(),
        vec![(key.clone(), true), (key.clone(), false), (key.clone(), true)]
    );
}

#[tokio::test]
async fn test_failed_add_rolls_back() {
    let transport = MockTransport::new();
    let gate = transport.gate_favorites();
    let registry = registry_with(&transport).await;
    let key = FavoriteKey::artist("99");
    transport.fail_favorite(key.clone(), true);
    let mut failures = registry.subscribe_failures();

    registry.add_favorite(key.clone());
    // optimistic while in flight
    assert!(registry.is_favorite(&key));

    gate.add_permits(1);
    registry.settled().await;

    assert!(!registry.is_favorite(&key));
    let failure = failures.recv().await.unwrap();
    assert!(matches!(
        failure,
        SyncError::FavoriteAddFailed { key: ref failed, .. } if *failed == key
    ));
}

#[tokio::test]
async fn test_failed_add_does_not_resurrect_after_remove() {
    let transport = MockTransport::new();
    let gate = transport.gate_favorites();
    let registry = registry_with(&transport).await;
    let key = FavoriteKey::artist("5");
    transport.fail_favorite(key.clone(), true);

    registry.add_favorite(key.clone());
    registry.remove_favorite(key.clone());

    gate.add_permits(2);
    registry.settled().await;

    assert!(!registry.is_favorite(&key));
}

#[tokio::test]
async fn test_failed_remove_restores_confirmed_favorite() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport).await;
    let key = FavoriteKey::artist("8");
    transport.fail_favorite(key.clone(), false);
    let mut failures = registry.subscribe_failures();

    registry.add_favorite(key.clone());
    registry.settled().await;
    registry.remove_favorite(key.clone());
    assert!(!registry.is_favorite(&key));
    registry.settled().await;

    assert!(registry.is_favorite(&key));
    assert!(matches!(
        failures.recv().await.unwrap(),
        SyncError::FavoriteRemoveFailed { .. }
    ));
}

#[tokio::test]
async fn test_keys_sync_independently() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport).await;
    let failing = FavoriteKey::artist("bad");
    let fine = FavoriteKey::artist("good");
    transport.fail_favorite(failing.clone(), true);

    registry.add_favorite(failing.clone());
    registry.add_favorite(fine.clone());
    registry.settled().await;

    assert!(!registry.is_favorite(&failing));
    assert!(registry.is_favorite(&fine));
}

#[tokio::test]
async fn test_cancel_pending_rolls_back_everything() {
    let transport = MockTransport::new();
    let _gate = transport.gate_favorites();
    let registry = registry_with(&transport).await;
    let first = FavoriteKey::artist("1");
    let second = FavoriteKey::venue("2");

    registry.add_favorite(first.clone());
    registry.add_favorite(second.clone());
    registry.remove_favorite(second.clone());
    assert_eq!(registry.pending_count(), 3);

    registry.cancel_pending();

    assert_eq!(registry.pending_count(), 0);
    assert!(!registry.is_favorite(&first));
    assert!(!registry.is_favorite(&second));
    assert_eq!(registry.known_state(&first), None);
    registry.settled().await;
    assert!(transport.favorite_log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_registry_usable_after_cancel() {
    let transport = MockTransport::new();
    let gate = transport.gate_favorites();
    let registry = registry_with(&transport).await;
    let key = FavoriteKey::artist("1");

    registry.add_favorite(key.clone());
    registry.cancel_pending();

    registry.add_favorite(key.clone());
    gate.add_permits(1);
    registry.settled().await;

    assert!(registry.is_favorite(&key));
    assert_eq!(
        *transport.favorite_log.lock().unwrap(),
        vec![(key.clone(), true)]
    );
}

#[tokio::test]
async fn test_unknown_key_is_not_favorite() {
    let transport = MockTransport::new();
    let registry = registry_with(&transport).await;
    let key = FavoriteKey::event("never-seen");

    assert!(!registry.is_favorite(&key));
    assert_eq!(registry.known_state(&key), None);
}

#[tokio::test]
async fn test_load_favorites_seeds_registry() {
    let transport = MockTransport::new();
    *transport.remote_favorites.lock().unwrap() = vec!["2".to_string(), "1".to_string()];
    let registry = registry_with(&transport).await;

    let count = registry.load_favorites(FavoriteCategory::Artist).await.unwrap();

    assert_eq!(count, 2);
    assert!(registry.is_favorite(&FavoriteKey::artist("1")));
    assert!(!registry.is_favorite(&FavoriteKey::venue("1")));
    assert_eq!(
        registry.favorites(FavoriteCategory::Artist),
        vec![FavoriteKey::artist("1"), FavoriteKey::artist("2")]
    );
}

#[tokio::test]
async fn test_load_favorites_keeps_pending_local_values() {
    let transport = MockTransport::new();
    *transport.remote_favorites.lock().unwrap() = vec!["1".to_string()];
    let gate = transport.gate_favorites();
    let registry = registry_with(&transport).await;
    let key = FavoriteKey::artist("1");

    registry.remove_favorite(key.clone());
    registry.load_favorites(FavoriteCategory::Artist).await.unwrap();
    assert!(!registry.is_favorite(&key));

    gate.add_permits(1);
    registry.settled().await;
    assert!(!registry.is_favorite(&key));
}

#[tokio::test]
async fn test_favorite_sync_retries_after_unauthorized() {
    let transport = MockTransport::new();
    transport.revoke("access");
    let registry = registry_with(&transport).await;
    let key = FavoriteKey::artist("3");

    registry.add_favorite(key.clone());
    registry.settled().await;

    assert!(registry.is_favorite(&key));
    assert_eq!(MockTransport::calls(&transport.refresh_calls), 1);
    assert_eq!(MockTransport::calls(&transport.favorite_calls), 2);
}

#[test]
fn test_category_codes() {
    assert_eq!(FavoriteCategory::try_from(0), Ok(FavoriteCategory::Artist));
    assert_eq!(FavoriteCategory::try_from(1), Ok(FavoriteCategory::Event));
    assert_eq!(FavoriteCategory::try_from(2), Ok(FavoriteCategory::Venue));
    assert!(FavoriteCategory::try_from(3).is_err());
    assert!(FavoriteCategory::try_from(-1).is_err());
    assert_eq!(FavoriteCategory::Venue.code(), 2);
    assert_eq!(FavoriteKey::event("x").to_string(), "event:x");
}
