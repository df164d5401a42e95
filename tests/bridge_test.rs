mod common;

use std::sync::Arc;

use common::{MockTransport, artist, credential, fast_settings};
use localify::{bridge::Bridge, error::TransportError, management::TokenStore};
use serde_json::Value;

async fn bridge(transport: &Arc<MockTransport>, signed_in: bool) -> Bridge {
    let store = TokenStore::in_memory();
    if signed_in {
        store.set(credential("access", 3600)).await.unwrap();
    }
    Bridge::new(transport.clone(), Arc::new(store), fast_settings())
}

fn parse(json: &str) -> Value {
    serde_json::from_str(json).unwrap()
}

#[tokio::test]
async fn test_create_guest_user_returns_credential_json() {
    let transport = MockTransport::new();
    let bridge = bridge(&transport, false).await;

    let value = parse(&bridge.create_guest_user().await);

    assert_eq!(value["accessToken"], "guest-token");
    assert_eq!(value["refreshToken"], "guest-refresh");
    assert_eq!(value["isGuest"], true);
    assert!(value["expiresAt"].is_string());
    assert_eq!(bridge.get_auth_token(), "guest-token");
}

#[tokio::test]
async fn test_errors_are_serialized_with_kind() {
    let transport = MockTransport::new();
    *transport.guest_error.lock().unwrap() = Some(TransportError::Server { status: 500 });
    let bridge = bridge(&transport, false).await;

    let value = parse(&bridge.create_guest_user().await);

    assert_eq!(value["error"], "AuthError.GuestCreationFailed");
    assert!(value["message"].as_str().unwrap().contains("500"));
}

#[tokio::test]
async fn test_fetch_user_details_without_session() {
    let transport = MockTransport::new();
    let bridge = bridge(&transport, false).await;

    let value = parse(&bridge.fetch_user_details().await);

    assert_eq!(value["error"], "AuthError.NotAuthenticated");
}

#[tokio::test]
async fn test_exchange_token_validation_error() {
    let transport = MockTransport::new();
    let bridge = bridge(&transport, false).await;

    let value = parse(&bridge.exchange_token("", "secret").await);

    assert_eq!(value["error"], "ValidationError.EmptyCredentials");
}

#[tokio::test]
async fn test_refresh_auth_returns_credential() {
    let transport = MockTransport::new();
    let bridge = bridge(&transport, true).await;

    let value = parse(&bridge.refresh_auth(true).await);

    assert_eq!(value["accessToken"], "refreshed-1");
    assert_eq!(bridge.get_auth_token(), "refreshed-1");
}

#[tokio::test]
async fn test_token_accessors() {
    let transport = MockTransport::new();
    let bridge = bridge(&transport, false).await;
    assert_eq!(bridge.get_auth_token(), "");

    bridge.set_auth_token("manual").await.unwrap();
    assert_eq!(bridge.get_auth_token(), "manual");

    bridge.clear_auth().await;
    bridge.clear_auth().await;
    assert_eq!(bridge.get_auth_token(), "");
}

#[tokio::test]
async fn test_fetch_search_artists_json() {
    let transport = MockTransport::new();
    *transport.artist_results.lock().unwrap() = vec![
        artist("1", Some("sp1"), false),
        artist("2", None, true),
        artist("3", None, false),
    ];
    let bridge = bridge(&transport, true).await;

    let value = parse(&bridge.fetch_search_artists("band", 2).await);

    let artists = value.as_array().unwrap();
    assert_eq!(artists.len(), 2);
    assert_eq!(artists[0]["id"], "1");
    assert_eq!(artists[0]["spotifyId"], "sp1");
    assert_eq!(artists[0]["source"], "localify");
    assert_eq!(artists[1]["isFavorite"], true);
}

#[tokio::test]
async fn test_fetch_search_artists_rejects_bad_limits() {
    let transport = MockTransport::new();
    let bridge = bridge(&transport, true).await;

    let negative = parse(&bridge.fetch_search_artists("band", -1).await);
    assert_eq!(negative["error"], "ValidationError.InvalidLimit");
    assert!(negative["message"].as_str().unwrap().contains("-1"));

    let zero = parse(&bridge.fetch_search_artists("band", 0).await);
    assert_eq!(zero["error"], "ValidationError.InvalidLimit");

    let empty = parse(&bridge.fetch_search_artists("", 5).await);
    assert_eq!(empty["error"], "ValidationError.EmptyQuery");

    assert_eq!(MockTransport::calls(&transport.artist_search_calls), 0);
}

#[tokio::test]
async fn test_fetch_search_json() {
    let transport = MockTransport::new();
    let bridge = bridge(&transport, true).await;

    let value = parse(&bridge.fetch_search("nothing", false).await);

    assert_eq!(value["artists"], Value::Array(vec![]));
    assert_eq!(value["externalSearched"], false);
}

#[tokio::test]
async fn test_favorites_by_category_code() {
    let transport = MockTransport::new();
    let bridge = bridge(&transport, true).await;

    bridge.add_favorite("a", 0).unwrap();
    bridge.add_favorite("e", 1).unwrap();
    bridge.add_favorite("v", 2).unwrap();
    bridge.remove_favorite("v", 2).unwrap();
    bridge.favorites().settled().await;

    let log: Vec<String> = transport
        .favorite_log
        .lock()
        .unwrap()
        .iter()
        .map(|(key, favorite)| format!("{} {}", key, favorite))
        .collect();
    assert!(log.contains(&"artist:a true".to_string()));
    assert!(log.contains(&"event:e true".to_string()));
    assert!(log.contains(&"venue:v false".to_string()));
    assert_eq!(bridge.take_sync_failures(), "[]");
}

#[tokio::test]
async fn test_unknown_category_code() {
    let transport = MockTransport::new();
    let bridge = bridge(&transport, true).await;

    let err = bridge.add_favorite("a", 3).unwrap_err();
    let value = parse(&err);
    assert_eq!(value["error"], "ValidationError.InvalidCategory");

    assert!(bridge.remove_favorite("a", -1).is_err());
    assert_eq!(bridge.favorites().pending_count(), 0);
}

#[tokio::test]
async fn test_sync_failures_are_reported_once() {
    let transport = MockTransport::new();
    transport.fail_favorite(localify::types::FavoriteKey::artist("x"), true);
    let bridge = bridge(&transport, true).await;

    bridge.add_favorite("x", 0).unwrap();
    bridge.favorites().settled().await;

    let value = parse(&bridge.take_sync_failures());
    let failures = value.as_array().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["error"], "SyncError.FavoriteAddFailed");
    assert!(failures[0]["message"].as_str().unwrap().contains("artist:x"));

    assert_eq!(bridge.take_sync_failures(), "[]");
}

#[tokio::test]
async fn test_get_version() {
    let transport = MockTransport::new();
    let bridge = bridge(&transport, false).await;

    let version = bridge.get_version();

    assert!(version.starts_with("Localify Rust v"));
    assert!(version.ends_with(env!("CARGO_PKG_VERSION")));
}
