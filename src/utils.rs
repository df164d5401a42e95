use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

/// Random PKCE code verifier, 128 alphanumeric characters.
pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

/// S256 code challenge for `verifier`, base64url without padding.
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Comma-joined first `max` entries of `items`.
pub fn join_first(items: &[String], max: usize) -> String {
    items.iter().take(max).cloned().collect::<Vec<_>>().join(",")
}

/// Marker for the favorite column of result tables.
pub fn favorite_mark(flag: bool) -> String {
    if flag { "★".to_string() } else { String::new() }
}
