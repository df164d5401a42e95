use crate::{
    bridge::Bridge,
    error, info,
    session::SessionState,
    success,
    types::Credential,
    utils::{generate_code_challenge, generate_code_verifier},
    warning,
};

pub async fn guest(bridge: &Bridge) {
    let pb = super::spinner("Creating guest session...");
    let result = bridge.session().create_guest_user().await;
    pb.finish_and_clear();

    match result {
        Ok(credential) => {
            success!("Guest session started");
            describe(&credential);
        }
        Err(e) => error!("Cannot create guest session. Err: {}", e),
    }
}

pub async fn login(bridge: &Bridge, token: &str, secret: &str) {
    let pb = super::spinner("Signing in...");
    let result = bridge.session().exchange_token(token, secret).await;
    pb.finish_and_clear();

    match result {
        Ok(credential) => {
            success!("Signed in");
            describe(&credential);
        }
        Err(e) => error!("Sign in failed. Err: {}", e),
    }
}

pub async fn refresh(bridge: &Bridge, force: bool) {
    match bridge.session().refresh_auth(force).await {
        Ok(credential) => {
            success!("Credential is valid");
            describe(&credential);
        }
        Err(e) => error!("Cannot refresh session. Err: {}", e),
    }
}

pub async fn set_token(bridge: &Bridge, token: &str) {
    if let Err(e) = bridge.set_auth_token(token).await {
        error!("Cannot store token. Err: {}", e);
    }
    if token.trim().is_empty() {
        success!("Session cleared");
    } else {
        success!("Token stored");
    }
}

pub fn show_token(bridge: &Bridge) {
    let token = bridge.get_auth_token();
    if token.is_empty() {
        warning!("No session. Run `localify auth guest` or `localify auth login`");
        return;
    }
    println!("{}", token);
}

pub async fn logout(bridge: &Bridge) {
    bridge.clear_auth().await;
    success!("Signed out");
}

pub async fn whoami(bridge: &Bridge, json: bool) {
    if json {
        println!("{}", bridge.fetch_user_details().await);
        return;
    }

    match bridge.session().fetch_user_details().await {
        Ok(profile) => {
            let name = if profile.name.is_empty() {
                "(no name)"
            } else {
                profile.name.as_str()
            };
            info!("{} ({})", name, profile.id);
            if let Some(email) = &profile.email {
                info!("Email: {}", email);
            }
            if profile.anonymous_user {
                info!("Guest account");
            }
            info!(
                "Spotify: {}",
                if profile.spotify_connected {
                    "connected"
                } else {
                    "not connected"
                }
            );
        }
        Err(e) => error!("Cannot fetch profile. Err: {}", e),
    }
}

/// Opens the backend's Spotify authorization page for this session.
pub async fn link_spotify(bridge: &Bridge) {
    if bridge.session().state() == SessionState::Unauthenticated {
        error!("No session. Run `localify auth guest` or `localify auth login` first");
    }

    // the backend completes the code exchange; only the challenge leaves here
    let challenge = generate_code_challenge(&generate_code_verifier());

    let url = match bridge.session().link_spotify(&challenge).await {
        Ok(url) => url,
        Err(e) => error!("Cannot start Spotify linking. Err: {}", e),
    };

    info!("Opening Spotify authorization in your browser");
    if webbrowser::open(&url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            url
        )
    }
}

fn describe(credential: &Credential) {
    let kind = if credential.is_guest { "guest" } else { "user" };
    match credential.expires_at {
        Some(at) => info!("Session type: {}, expires {}", kind, at.to_rfc3339()),
        None => info!("Session type: {}, no known expiry", kind),
    }
}
