use crate::{bridge::Bridge, config, info, session::SessionState, transport, warning};

/// Displays information about the client and the current session.
///
/// # Arguments
///
/// * `session` - Show the session state and credential expiry
/// * `config` - Show the effective configuration
///
/// With neither flag set the client version is shown. When both are set,
/// the session is shown first.
///
/// # Output Examples
///
/// ```text
/// [o] Localify Rust v0.1.0-dev
/// [o] Session: guest, expires 2026-10-16T12:00:00+00:00
/// [o] API: https://staging.localify.org
/// ```
pub fn info(bridge: &Bridge, session: bool, show_config: bool) {
    if !session && !show_config {
        info!("{}", bridge.get_version());
        info!("User agent: {}", transport::user_agent());
        return;
    }

    if session {
        let state = bridge.session().state();
        match bridge.session().current_credential() {
            Some(credential) => {
                let kind = match state {
                    SessionState::GuestActive => "guest",
                    SessionState::Authenticated => "user",
                    _ => "pending",
                };
                match credential.expires_at {
                    Some(at) => info!("Session: {}, expires {}", kind, at.to_rfc3339()),
                    None => info!("Session: {}, no known expiry", kind),
                }
                if credential.refresh_token.is_none() {
                    warning!("No refresh token; the session ends when the token expires");
                }
            }
            None => warning!("No session"),
        }
    }

    if show_config {
        info!("Data directory: {}", config::data_dir().display());
        info!("API: {}", config::api_url());
        info!("Request timeout: {}s", config::request_timeout().as_secs());
        info!(
            "Refresh: {}s before expiry, {} attempts, {}ms backoff",
            config::refresh_margin().num_seconds(),
            config::refresh_max_attempts(),
            config::refresh_backoff().as_millis()
        );
        info!("HTTP retries: {}", config::http_max_retries());
    }
}
