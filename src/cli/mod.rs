//! # CLI Module
//!
//! Terminal front end for the Localify client. Every command runs against
//! one [`Bridge`](crate::bridge::Bridge) built from the environment, so a
//! command sees the session the previous one persisted.
//!
//! ## Command Categories
//!
//! ### Session
//!
//! - [`guest`] - Creates a guest session
//! - [`login`] - Exchanges a token and secret for a session
//! - [`refresh`] - Refreshes the current credential
//! - [`set_token`] / [`show_token`] / [`logout`] - Raw token handling
//! - [`whoami`] - Shows the signed-in profile
//! - [`link_spotify`] - Opens the Spotify account link page
//!
//! ### Search
//!
//! - [`search`] - Searches artists, events, venues and cities
//! - [`search_artists`] - Searches artists only
//!
//! ### Favorites
//!
//! - [`add_favorite`] / [`remove_favorite`] - Changes a favorite and waits
//!   for the backend to confirm it
//! - [`list_favorites`] - Shows the favorites of one category
//!
//! ### Information
//!
//! - [`info`] - Session state and client version
//!
//! ## Usage Patterns
//!
//! ```bash
//! localify auth guest                 # start a guest session
//! localify search "jazz" --external   # fall back to Spotify when empty
//! localify favorites add artist 42    # favorite an artist
//! localify favorites list artist      # show favorite artists
//! ```
//!
//! Failures end the process through the crate's `error!` macro; library
//! diagnostics go to stderr through `tracing` (set `RUST_LOG=localify=debug`).

mod auth;
mod favorites;
mod info;
mod search;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub use auth::guest;
pub use auth::link_spotify;
pub use auth::login;
pub use auth::logout;
pub use auth::refresh;
pub use auth::set_token;
pub use auth::show_token;
pub use auth::whoami;
pub use favorites::add_favorite;
pub use favorites::list_favorites;
pub use favorites::remove_favorite;
pub use info::info;
pub use search::search;
pub use search::search_artists;

fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb
}
