//! Localify Client Library
//!
//! Session, search and favorites client for the Localify API. The library
//! keeps one authenticated session alive (guest bootstrap, token exchange,
//! single-flight refresh), runs searches with the user's favorites
//! overlaid, and syncs favorite changes to the backend in the background.
//!
//! # Modules
//!
//! - `bridge` - String/JSON boundary for bindings and the CLI
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `error` - Error taxonomy shared by every operation
//! - `management` - Token persistence and the favorites registry
//! - `search` - Search gateway with favorites overlay
//! - `session` - Session lifecycle and token refresh
//! - `transport` - Backend transport trait and its HTTP implementation
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use localify::{bridge::Bridge, config};
//!
//! #[tokio::main]
//! async fn main() -> localify::Res<()> {
//!     config::load_env().await?;
//!     let bridge = Bridge::from_env().await?;
//!     println!("{}", bridge.create_guest_user().await);
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod search;
pub mod session;
pub mod transport;
pub mod types;
pub mod utils;

/// Version string reported across the binding boundary.
pub fn version() -> String {
    format!("Localify Rust v{}", env!("CARGO_PKG_VERSION"))
}

/// Result alias for the binary and other top-level glue, where any error
/// is reported and the process ends. Library operations return
/// [`error::Result`] instead.
///
/// # Example
///
/// ```
/// use localify::Res;
///
/// async fn token_path() -> Res<String> {
///     Ok(localify::config::data_dir().display().to_string())
/// }
/// ```
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// ```
/// info!("Creating guest session...");
/// info!("Found {} artists", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// ```
/// success!("Signed in");
/// success!("Loaded {} favorites", count);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the
/// program with status 1.
///
/// Only for fatal errors in the command-line front end; code after the
/// macro does not run.
///
/// ```
/// error!("Cannot reach {}", api_url);
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// ```
/// warning!("No session yet, run `localify auth guest`");
/// warning!("{} favorite changes were rolled back", count);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
