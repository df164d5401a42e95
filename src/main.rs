use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use tracing_subscriber::EnvFilter;

use localify::{bridge::Bridge, cli, config, error, types::FavoriteCategory};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Manage the session
    Auth(AuthOptions),

    /// Search artists, events, venues and cities
    Search(SearchOptions),

    /// Search artists only
    Artists(ArtistsOptions),

    /// Manage favorites
    Favorites(FavoritesOptions),

    /// Client and session information
    Info(InfoOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct AuthOptions {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AuthSubcommand {
    /// Start a guest session
    Guest,

    /// Exchange a token and secret for a session
    Login {
        #[clap(long)]
        token: String,
        #[clap(long)]
        secret: String,
    },

    /// Refresh the current credential
    Refresh {
        /// Refresh even if the credential is not close to expiry
        #[clap(long)]
        force: bool,
    },

    /// Print or replace the raw access token
    Token {
        /// Store this access token; an empty value clears the session
        #[clap(long)]
        set: Option<String>,
    },

    /// Show the signed-in profile
    Whoami {
        #[clap(long)]
        json: bool,
    },

    /// Link a Spotify account to this session
    LinkSpotify,

    /// End the session
    Logout,
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// Search text
    pub text: String,

    /// Fall back to Spotify when Localify has no match
    #[clap(long)]
    pub external: bool,

    /// Print the raw JSON result
    #[clap(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ArtistsOptions {
    /// Search text
    pub text: String,

    /// Maximum number of artists
    #[clap(long, default_value_t = 10, allow_negative_numbers = true)]
    pub limit: i32,

    /// Print the raw JSON result
    #[clap(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct FavoritesOptions {
    #[command(subcommand)]
    pub command: FavoritesSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum FavoritesSubcommand {
    /// Favorite an artist, event or venue
    Add {
        #[clap(value_enum)]
        category: FavoriteCategory,
        id: String,
    },

    /// Remove a favorite
    Remove {
        #[clap(value_enum)]
        category: FavoriteCategory,
        id: String,
    },

    /// List favorites of one category
    List {
        #[clap(value_enum)]
        category: FavoriteCategory,
    },
}

#[derive(Parser, Debug, Clone)]
pub struct InfoOptions {
    #[clap(long)]
    session: bool,
    #[clap(long)]
    config: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Command::Completions(opt) = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    let bridge = match Bridge::from_env().await {
        Ok(bridge) => bridge,
        Err(e) => error!("Cannot start client. Err: {}", e),
    };

    match cli.command {
        Command::Auth(opt) => match opt.command {
            AuthSubcommand::Guest => cli::guest(&bridge).await,
            AuthSubcommand::Login { token, secret } => cli::login(&bridge, &token, &secret).await,
            AuthSubcommand::Refresh { force } => cli::refresh(&bridge, force).await,
            AuthSubcommand::Token { set: Some(token) } => cli::set_token(&bridge, &token).await,
            AuthSubcommand::Token { set: None } => cli::show_token(&bridge),
            AuthSubcommand::Whoami { json } => cli::whoami(&bridge, json).await,
            AuthSubcommand::LinkSpotify => cli::link_spotify(&bridge).await,
            AuthSubcommand::Logout => cli::logout(&bridge).await,
        },

        Command::Search(opt) => cli::search(&bridge, &opt.text, opt.external, opt.json).await,
        Command::Artists(opt) => {
            cli::search_artists(&bridge, &opt.text, opt.limit, opt.json).await
        }

        Command::Favorites(opt) => match opt.command {
            FavoritesSubcommand::Add { category, id } => {
                cli::add_favorite(&bridge, category, &id).await
            }
            FavoritesSubcommand::Remove { category, id } => {
                cli::remove_favorite(&bridge, category, &id).await
            }
            FavoritesSubcommand::List { category } => {
                cli::list_favorites(&bridge, category).await
            }
        },

        Command::Info(opt) => cli::info(&bridge, opt.session, opt.config),
        Command::Completions(_) => {}
    }
}
