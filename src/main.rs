use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use tracing_subscriber::EnvFilter;

use vibestream::{
    app::App,
    cli,
    config::{self, Config},
    error,
    types::Role,
};

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
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create an account
    Signup(SignupOptions),

    /// Sign in with email and password
    Login(LoginOptions),

    /// Sign out
    Logout,

    /// Show the signed-in user and role
    Whoami,

    /// List the song catalogue
    Songs(SongsOptions),

    /// Start playing a song
    Play { song_id: String },

    /// Like or unlike a song
    Like { song_id: String },

    /// List liked songs
    Likes,

    /// Handle playlists
    Playlists(PlaylistsOptions),

    /// Recently played songs
    History {
        #[clap(long)]
        limit: Option<usize>,
    },

    /// Show which page a path renders for the current session
    Route { path: String },

    /// Spotify integration
    Spotify(SpotifyOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct SignupOptions {
    #[clap(long)]
    pub email: String,

    #[clap(long)]
    pub password: String,

    #[clap(long)]
    pub username: String,

    /// Account role
    #[clap(long, default_value = "user")]
    pub role: Role,
}

#[derive(Parser, Debug, Clone)]
pub struct LoginOptions {
    #[clap(long)]
    pub email: String,

    #[clap(long)]
    pub password: String,
}

#[derive(Parser, Debug, Clone)]
pub struct SongsOptions {
    /// Filter by title or artist
    #[clap(long)]
    pub search: Option<String>,
}

#[derive(Parser, Debug, Clone)]
#[command(about = "Handle playlists", args_conflicts_with_subcommands = true)]
pub struct PlaylistsOptions {
    #[command(subcommand)]
    pub command: Option<PlaylistsSubcommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PlaylistsSubcommand {
    /// Create a playlist
    Create { name: String },

    /// Add a song to a playlist
    Add { playlist_id: String, song_id: String },
}

#[derive(Parser, Debug, Clone)]
pub struct SpotifyOptions {
    #[command(subcommand)]
    pub command: SpotifySubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SpotifySubcommand {
    /// Authorize with Spotify API
    Auth,

    /// Forget the linked Spotify account
    Logout,

    /// Search tracks
    Search {
        query: String,
        #[clap(long, default_value_t = 20)]
        limit: u32,
    },

    /// List your Spotify playlists
    Playlists {
        #[clap(long, default_value_t = 20)]
        limit: u32,
    },

    /// Recently played tracks
    Recent {
        #[clap(long, default_value_t = 20)]
        limit: u32,
    },

    /// Start playback of track URIs
    Play {
        #[clap(long)]
        device_id: Option<String>,
        #[clap(required = true)]
        uris: Vec<String>,
    },
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    if let Command::Completions(opt) = cli.command {
        let mut cmd = Cli::command_for_update();
        let name = cmd.get_name().to_string();
        generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => error!("{}", e),
    };
    let app = match App::bootstrap(config).await {
        Ok(app) => app,
        Err(e) => error!("Cannot start. Err: {}", e),
    };

    if let Err(e) = run(&app, cli.command).await {
        error!("{}", e);
    }
}

async fn run(app: &App, command: Command) -> vibestream::Result<()> {
    match command {
        Command::Signup(opt) => {
            cli::account::signup(app, opt.email, opt.password, opt.username, opt.role).await
        }
        Command::Login(opt) => cli::account::login(app, &opt.email, &opt.password).await,
        Command::Logout => cli::account::logout(app).await,
        Command::Whoami => cli::account::whoami(app).await,
        Command::Songs(opt) => cli::library::songs(app, opt.search).await,
        Command::Play { song_id } => cli::library::play(app, &song_id).await,
        Command::Like { song_id } => cli::library::like(app, &song_id).await,
        Command::Likes => cli::library::likes(app).await,
        Command::Playlists(opt) => match opt.command {
            Some(PlaylistsSubcommand::Create { name }) => cli::playlists::create(app, &name).await,
            Some(PlaylistsSubcommand::Add {
                playlist_id,
                song_id,
            }) => cli::playlists::add(app, &playlist_id, &song_id).await,
            None => cli::playlists::list(app).await,
        },
        Command::History { limit } => cli::library::history(app, limit).await,
        Command::Route { path } => cli::route::route(app, &path),
        Command::Spotify(opt) => match opt.command {
            SpotifySubcommand::Auth => cli::spotify::link(app).await,
            SpotifySubcommand::Logout => cli::spotify::unlink(app).await,
            SpotifySubcommand::Search { query, limit } => {
                cli::spotify::search(app, &query, limit).await
            }
            SpotifySubcommand::Playlists { limit } => cli::spotify::playlists(app, limit).await,
            SpotifySubcommand::Recent { limit } => cli::spotify::recent(app, limit).await,
            SpotifySubcommand::Play { device_id, uris } => {
                cli::spotify::play(app, device_id.as_deref(), &uris).await
            }
        },
        Command::Completions(_) => Ok(()),
    }
}
