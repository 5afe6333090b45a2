//! Configuration management for the VibeStream client.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. It provides a centralized way to manage application
//! configuration including Spotify API credentials, backend location and the local
//! callback server address.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (public Spotify endpoints, local backend)

use std::{env, path::PathBuf, str::FromStr};

use crate::{Error, Result};

pub const DEFAULT_SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8888";

/// Scopes needed for search, library reads and playback control.
pub const DEFAULT_SPOTIFY_SCOPE: &str = "streaming user-read-email user-read-private \
user-read-playback-state user-modify-playback-state user-library-read \
user-read-recently-played playlist-read-private playlist-read-collaborative";

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the necessary directory structure if it doesn't exist and loads
/// environment variables from a `.env` file located in the platform-specific
/// local data directory under `vibestream/.env`. A missing file is not an
/// error: every setting either has a default or is reported when it is needed.
///
/// # Directory Structure
///
/// The function looks for the `.env` file in:
/// - Linux: `~/.local/share/vibestream/.env`
/// - macOS: `~/Library/Application Support/vibestream/.env`
/// - Windows: `%LOCALAPPDATA%/vibestream/.env`
///
/// # Errors
///
/// This function will return an error if:
/// - The parent directory cannot be created
/// - The `.env` file exists but cannot be read or parsed
pub async fn load_env() -> Result<()> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| Error::Config(e.to_string()))?;
    }
    Ok(())
}

/// Root directory for everything the client persists locally.
///
/// Overridable with `VIBESTREAM_DATA_DIR`, which tests and multi-profile
/// setups use to keep state apart.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = present("VIBESTREAM_DATA_DIR") {
        return PathBuf::from(dir);
    }
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("vibestream");
    path
}

/// Returns the address the local OAuth callback server binds to.
///
/// Reads `SERVER_ADDRESS`, falling back to `127.0.0.1:8888`. The port must
/// match the one registered in the Spotify redirect URI.
pub fn server_addr() -> String {
    var_or("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS)
}

/// Value of `name`; an empty assignment like `SPOTIFY_CLIENT_ID=` counts as unset.
fn present(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn var_or(name: &str, default: &str) -> String {
    present(name).unwrap_or_else(|| default.to_string())
}

fn required(name: &str) -> Result<String> {
    present(name).ok_or_else(|| Error::Config(format!("{name} must be set")))
}

/// Spotify application credentials and endpoints.
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    /// When present, token requests authenticate with HTTP basic client
    /// credentials; otherwise the client id travels in the form body (PKCE).
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scope: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
}

impl SpotifyConfig {
    /// Reads `SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET`,
    /// `SPOTIFY_REDIRECT_URI`, `SPOTIFY_SCOPE` and the three endpoint URLs
    /// (`SPOTIFY_AUTH_URL`, `SPOTIFY_TOKEN_URL`, `SPOTIFY_API_URL`).
    pub fn from_env() -> Result<Self> {
        let redirect_default = format!("http://{}/callback", server_addr());
        Ok(Self {
            client_id: required("SPOTIFY_CLIENT_ID")?,
            client_secret: present("SPOTIFY_CLIENT_SECRET"),
            redirect_uri: var_or("SPOTIFY_REDIRECT_URI", &redirect_default),
            scope: var_or("SPOTIFY_SCOPE", DEFAULT_SPOTIFY_SCOPE),
            auth_url: var_or("SPOTIFY_AUTH_URL", DEFAULT_SPOTIFY_AUTH_URL),
            token_url: var_or("SPOTIFY_TOKEN_URL", DEFAULT_SPOTIFY_TOKEN_URL),
            api_url: var_or("SPOTIFY_API_URL", DEFAULT_SPOTIFY_API_URL),
        })
    }
}

/// Which data-access adapter backs the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Supabase,
    Local,
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" | "rest" => Ok(BackendKind::Supabase),
            "local" | "memory" | "mock" => Ok(BackendKind::Local),
            other => Err(Error::Config(format!("unknown backend '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Project URL, e.g. `https://xyz.supabase.co`. Unused by the local adapter.
    pub url: String,
    pub anon_key: String,
    /// Snapshot file of the local adapter.
    pub local_path: PathBuf,
}

impl BackendConfig {
    /// `VIBESTREAM_BACKEND` selects the adapter (default `local`);
    /// `SUPABASE_URL` and `SUPABASE_ANON_KEY` are required for `supabase`.
    pub fn from_env() -> Result<Self> {
        let kind: BackendKind = var_or("VIBESTREAM_BACKEND", "local").parse()?;
        let (url, anon_key) = match kind {
            BackendKind::Supabase => (required("SUPABASE_URL")?, required("SUPABASE_ANON_KEY")?),
            BackendKind::Local => (String::new(), String::new()),
        };
        Ok(Self {
            kind,
            url: url.trim_end_matches('/').to_string(),
            anon_key,
            local_path: data_dir().join("local-backend.json"),
        })
    }
}

/// Everything the application needs, read once at startup and passed down.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub data_dir: PathBuf,
    pub backend: BackendConfig,
    /// `None` when no Spotify application is configured; Spotify commands
    /// then fail with a configuration error while the rest keeps working.
    pub spotify: Option<SpotifyConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let spotify = match SpotifyConfig::from_env() {
            Ok(spotify) => Some(spotify),
            Err(e) => {
                tracing::debug!("spotify integration disabled: {}", e);
                None
            }
        };

        Ok(Self {
            server_addr: server_addr(),
            data_dir: data_dir(),
            backend: BackendConfig::from_env()?,
            spotify,
        })
    }

    pub fn spotify(&self) -> Result<&SpotifyConfig> {
        self.spotify
            .as_ref()
            .ok_or_else(|| Error::Config("SPOTIFY_CLIENT_ID must be set".to_string()))
    }
}
