use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Tokens are treated as expired this long before their actual expiry.
pub const TOKEN_EXPIRY_LEEWAY_MS: i64 = 240_000;

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Spotify access/refresh token pair as persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub scope: String,
    /// Epoch milliseconds.
    pub expires_at: i64,
}

impl Token {
    /// Builds a token from a token-endpoint answer. Spotify may omit the
    /// refresh token on refresh, in which case the previous one stays valid.
    pub fn from_grant(grant: TokenResponse, previous_refresh: Option<&str>) -> Self {
        Token {
            access_token: grant.access_token,
            refresh_token: grant
                .refresh_token
                .filter(|t| !t.is_empty())
                .or_else(|| previous_refresh.map(str::to_string))
                .unwrap_or_default(),
            scope: grant.scope.unwrap_or_default(),
            expires_at: now_millis() + (grant.expires_in as i64) * 1000,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at - TOKEN_EXPIRY_LEEWAY_MS
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Error body of the accounts service, e.g. `{"error":"invalid_grant"}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PkceToken {
    pub code_verifier: String,
    pub token: Option<Token>,
}

/// Backend login session. The auth provider owns it; the client only caches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Epoch milliseconds.
    pub expires_at: i64,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        now_millis() >= self.expires_at
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    /// Lenient parse used for role rows: anything unrecognised is a plain user.
    pub fn from_row(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    /// Artist name or reference as stored in the catalogue.
    pub artist: String,
    pub file_url: String,
    /// Seconds; unknown for some catalogue entries.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub play_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Like {
    pub user_id: String,
    pub song_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    #[serde(rename = "user_id")]
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub track_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub user_id: String,
    pub song_id: String,
    pub played_at: DateTime<Utc>,
}

// Spotify Web API payloads.

#[derive(Debug, Clone, Deserialize)]
pub struct Paging<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub tracks: Option<Paging<Track>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub duration_ms: u32,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    #[serde(default)]
    pub album: Option<SpotifyAlbum>,
}

impl Track {
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimplifiedPlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub collaborative: bool,
    #[serde(default)]
    pub tracks: Option<TracksRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TracksRef {
    pub total: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayHistory {
    pub track: Track,
    pub played_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayRequest {
    pub uris: Vec<String>,
}

/// `{"error":{"status":401,"message":"The access token expired"}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
}

// Table rows for the CLI.

#[derive(Tabled)]
pub struct SongTableRow {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub plays: u64,
    pub liked: String,
}

#[derive(Tabled)]
pub struct PlaylistTableRow {
    pub id: String,
    pub name: String,
    pub tracks: usize,
}

#[derive(Tabled)]
pub struct HistoryTableRow {
    pub played_at: String,
    pub song: String,
}

#[derive(Tabled)]
pub struct TrackTableRow {
    pub name: String,
    pub artists: String,
    pub duration: String,
    pub uri: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_row_defaults_to_user() {
        assert_eq!(Role::from_row("admin"), Role::Admin);
        assert_eq!(Role::from_row("ADMIN "), Role::Admin);
        assert_eq!(Role::from_row("moderator"), Role::User);
        assert_eq!(Role::from_row(""), Role::User);
    }

    #[test]
    fn test_token_keeps_previous_refresh_token() {
        let grant = TokenResponse {
            access_token: "new-access".into(),
            refresh_token: None,
            scope: None,
            expires_in: 3600,
        };
        let token = Token::from_grant(grant, Some("old-refresh"));
        assert_eq!(token.refresh_token, "old-refresh");
        assert!(!token.is_expired());
    }

    #[test]
    fn test_token_expiry_includes_leeway() {
        let token = Token {
            access_token: "a".into(),
            refresh_token: "r".into(),
            scope: String::new(),
            expires_at: 1_000_000,
        };
        assert!(!token.is_expired_at(1_000_000 - TOKEN_EXPIRY_LEEWAY_MS - 1));
        assert!(token.is_expired_at(1_000_000 - TOKEN_EXPIRY_LEEWAY_MS));
        assert!(token.is_expired_at(2_000_000));
    }

    #[test]
    fn test_playlist_owner_maps_to_user_id_column() {
        let row = serde_json::json!({
            "id": "p1",
            "user_id": "u1",
            "name": "Chill Vibes",
        });
        let playlist: Playlist = serde_json::from_value(row).unwrap();
        assert_eq!(playlist.owner, "u1");
        assert!(playlist.track_ids.is_empty());
    }
}
