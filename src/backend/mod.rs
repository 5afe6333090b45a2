//! # Backend Module
//!
//! Data access against the backend-as-a-service: authentication, role lookup
//! and row-level CRUD on `songs`, `user_likes`, `playlists`,
//! `listening_history`, `user_roles` and `profiles`.
//!
//! ## Adapters
//!
//! The app historically talked to more than one backend. They are mutually
//! exclusive implementations of one [`Backend`] trait:
//!
//! - [`RestBackend`] - Supabase style hosted backend (GoTrue auth endpoints and
//!   PostgREST table endpoints over HTTPS)
//! - [`LocalBackend`] - in-process backend seeded with a free-to-use catalogue,
//!   optionally persisted to a JSON snapshot; used offline and in tests
//!
//! ## Scoping
//!
//! Every user-scoped operation takes the caller's [`Session`] explicitly. The
//! adapters filter rows by `session.user_id` and, for the hosted backend, send
//! `session.access_token` so row level security applies.

mod local;
mod rest;

use std::sync::Arc;

use async_trait::async_trait;

pub use local::LocalBackend;
pub use rest::RestBackend;

use crate::{
    Result,
    config::{BackendConfig, BackendKind},
    types::{HistoryEntry, Playlist, Profile, Role, Session, SignUp, Song},
};

/// Newest-first history length kept for "recently played".
pub const HISTORY_LIMIT: usize = 50;

#[async_trait]
pub trait Backend: Send + Sync {
    /// Creates the account, its role row and its profile.
    async fn sign_up(&self, request: &SignUp) -> Result<Session>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// Exchanges a session refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session>;

    async fn sign_out(&self, session: &Session) -> Result<()>;

    /// Role row of the session's user; `None` when there is none.
    async fn fetch_role(&self, session: &Session) -> Result<Option<Role>>;

    async fn profile(&self, session: &Session) -> Result<Option<Profile>>;

    async fn list_songs(&self) -> Result<Vec<Song>>;

    async fn get_song(&self, song_id: &str) -> Result<Song>;

    /// Bumps the play counter on playback start and returns the new count.
    async fn increment_play_count(&self, song_id: &str) -> Result<u64>;

    async fn liked_song_ids(&self, session: &Session) -> Result<Vec<String>>;

    /// Idempotent: liking a liked song leaves exactly one row.
    async fn insert_like(&self, session: &Session, song_id: &str) -> Result<()>;

    async fn delete_like(&self, session: &Session, song_id: &str) -> Result<()>;

    async fn list_playlists(&self, session: &Session) -> Result<Vec<Playlist>>;

    async fn create_playlist(&self, session: &Session, name: &str) -> Result<Playlist>;

    /// Appends a song unless it is already on the playlist.
    async fn add_to_playlist(
        &self,
        session: &Session,
        playlist_id: &str,
        song_id: &str,
    ) -> Result<Playlist>;

    async fn record_play(&self, session: &Session, song_id: &str) -> Result<()>;

    /// Newest first, at most `limit` entries.
    async fn listening_history(&self, session: &Session, limit: usize)
    -> Result<Vec<HistoryEntry>>;
}

/// Builds the adapter selected in the configuration.
pub async fn connect(config: &BackendConfig) -> Result<Arc<dyn Backend>> {
    let backend: Arc<dyn Backend> = match config.kind {
        BackendKind::Supabase => Arc::new(RestBackend::new(&config.url, &config.anon_key)),
        BackendKind::Local => Arc::new(LocalBackend::open(config.local_path.clone()).await?),
    };
    Ok(backend)
}
