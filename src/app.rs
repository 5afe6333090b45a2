use std::sync::Arc;

use crate::{
    Error, Result,
    backend::{self, Backend},
    config::Config,
    management::{FileTokenStore, LikedSongs, SessionCache, TokenManager},
    router::Router,
    session::{AuthState, SessionStore},
    spotify::{SpotifyClient, SpotifyOAuth},
    types::Song,
    warning,
};

/// Everything a front end needs, wired once and passed down explicitly.
pub struct App {
    pub config: Config,
    pub session: SessionStore,
    pub likes: LikedSongs,
    cache: SessionCache,
    tokens: Option<Arc<TokenManager>>,
}

impl App {
    /// Connects the configured backend and resumes the cached session.
    pub async fn bootstrap(config: Config) -> Result<Self> {
        let backend = backend::connect(&config.backend).await?;
        let app = Self::with_backend(config, backend);

        let state = match app.resume().await {
            Ok(state) => state,
            Err(e) => {
                warning!("Could not resume your session ({}), try again later", e);
                app.session.current()
            }
        };

        if state.session().is_some() {
            if let Err(e) = app.likes.load().await {
                tracing::warn!("could not load liked songs: {}", e);
            }
        }
        Ok(app)
    }

    pub fn with_backend(config: Config, backend: Arc<dyn Backend>) -> Self {
        let session = SessionStore::new(backend);
        let tokens = config.spotify.clone().map(|spotify| {
            Arc::new(TokenManager::new(
                Arc::new(FileTokenStore::new(&config.data_dir)),
                SpotifyOAuth::new(spotify),
            ))
        });

        Self {
            cache: SessionCache::new(&config.data_dir),
            likes: LikedSongs::new(session.clone()),
            session,
            tokens,
            config,
        }
    }

    /// Restores the cached session and writes the outcome back. A transient
    /// failure is returned without touching the cache.
    pub async fn resume(&self) -> Result<AuthState> {
        let cached = self.cache.load().await?;
        let state = self.session.restore(cached).await?;
        self.cache.sync(&state).await?;
        Ok(state)
    }

    /// A rejected credential signs the session out mid-command; keep the
    /// cache in step before the error is reported.
    pub async fn after_call<T>(&self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.persist_session().await?;
        }
        result
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        self.session.backend()
    }

    /// Writes the settled auth state to the session cache.
    pub async fn persist_session(&self) -> Result<()> {
        let state = self.session.current();
        self.cache.sync(&state).await
    }

    /// Router already gated by the current auth state.
    pub fn router(&self) -> Router {
        let mut router = Router::new();
        router.apply(&self.session.current());
        router
    }

    pub fn tokens(&self) -> Result<&Arc<TokenManager>> {
        self.tokens
            .as_ref()
            .ok_or_else(|| Error::Config("SPOTIFY_CLIENT_ID must be set".to_string()))
    }

    pub fn spotify(&self) -> Result<SpotifyClient> {
        let tokens = self.tokens()?;
        Ok(SpotifyClient::new(
            &self.config.spotify()?.api_url,
            Arc::clone(tokens),
            self.session.clone(),
        ))
    }

    /// Playback start: bumps the song's play counter and, for a signed-in
    /// user, records it in the listening history.
    pub async fn play_song(&self, song_id: &str) -> Result<Song> {
        let mut song = self.backend().get_song(song_id).await?;
        song.play_count = self.backend().increment_play_count(song_id).await?;

        if let AuthState::SignedIn { session, .. } = self.session.current() {
            self.backend().record_play(&session, song_id).await?;
        }
        Ok(song)
    }
}
