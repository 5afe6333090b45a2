use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{Error, Result, spotify::SpotifyOAuth, types::Token};

pub const TOKEN_FILE_NAME: &str = "spotify_tokens.json";

/// Per-user persistence of the Spotify token pair.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self, user_id: &str) -> Result<Option<Token>>;

    async fn save(&self, user_id: &str, token: &Token) -> Result<()>;

    async fn clear(&self, user_id: &str) -> Result<()>;
}

/// Stores each user's token as `<root>/users/<user_id>/spotify_tokens.json`.
pub struct FileTokenStore {
    root: PathBuf,
}

impl FileTokenStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn token_path(&self, user_id: &str) -> PathBuf {
        let mut path = self.root.join("users");
        path.push(sanitize(user_id));
        path.push(TOKEN_FILE_NAME);
        path
    }
}

/// Keeps user ids from escaping the users directory.
fn sanitize(user_id: &str) -> String {
    user_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

async fn read_token(path: &Path) -> Result<Option<Token>> {
    match async_fs::read_to_string(path).await {
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self, user_id: &str) -> Result<Option<Token>> {
        read_token(&self.token_path(user_id)).await
    }

    async fn save(&self, user_id: &str, token: &Token) -> Result<()> {
        let path = self.token_path(user_id);
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(token)?;
        async_fs::write(path, json).await?;
        Ok(())
    }

    async fn clear(&self, user_id: &str) -> Result<()> {
        match async_fs::remove_file(self.token_path(user_id)).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, Token>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self, user_id: &str) -> Result<Option<Token>> {
        Ok(self.tokens.lock().await.get(user_id).cloned())
    }

    async fn save(&self, user_id: &str, token: &Token) -> Result<()> {
        self.tokens
            .lock()
            .await
            .insert(user_id.to_string(), token.clone());
        Ok(())
    }

    async fn clear(&self, user_id: &str) -> Result<()> {
        self.tokens.lock().await.remove(user_id);
        Ok(())
    }
}

/// Owns the Spotify token of every local user and hands out access tokens
/// that are valid for at least the expiry leeway.
///
/// Refreshes are single-flight per user: callers for the same user serialize
/// on a per-user lock, and whoever gets it after a refresh re-reads the store
/// and reuses the new token instead of refreshing again.
pub struct TokenManager {
    store: Arc<dyn TokenStore>,
    oauth: SpotifyOAuth,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn TokenStore>, oauth: SpotifyOAuth) -> Self {
        Self {
            store,
            oauth,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn oauth(&self) -> &SpotifyOAuth {
        &self.oauth
    }

    pub async fn persist(&self, user_id: &str, token: &Token) -> Result<()> {
        self.store.save(user_id, token).await
    }

    /// Stored token as-is, expired or not.
    pub async fn current(&self, user_id: &str) -> Result<Option<Token>> {
        self.store.load(user_id).await
    }

    pub async fn clear(&self, user_id: &str) -> Result<()> {
        self.store.clear(user_id).await
    }

    /// Returns a token that is not about to expire, refreshing it first when
    /// needed.
    ///
    /// # Errors
    ///
    /// - [`Error::SpotifyNotLinked`] when the user never authorized Spotify
    /// - [`Error::AuthExpired`] when the refresh token was rejected; the
    ///   stored token is gone afterwards
    pub async fn get_valid_token(&self, user_id: &str) -> Result<Token> {
        let token = self.load_linked(user_id).await?;
        if !token.is_expired() {
            return Ok(token);
        }

        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let token = self.load_linked(user_id).await?;
        if !token.is_expired() {
            tracing::debug!(user_id, "token refreshed by a concurrent caller");
            return Ok(token);
        }

        self.refresh_locked(user_id, &token).await
    }

    /// Refreshes after an API rejected `stale_access_token` even though it
    /// looked valid. Does nothing but return the stored token if another
    /// caller already replaced it.
    pub async fn force_refresh(&self, user_id: &str, stale_access_token: &str) -> Result<Token> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let token = self.load_linked(user_id).await?;
        if token.access_token != stale_access_token {
            return Ok(token);
        }

        self.refresh_locked(user_id, &token).await
    }

    async fn refresh_locked(&self, user_id: &str, token: &Token) -> Result<Token> {
        tracing::debug!(user_id, "refreshing spotify token");
        match self.oauth.refresh(&token.refresh_token).await {
            Ok(fresh) => {
                self.store.save(user_id, &fresh).await?;
                Ok(fresh)
            }
            Err(Error::AuthExpired) => {
                tracing::warn!(user_id, "spotify refresh token rejected, unlinking");
                self.store.clear(user_id).await?;
                Err(Error::AuthExpired)
            }
            Err(e) => Err(e),
        }
    }

    async fn load_linked(&self, user_id: &str) -> Result<Token> {
        self.store
            .load(user_id)
            .await?
            .ok_or(Error::SpotifyNotLinked)
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        // a lock only the map still references has no holder or waiter
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(user_id.to_string()).or_default())
    }
}
