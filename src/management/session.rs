use std::{io::ErrorKind, path::PathBuf};

use crate::{Result, session::AuthState, types::Session};

pub const SESSION_FILE_NAME: &str = "session.json";

/// On-disk copy of the backend session so the CLI stays signed in between
/// runs.
pub struct SessionCache {
    path: PathBuf,
}

impl SessionCache {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join(SESSION_FILE_NAME),
        }
    }

    pub async fn load(&self) -> Result<Option<Session>> {
        match async_fs::read_to_string(&self.path).await {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(session) => Ok(Some(session)),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), "ignoring unreadable session cache: {}", e);
                    Ok(None)
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn persist(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(session)?;
        async_fs::write(&self.path, json).await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        match async_fs::remove_file(&self.path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Mirrors a settled auth state to disk. `Loading` is left alone.
    pub async fn sync(&self, state: &AuthState) -> Result<()> {
        match state {
            AuthState::SignedIn { session, .. } => self.persist(session).await,
            AuthState::SignedOut => self.clear().await,
            AuthState::Loading => Ok(()),
        }
    }
}
