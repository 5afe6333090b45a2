use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    Error, Result,
    types::{HistoryEntry, Like, Playlist, Profile, Role, Session, SignUp, Song, now_millis},
    utils,
};

use super::{Backend, HISTORY_LIMIT};

const SESSION_TTL_MS: i64 = 3_600_000;
/// How long after expiry a session can still be refreshed.
const REFRESH_TTL_MS: i64 = 30 * 24 * 3_600_000;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    user_id: String,
    email: String,
    username: String,
    password_hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LocalDb {
    accounts: Vec<Account>,
    sessions: Vec<Session>,
    roles: BTreeMap<String, Role>,
    songs: Vec<Song>,
    likes: BTreeSet<Like>,
    playlists: Vec<Playlist>,
    /// Newest first across all users.
    history: Vec<HistoryEntry>,
}

/// Free-to-use tracks the app ships with.
fn seed_catalogue() -> Vec<Song> {
    [
        ("Acoustic Breeze", "acousticbreeze"),
        ("Creative Minds", "creativeminds"),
        ("Sunny", "sunny"),
        ("Energy", "energy"),
        ("Jazz Frenchy", "jazzyfrenchy"),
        ("Once Again", "onceagain"),
        ("Ukulele", "ukulele"),
        ("Memories", "memories"),
        ("Buddy", "buddy"),
        ("Going Higher", "goinghigher"),
    ]
    .iter()
    .enumerate()
    .map(|(i, (title, slug))| Song {
        id: format!("s{}", i + 1),
        title: title.to_string(),
        artist: "Bensound".to_string(),
        file_url: format!("https://www.bensound.com/bensound-music/bensound-{slug}.mp3"),
        duration: None,
        play_count: 0,
    })
    .collect()
}

impl LocalDb {
    fn seeded() -> Self {
        Self {
            songs: seed_catalogue(),
            ..Default::default()
        }
    }

    fn issue_session(&mut self, user_id: &str, email: &str) -> Session {
        let now = now_millis();
        self.sessions
            .retain(|s| s.expires_at.saturating_add(REFRESH_TTL_MS) > now);

        let session = Session {
            user_id: user_id.to_string(),
            email: email.to_string(),
            access_token: utils::random_string(40),
            refresh_token: utils::random_string(40),
            expires_at: now + SESSION_TTL_MS,
        };
        self.sessions.push(session.clone());
        session
    }

    /// Rejects sessions this backend never issued or that have run out.
    fn authorize(&self, session: &Session) -> Result<()> {
        match self
            .sessions
            .iter()
            .find(|s| s.access_token == session.access_token && s.user_id == session.user_id)
        {
            Some(s) if now_millis() < s.expires_at => Ok(()),
            Some(_) => Err(Error::AuthExpired),
            None => Err(Error::NotSignedIn),
        }
    }

    fn song_exists(&self, song_id: &str) -> Result<()> {
        if self.songs.iter().any(|s| s.id == song_id) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("song {song_id}")))
        }
    }
}

/// In-process backend, optionally persisted to a JSON snapshot after each write.
pub struct LocalBackend {
    path: Option<PathBuf>,
    db: Mutex<LocalDb>,
    offline: AtomicBool,
}

impl LocalBackend {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            db: Mutex::new(LocalDb::seeded()),
            offline: AtomicBool::new(false),
        }
    }

    /// Loads the snapshot at `path`, or starts from the seeded catalogue.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let db = match async_fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LocalDb::seeded(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: Some(path),
            db: Mutex::new(db),
            offline: AtomicBool::new(false),
        })
    }

    /// Simulates losing connectivity: every call fails with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Sets or removes the role row of a user.
    pub async fn set_role(&self, user_id: &str, role: Option<Role>) -> Result<()> {
        let mut db = self.db.lock().await;
        match role {
            Some(role) => db.roles.insert(user_id.to_string(), role),
            None => db.roles.remove(user_id),
        };
        self.persist(&db).await
    }

    fn reachable(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("backend unreachable".to_string()));
        }
        Ok(())
    }

    async fn persist(&self, db: &LocalDb) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(db)?;
        async_fs::write(path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn sign_up(&self, request: &SignUp) -> Result<Session> {
        self.reachable()?;
        if request.password.len() < MIN_PASSWORD_LEN {
            return Err(Error::Auth(format!(
                "Password should be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let mut db = self.db.lock().await;
        let email = request.email.trim().to_lowercase();
        if db.accounts.iter().any(|a| a.email == email) {
            return Err(Error::Auth("User already registered".to_string()));
        }

        let user_id = format!("u-{}", utils::random_string(16).to_lowercase());
        db.accounts.push(Account {
            user_id: user_id.clone(),
            email: email.clone(),
            username: request.username.clone(),
            password_hash: utils::hash_password(&user_id, &request.password),
        });
        db.roles.insert(user_id.clone(), request.role);
        let session = db.issue_session(&user_id, &email);
        self.persist(&db).await?;
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.reachable()?;
        let mut db = self.db.lock().await;
        let email = email.trim().to_lowercase();
        let account = db
            .accounts
            .iter()
            .find(|a| a.email == email)
            .filter(|a| a.password_hash == utils::hash_password(&a.user_id, password))
            .cloned()
            .ok_or_else(|| Error::Auth("Invalid login credentials".to_string()))?;

        let session = db.issue_session(&account.user_id, &account.email);
        self.persist(&db).await?;
        Ok(session)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        self.reachable()?;
        let mut db = self.db.lock().await;
        let Some(pos) = db
            .sessions
            .iter()
            .position(|s| s.refresh_token == refresh_token)
        else {
            return Err(Error::AuthExpired);
        };
        let old = db.sessions.remove(pos);
        let session = db.issue_session(&old.user_id, &old.email);
        self.persist(&db).await?;
        Ok(session)
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        self.reachable()?;
        let mut db = self.db.lock().await;
        db.sessions
            .retain(|s| s.access_token != session.access_token);
        self.persist(&db).await
    }

    async fn fetch_role(&self, session: &Session) -> Result<Option<Role>> {
        self.reachable()?;
        let db = self.db.lock().await;
        db.authorize(session)?;
        Ok(db.roles.get(&session.user_id).copied())
    }

    async fn profile(&self, session: &Session) -> Result<Option<Profile>> {
        self.reachable()?;
        let db = self.db.lock().await;
        db.authorize(session)?;
        Ok(db
            .accounts
            .iter()
            .find(|a| a.user_id == session.user_id)
            .map(|a| Profile {
                user_id: a.user_id.clone(),
                username: a.username.clone(),
                email: a.email.clone(),
                role: db.roles.get(&a.user_id).copied().unwrap_or_default(),
            }))
    }

    async fn list_songs(&self) -> Result<Vec<Song>> {
        self.reachable()?;
        let db = self.db.lock().await;
        let mut songs = db.songs.clone();
        songs.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        Ok(songs)
    }

    async fn get_song(&self, song_id: &str) -> Result<Song> {
        self.reachable()?;
        let db = self.db.lock().await;
        db.songs
            .iter()
            .find(|s| s.id == song_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("song {song_id}")))
    }

    async fn increment_play_count(&self, song_id: &str) -> Result<u64> {
        self.reachable()?;
        let mut db = self.db.lock().await;
        let song = db
            .songs
            .iter_mut()
            .find(|s| s.id == song_id)
            .ok_or_else(|| Error::NotFound(format!("song {song_id}")))?;
        song.play_count += 1;
        let count = song.play_count;
        self.persist(&db).await?;
        Ok(count)
    }

    async fn liked_song_ids(&self, session: &Session) -> Result<Vec<String>> {
        self.reachable()?;
        let db = self.db.lock().await;
        db.authorize(session)?;
        Ok(db
            .likes
            .iter()
            .filter(|l| l.user_id == session.user_id)
            .map(|l| l.song_id.clone())
            .collect())
    }

    async fn insert_like(&self, session: &Session, song_id: &str) -> Result<()> {
        self.reachable()?;
        let mut db = self.db.lock().await;
        db.authorize(session)?;
        db.song_exists(song_id)?;
        let inserted = db.likes.insert(Like {
            user_id: session.user_id.clone(),
            song_id: song_id.to_string(),
        });
        if inserted {
            self.persist(&db).await?;
        }
        Ok(())
    }

    async fn delete_like(&self, session: &Session, song_id: &str) -> Result<()> {
        self.reachable()?;
        let mut db = self.db.lock().await;
        db.authorize(session)?;
        let removed = db.likes.remove(&Like {
            user_id: session.user_id.clone(),
            song_id: song_id.to_string(),
        });
        if removed {
            self.persist(&db).await?;
        }
        Ok(())
    }

    async fn list_playlists(&self, session: &Session) -> Result<Vec<Playlist>> {
        self.reachable()?;
        let db = self.db.lock().await;
        db.authorize(session)?;
        Ok(db
            .playlists
            .iter()
            .filter(|p| p.owner == session.user_id)
            .cloned()
            .collect())
    }

    async fn create_playlist(&self, session: &Session, name: &str) -> Result<Playlist> {
        self.reachable()?;
        let mut db = self.db.lock().await;
        db.authorize(session)?;
        let playlist = Playlist {
            id: format!("pl-{}", utils::random_string(8).to_lowercase()),
            owner: session.user_id.clone(),
            name: name.to_string(),
            track_ids: Vec::new(),
        };
        db.playlists.push(playlist.clone());
        self.persist(&db).await?;
        Ok(playlist)
    }

    async fn add_to_playlist(
        &self,
        session: &Session,
        playlist_id: &str,
        song_id: &str,
    ) -> Result<Playlist> {
        self.reachable()?;
        let mut db = self.db.lock().await;
        db.authorize(session)?;
        db.song_exists(song_id)?;
        let playlist = db
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id && p.owner == session.user_id)
            .ok_or_else(|| Error::NotFound(format!("playlist {playlist_id}")))?;

        if !playlist.track_ids.iter().any(|id| id == song_id) {
            playlist.track_ids.push(song_id.to_string());
        }
        let playlist = playlist.clone();
        self.persist(&db).await?;
        Ok(playlist)
    }

    async fn record_play(&self, session: &Session, song_id: &str) -> Result<()> {
        self.reachable()?;
        let mut db = self.db.lock().await;
        db.authorize(session)?;
        db.song_exists(song_id)?;

        db.history
            .retain(|h| !(h.user_id == session.user_id && h.song_id == song_id));
        db.history.insert(
            0,
            HistoryEntry {
                user_id: session.user_id.clone(),
                song_id: song_id.to_string(),
                played_at: Utc::now(),
            },
        );

        let mut kept = 0;
        db.history.retain(|h| {
            if h.user_id != session.user_id {
                return true;
            }
            kept += 1;
            kept <= HISTORY_LIMIT
        });

        self.persist(&db).await
    }

    async fn listening_history(
        &self,
        session: &Session,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>> {
        self.reachable()?;
        let db = self.db.lock().await;
        db.authorize(session)?;
        Ok(db
            .history
            .iter()
            .filter(|h| h.user_id == session.user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
