use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::{
    Error, Result,
    types::{HistoryEntry, Playlist, Profile, Role, Session, SignUp, Song, now_millis},
};

use super::{Backend, HISTORY_LIMIT};

/// Hosted backend speaking GoTrue (`/auth/v1`) and PostgREST (`/rest/v1`).
#[derive(Clone)]
pub struct RestBackend {
    http: Client,
    base_url: String,
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct GoTrueSession {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Epoch seconds.
    #[serde(default)]
    expires_at: Option<i64>,
    user: GoTrueUser,
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<GoTrueSession> for Session {
    fn from(s: GoTrueSession) -> Self {
        let expires_at = match (s.expires_at, s.expires_in) {
            (Some(at), _) => at * 1000,
            (None, Some(secs)) => now_millis() + secs * 1000,
            (None, None) => now_millis() + 3_600_000,
        };
        Session {
            user_id: s.user.id,
            email: s.user.email.unwrap_or_default(),
            access_token: s.access_token,
            refresh_token: s.refresh_token,
            expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RoleRow {
    role: String,
}

#[derive(Debug, Deserialize)]
struct LikeRow {
    song_id: String,
}

/// Picks the human readable part of a GoTrue/PostgREST error body.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

async fn check(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(Error::UpstreamApi {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

async fn rows<T: DeserializeOwned>(res: Response) -> Result<Vec<T>> {
    let res = check(res).await?;
    Ok(res.json::<Vec<T>>().await?)
}

impl RestBackend {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    fn request(&self, method: Method, url: String, bearer: Option<&str>) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
    }

    fn table(&self, method: Method, table: &str, session: Option<&Session>) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        tracing::debug!(method = method.as_str(), table, "backend request");
        self.request(method, url, session.map(|s| s.access_token.as_str()))
    }

    async fn auth_call(&self, path: &str, body: Value) -> Result<Session> {
        let url = format!("{}/auth/v1/{}", self.base_url, path);
        let res = self.request(Method::POST, url, None).json(&body).send().await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(auth_error(status, &body));
        }

        let value: Value = serde_json::from_str(&body)?;
        if value.get("access_token").is_none() {
            return Err(Error::Auth(
                "account created, confirm the email address before signing in".to_string(),
            ));
        }
        let session: GoTrueSession = serde_json::from_value(value)?;
        Ok(session.into())
    }
}

/// GoTrue answers a rejected credential or invalid input with 400, 401 or
/// 422. Anything else (rate limits, outages) is an upstream failure and
/// says nothing about the credential.
fn auth_error(status: StatusCode, body: &str) -> Error {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY => {
            Error::Auth(error_message(body))
        }
        _ => Error::UpstreamApi {
            status: status.as_u16(),
            message: error_message(body),
        },
    }
}

#[async_trait]
impl Backend for RestBackend {
    async fn sign_up(&self, request: &SignUp) -> Result<Session> {
        let session = self
            .auth_call(
                "signup",
                json!({
                    "email": request.email,
                    "password": request.password,
                    "data": { "username": request.username },
                }),
            )
            .await?;

        check(
            self.table(Method::POST, "user_roles", Some(&session))
                .header("Prefer", "return=minimal")
                .json(&json!({ "user_id": session.user_id, "role": request.role }))
                .send()
                .await?,
        )
        .await?;

        check(
            self.table(Method::POST, "profiles", Some(&session))
                .header("Prefer", "return=minimal")
                .json(&json!({
                    "user_id": session.user_id,
                    "username": request.username,
                    "email": request.email,
                    "role": request.role,
                }))
                .send()
                .await?,
        )
        .await?;

        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.auth_call(
            "token?grant_type=password",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        self.auth_call(
            "token?grant_type=refresh_token",
            json!({ "refresh_token": refresh_token }),
        )
        .await
        .map_err(|e| match e {
            Error::Auth(_) => Error::AuthExpired,
            other => other,
        })
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        let url = format!("{}/auth/v1/logout", self.base_url);
        check(
            self.request(Method::POST, url, Some(&session.access_token))
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }

    async fn fetch_role(&self, session: &Session) -> Result<Option<Role>> {
        let res = self
            .table(Method::GET, "user_roles", Some(session))
            .query(&[
                ("select", "role".to_string()),
                ("user_id", format!("eq.{}", session.user_id)),
            ])
            .send()
            .await?;
        let roles: Vec<RoleRow> = rows(res).await?;
        Ok(roles.first().map(|r| Role::from_row(&r.role)))
    }

    async fn profile(&self, session: &Session) -> Result<Option<Profile>> {
        let res = self
            .table(Method::GET, "profiles", Some(session))
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", session.user_id)),
            ])
            .send()
            .await?;
        let profiles: Vec<Profile> = rows(res).await?;
        Ok(profiles.into_iter().next())
    }

    async fn list_songs(&self) -> Result<Vec<Song>> {
        let res = self
            .table(Method::GET, "songs", None)
            .query(&[("select", "*"), ("order", "title.asc")])
            .send()
            .await?;
        rows(res).await
    }

    async fn get_song(&self, song_id: &str) -> Result<Song> {
        let res = self
            .table(Method::GET, "songs", None)
            .query(&[("select", "*".to_string()), ("id", format!("eq.{song_id}"))])
            .send()
            .await?;
        let songs: Vec<Song> = rows(res).await?;
        songs
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("song {song_id}")))
    }

    async fn increment_play_count(&self, song_id: &str) -> Result<u64> {
        let url = format!("{}/rest/v1/rpc/increment_play_count", self.base_url);
        let res = self
            .request(Method::POST, url, None)
            .json(&json!({ "song_id": song_id }))
            .send()
            .await?;
        let value: Value = check(res).await?.json().await?;
        Ok(value.as_u64().unwrap_or_default())
    }

    async fn liked_song_ids(&self, session: &Session) -> Result<Vec<String>> {
        let res = self
            .table(Method::GET, "user_likes", Some(session))
            .query(&[
                ("select", "song_id".to_string()),
                ("user_id", format!("eq.{}", session.user_id)),
            ])
            .send()
            .await?;
        let likes: Vec<LikeRow> = rows(res).await?;
        Ok(likes.into_iter().map(|l| l.song_id).collect())
    }

    async fn insert_like(&self, session: &Session, song_id: &str) -> Result<()> {
        let res = self
            .table(Method::POST, "user_likes", Some(session))
            .query(&[("on_conflict", "user_id,song_id")])
            .header("Prefer", "resolution=ignore-duplicates,return=minimal")
            .json(&json!({ "user_id": session.user_id, "song_id": song_id }))
            .send()
            .await?;
        check(res).await?;
        Ok(())
    }

    async fn delete_like(&self, session: &Session, song_id: &str) -> Result<()> {
        let res = self
            .table(Method::DELETE, "user_likes", Some(session))
            .query(&[
                ("user_id", format!("eq.{}", session.user_id)),
                ("song_id", format!("eq.{song_id}")),
            ])
            .send()
            .await?;
        check(res).await?;
        Ok(())
    }

    async fn list_playlists(&self, session: &Session) -> Result<Vec<Playlist>> {
        let res = self
            .table(Method::GET, "playlists", Some(session))
            .query(&[
                ("select", "id,user_id,name,track_ids".to_string()),
                ("user_id", format!("eq.{}", session.user_id)),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;
        rows(res).await
    }

    async fn create_playlist(&self, session: &Session, name: &str) -> Result<Playlist> {
        let res = self
            .table(Method::POST, "playlists", Some(session))
            .query(&[("select", "id,user_id,name,track_ids")])
            .header("Prefer", "return=representation")
            .json(&json!({
                "user_id": session.user_id,
                "name": name,
                "track_ids": [],
            }))
            .send()
            .await?;
        let created: Vec<Playlist> = rows(res).await?;
        created.into_iter().next().ok_or_else(|| Error::UpstreamApi {
            status: 200,
            message: "playlist insert returned no row".to_string(),
        })
    }

    async fn add_to_playlist(
        &self,
        session: &Session,
        playlist_id: &str,
        song_id: &str,
    ) -> Result<Playlist> {
        let owner_filter = [
            ("id", format!("eq.{playlist_id}")),
            ("user_id", format!("eq.{}", session.user_id)),
        ];

        let res = self
            .table(Method::GET, "playlists", Some(session))
            .query(&[("select", "id,user_id,name,track_ids")])
            .query(&owner_filter)
            .send()
            .await?;
        let mut playlist = rows::<Playlist>(res)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("playlist {playlist_id}")))?;

        if playlist.track_ids.iter().any(|id| id == song_id) {
            return Ok(playlist);
        }
        playlist.track_ids.push(song_id.to_string());

        let res = self
            .table(Method::PATCH, "playlists", Some(session))
            .query(&[("select", "id,user_id,name,track_ids")])
            .query(&owner_filter)
            .header("Prefer", "return=representation")
            .json(&json!({ "track_ids": playlist.track_ids }))
            .send()
            .await?;
        let updated: Vec<Playlist> = rows(res).await?;
        Ok(updated.into_iter().next().unwrap_or(playlist))
    }

    async fn record_play(&self, session: &Session, song_id: &str) -> Result<()> {
        let res = self
            .table(Method::POST, "listening_history", Some(session))
            .header("Prefer", "return=minimal")
            .json(&json!({
                "user_id": session.user_id,
                "song_id": song_id,
                "played_at": Utc::now(),
            }))
            .send()
            .await?;
        check(res).await?;
        Ok(())
    }

    async fn listening_history(
        &self,
        session: &Session,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>> {
        let limit = limit.min(HISTORY_LIMIT);
        let res = self
            .table(Method::GET, "listening_history", Some(session))
            .query(&[
                ("select", "user_id,song_id,played_at".to_string()),
                ("user_id", format!("eq.{}", session.user_id)),
                ("order", "played_at.desc".to_string()),
                ("limit", limit.saturating_mul(4).to_string()),
            ])
            .send()
            .await?;

        // rows are append-only; keep the newest play of each song
        let mut seen = HashSet::new();
        let mut entries: Vec<HistoryEntry> = rows(res).await?;
        entries.retain(|e| seen.insert(e.song_id.clone()));
        entries.truncate(limit);
        Ok(entries)
    }
}
