use std::sync::Arc;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    Error, Result,
    management::TokenManager,
    session::SessionStore,
    types::{
        ApiErrorBody, Paging, PlayHistory, PlayRequest, SearchResponse, SimplifiedPlaylist, Track,
    },
};

/// Spotify Web API client acting on behalf of the signed-in user.
///
/// Every request takes its bearer token from [`TokenManager::get_valid_token`],
/// so an expired token is refreshed before it is sent. If Spotify still
/// answers `401 Unauthorized` the token is force-refreshed and the request is
/// retried once.
#[derive(Clone)]
pub struct SpotifyClient {
    http: Client,
    api_url: String,
    tokens: Arc<TokenManager>,
    session: SessionStore,
}

impl SpotifyClient {
    pub fn new(api_url: &str, tokens: Arc<TokenManager>, session: SessionStore) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            tokens,
            session,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Searches the Spotify catalogue for tracks.
    ///
    /// # Arguments
    ///
    /// * `query` - Free-text search query
    /// * `limit` - Maximum number of tracks (Spotify caps this at 50)
    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<Track>> {
        let url = format!(
            "{}/search?q={}&type=track&limit={}",
            self.api_url,
            urlencoding::encode(query),
            limit.clamp(1, 50)
        );
        let res = self.send(|token| self.http.get(&url).bearer_auth(token)).await?;
        let body: SearchResponse = json(res).await?;
        Ok(body.tracks.map(|page| page.items).unwrap_or_default())
    }

    pub async fn my_playlists(&self, limit: u32) -> Result<Vec<SimplifiedPlaylist>> {
        let url = format!("{}/me/playlists?limit={}", self.api_url, limit.clamp(1, 50));
        let res = self.send(|token| self.http.get(&url).bearer_auth(token)).await?;
        let page: Paging<SimplifiedPlaylist> = json(res).await?;
        Ok(page.items)
    }

    /// Newest first, as Spotify returns them.
    pub async fn recently_played(&self, limit: u32) -> Result<Vec<PlayHistory>> {
        let url = format!(
            "{}/me/player/recently-played?limit={}",
            self.api_url,
            limit.clamp(1, 50)
        );
        let res = self.send(|token| self.http.get(&url).bearer_auth(token)).await?;
        let page: Paging<PlayHistory> = json(res).await?;
        Ok(page.items)
    }

    /// Starts playback of `uris` on the given device, or on the user's
    /// active device when `device_id` is `None`.
    pub async fn play(&self, device_id: Option<&str>, uris: &[String]) -> Result<()> {
        let mut url = format!("{}/me/player/play", self.api_url);
        if let Some(device_id) = device_id {
            url.push_str(&format!("?device_id={}", urlencoding::encode(device_id)));
        }
        let body = PlayRequest {
            uris: uris.to_vec(),
        };
        self.send(|token| self.http.put(&url).bearer_auth(token).json(&body))
            .await?;
        Ok(())
    }

    /// Sends the request built by `build` for the current user. A rejected
    /// Spotify authorization signs the session out.
    async fn send<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let user_id = self.session.user_id().ok_or(Error::NotSignedIn)?;
        let result = self.send_as(&user_id, build).await;
        if matches!(result, Err(Error::AuthExpired)) {
            self.session.expire();
        }
        result
    }

    async fn send_as<F>(&self, user_id: &str, build: F) -> Result<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.tokens.get_valid_token(user_id).await?;
        let res = build(&token.access_token).send().await?;
        if res.status() != StatusCode::UNAUTHORIZED {
            return check(res).await;
        }

        tracing::debug!(user_id, "spotify rejected access token, refreshing once");
        let fresh = self
            .tokens
            .force_refresh(user_id, &token.access_token)
            .await?;
        let res = build(&fresh.access_token).send().await?;
        check(res).await
    }
}

async fn check(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or(body);
    Err(Error::UpstreamApi {
        status: status.as_u16(),
        message,
    })
}

async fn json<T: DeserializeOwned>(res: Response) -> Result<T> {
    Ok(res.json::<T>().await?)
}
