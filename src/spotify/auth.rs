use std::{sync::Arc, time::Duration};

use reqwest::{Client, StatusCode};
use tokio::sync::Mutex;

use crate::{
    Error, Result,
    config::SpotifyConfig,
    management::TokenManager,
    server::start_api_server,
    types::{OAuthErrorBody, PkceToken, Token, TokenResponse},
    utils, warning,
};

/// Client of the Spotify accounts service: builds the authorize redirect and
/// talks to the token endpoint.
#[derive(Clone)]
pub struct SpotifyOAuth {
    http: Client,
    config: SpotifyConfig,
}

impl SpotifyOAuth {
    pub fn new(config: SpotifyConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &SpotifyConfig {
        &self.config
    }

    /// Builds the authorization URL the user is sent to.
    ///
    /// Requests `response_type=code` with the configured scopes and redirect
    /// URI. `show_dialog=true` makes Spotify ask again even if the app was
    /// approved before, so the user can switch accounts. When a PKCE challenge
    /// is given it is attached with method `S256`.
    pub fn authorize_url(&self, state: Option<&str>, code_challenge: Option<&str>) -> String {
        let mut params = vec![
            ("client_id", self.config.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("scope", self.config.scope.as_str()),
            ("show_dialog", "true"),
        ];
        if let Some(state) = state {
            params.push(("state", state));
        }
        if let Some(challenge) = code_challenge {
            params.push(("code_challenge", challenge));
            params.push(("code_challenge_method", "S256"));
        }

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.config.auth_url, query)
    }

    /// Exchanges an authorization code for a token pair.
    ///
    /// # Arguments
    ///
    /// * `code` - Authorization code received on the redirect URI
    /// * `verifier` - PKCE code verifier, when the authorize request carried a challenge
    ///
    /// # Errors
    ///
    /// An invalid or reused code is reported as [`Error::Auth`]; other non-2xx
    /// answers as [`Error::UpstreamApi`].
    pub async fn exchange_code(&self, code: &str, verifier: Option<&str>) -> Result<Token> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        if let Some(verifier) = verifier {
            form.push(("code_verifier", verifier));
        }

        match self.token_request(form).await {
            Err(Error::AuthExpired) => Err(Error::Auth(
                "authorization code rejected by Spotify".to_string(),
            )),
            other => other.map(|grant| Token::from_grant(grant, None)),
        }
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// The returned token keeps `refresh_token` when Spotify does not rotate it.
    ///
    /// # Errors
    ///
    /// [`Error::AuthExpired`] when the refresh token itself is rejected; the
    /// user has to authorize again.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Token> {
        let grant = self
            .token_request(vec![
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;
        Ok(Token::from_grant(grant, Some(refresh_token)))
    }

    async fn token_request<'a>(
        &'a self,
        mut form: Vec<(&'a str, &'a str)>,
    ) -> Result<TokenResponse> {
        let mut request = self.http.post(&self.config.token_url);
        match &self.config.client_secret {
            Some(secret) => {
                request = request.basic_auth(&self.config.client_id, Some(secret));
            }
            None => form.push(("client_id", self.config.client_id.as_str())),
        }

        let res = request.form(&form).send().await?;
        let status = res.status();
        if status.is_success() {
            return Ok(res.json::<TokenResponse>().await?);
        }

        let body = res.text().await.unwrap_or_default();
        let parsed: OAuthErrorBody = serde_json::from_str(&body).unwrap_or_default();
        tracing::debug!(status = status.as_u16(), error = %parsed.error, "token endpoint rejected request");

        if matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED)
            && matches!(parsed.error.as_str(), "invalid_grant" | "invalid_request" | "")
        {
            return Err(Error::AuthExpired);
        }

        Err(Error::UpstreamApi {
            status: status.as_u16(),
            message: parsed
                .error_description
                .unwrap_or(if parsed.error.is_empty() { body } else { parsed.error }),
        })
    }
}

/// Runs the complete interactive OAuth 2.0 PKCE authorization with Spotify.
///
/// This function orchestrates the entire authorization process including:
/// 1. Generating PKCE code verifier and challenge
/// 2. Starting a local callback server
/// 3. Opening the authorization URL in the user's browser
/// 4. Waiting for the OAuth callback
/// 5. Persisting the obtained token for the signed-in user
///
/// # Arguments
///
/// * `oauth` - Accounts service client
/// * `server_addr` - Address of the local callback listener
/// * `tokens` - Token lifecycle manager the result is persisted through
/// * `user_id` - Backend user the Spotify account gets linked to
///
/// # Error Handling
///
/// - Browser launch failures result in a warning with manual URL instructions
/// - A callback that never arrives within 60 seconds is reported as [`Error::Auth`]
pub async fn authorize(
    oauth: SpotifyOAuth,
    server_addr: String,
    tokens: Arc<TokenManager>,
    user_id: &str,
) -> Result<Token> {
    let shared_state: Arc<Mutex<Option<PkceToken>>> = Arc::new(Mutex::new(None));

    // generate PKCE verifier and challenge
    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);

    // store verifier in shared state before redirect
    {
        let mut lock = shared_state.lock().await;
        *lock = Some(PkceToken {
            code_verifier,
            token: None,
        });
    }

    let server_state = Arc::clone(&shared_state);
    let server_oauth = oauth.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = start_api_server(&server_addr, server_state, server_oauth).await {
            warning!("Callback server stopped: {}", e);
        }
    });

    let auth_url = oauth.authorize_url(None, Some(&code_challenge));
    if webbrowser::open(&auth_url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    let token = wait_for_token(shared_state).await;
    server.abort();

    match token {
        Some(token) => {
            tokens.persist(user_id, &token).await?;
            Ok(token)
        }
        None => Err(Error::Auth(
            "Spotify authorization failed or timed out".to_string(),
        )),
    }
}

/// Polls the shared state for the token the callback handler stores, for at
/// most 60 seconds.
async fn wait_for_token(shared_state: Arc<Mutex<Option<PkceToken>>>) -> Option<Token> {
    use std::time::Instant;

    let max_wait = Duration::from_secs(60);
    let start = Instant::now();

    while start.elapsed() < max_wait {
        let lock = shared_state.lock().await;
        if let Some(token) = lock.as_ref().and_then(|p| p.token.as_ref()) {
            return Some(token.clone());
        }
        drop(lock);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SpotifyConfig {
        SpotifyConfig {
            client_id: "client-123".into(),
            client_secret: None,
            redirect_uri: "http://127.0.0.1:8888/callback".into(),
            scope: "streaming user-read-email".into(),
            auth_url: "https://accounts.spotify.com/authorize".into(),
            token_url: "https://accounts.spotify.com/api/token".into(),
            api_url: "https://api.spotify.com/v1".into(),
        }
    }

    #[test]
    fn test_authorize_url_contains_code_flow_params() {
        let url = SpotifyOAuth::new(config()).authorize_url(Some("xyz"), Some("challenge"));
        assert!(url.starts_with("https://accounts.spotify.com/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8888%2Fcallback"));
        assert!(url.contains("scope=streaming%20user-read-email"));
        assert!(url.contains("state=xyz"));
        assert!(url.contains("code_challenge=challenge"));
        assert!(url.contains("code_challenge_method=S256"));
    }

    #[test]
    fn test_authorize_url_without_pkce() {
        let url = SpotifyOAuth::new(config()).authorize_url(None, None);
        assert!(!url.contains("code_challenge"));
        assert!(!url.contains("state="));
        assert!(url.contains("show_dialog=true"));
    }
}
