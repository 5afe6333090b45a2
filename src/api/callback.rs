use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query, http::StatusCode, response::Html};
use tokio::sync::Mutex;

use crate::{spotify::SpotifyOAuth, types::PkceToken, warning};

/// Redirect target of the Spotify authorization.
///
/// Spotify sends either `code` or `error` (e.g. `access_denied` when the user
/// declines). A code is exchanged together with the stored PKCE verifier and
/// the token is placed in the shared state for the waiting authorize flow.
pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(shared_state): Extension<Arc<Mutex<Option<PkceToken>>>>,
    Extension(oauth): Extension<SpotifyOAuth>,
) -> (StatusCode, Html<&'static str>) {
    if let Some(error) = params.get("error") {
        warning!("Spotify authorization was denied: {}", error);
        return (
            StatusCode::BAD_REQUEST,
            Html("<h4>Authorization denied.</h4><p>You can close this window.</p>"),
        );
    }

    let Some(code) = params.get("code") else {
        return (
            StatusCode::BAD_REQUEST,
            Html("<h4>Missing authorization code.</h4>"),
        );
    };

    let mut state = shared_state.lock().await;
    let Some(pkce_state) = state.as_mut() else {
        return (
            StatusCode::BAD_REQUEST,
            Html("<h4>Missing PKCE code verifier.</h4>"),
        );
    };

    match oauth
        .exchange_code(code, Some(&pkce_state.code_verifier))
        .await
    {
        Ok(token) => {
            pkce_state.token = Some(token);
            (
                StatusCode::OK,
                Html("<h2>Spotify linked.</h2><p>You can close this window.</p>"),
            )
        }
        Err(e) => {
            warning!("Token exchange failed: {}", e);
            (StatusCode::BAD_GATEWAY, Html("<h4>Login failed.</h4>"))
        }
    }
}
