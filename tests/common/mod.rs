#![allow(dead_code)]

use std::sync::Arc;

use vibestream::{
    backend::{Backend, LocalBackend},
    config::SpotifyConfig,
    session::SessionStore,
    types::{Role, SignUp},
};

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn spawn_upstream(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn spotify_config(base_url: &str) -> SpotifyConfig {
    SpotifyConfig {
        client_id: "test-client".into(),
        client_secret: None,
        redirect_uri: "http://127.0.0.1:8888/callback".into(),
        scope: "streaming".into(),
        auth_url: format!("{base_url}/authorize"),
        token_url: format!("{base_url}/api/token"),
        api_url: format!("{base_url}/v1"),
    }
}

pub fn sign_up_request(email: &str, role: Role) -> SignUp {
    SignUp {
        email: email.into(),
        password: "hunter22".into(),
        username: email.split('@').next().unwrap_or_default().into(),
        role,
    }
}

/// Session store over a fresh local backend with one signed-in user.
pub async fn signed_in_store(role: Role) -> (Arc<LocalBackend>, SessionStore) {
    let backend = Arc::new(LocalBackend::in_memory());
    let store = SessionStore::new(backend.clone() as Arc<dyn Backend>);
    store
        .sign_up(&sign_up_request("listener@vibestream.app", role))
        .await
        .unwrap();
    (backend, store)
}
