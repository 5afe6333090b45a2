mod common;

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Value, json};

use vibestream::{
    Error,
    management::{MemoryTokenStore, TokenManager, TokenStore},
    session::{AuthState, SessionStore},
    spotify::{SpotifyClient, SpotifyOAuth},
    types::{Role, Token, now_millis},
};

use common::{signed_in_store, spawn_upstream, spotify_config};

#[derive(Default)]
struct FakeSpotify {
    refreshes: AtomicUsize,
    reject_refresh: bool,
    api_calls: AtomicUsize,
    bearers: Mutex<Vec<String>>,
}

async fn token_endpoint(
    State(fake): State<Arc<FakeSpotify>>,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if form.get("grant_type").map(String::as_str) != Some("refresh_token") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "unsupported_grant_type"})),
        );
    }
    if fake.reject_refresh {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": "Refresh token revoked"})),
        );
    }

    // widen the window in which concurrent callers could race
    tokio::time::sleep(Duration::from_millis(50)).await;
    let n = fake.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
    (
        StatusCode::OK,
        Json(json!({
            "access_token": format!("fresh-{n}"),
            "token_type": "Bearer",
            "scope": "streaming",
            "expires_in": 3600
        })),
    )
}

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .trim_start_matches("Bearer ")
        .to_string()
}

async fn playlists_endpoint(
    State(fake): State<Arc<FakeSpotify>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    fake.api_calls.fetch_add(1, Ordering::SeqCst);
    let token = bearer(&headers);
    fake.bearers.lock().unwrap().push(token.clone());

    if !token.starts_with("fresh-") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"status": 401, "message": "The access token expired"}})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "items": [
                {"id": "p1", "name": "Road trip", "collaborative": false, "tracks": {"total": 3}}
            ],
            "total": 1
        })),
    )
}

async fn search_endpoint(
    State(fake): State<Arc<FakeSpotify>>,
    headers: HeaderMap,
) -> Json<Value> {
    fake.bearers.lock().unwrap().push(bearer(&headers));
    Json(json!({
        "tracks": {
            "items": [{
                "id": "t1",
                "name": "Sunny",
                "uri": "spotify:track:t1",
                "duration_ms": 140000,
                "artists": [{"id": "a1", "name": "Bensound"}]
            }]
        }
    }))
}

async fn play_endpoint() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": {"status": 404, "message": "Device not found"}})),
    )
}

async fn fake_spotify(fake: Arc<FakeSpotify>) -> String {
    let app = Router::new()
        .route("/api/token", post(token_endpoint))
        .route("/v1/me/playlists", get(playlists_endpoint))
        .route("/v1/search", get(search_endpoint))
        .route("/v1/me/player/play", put(play_endpoint))
        .with_state(fake);
    spawn_upstream(app).await
}

fn token(access: &str, expires_at: i64) -> Token {
    Token {
        access_token: access.into(),
        refresh_token: "refresh-1".into(),
        scope: "streaming".into(),
        expires_at,
    }
}

fn expired(access: &str) -> Token {
    token(access, now_millis() - 1_000)
}

fn manager(base_url: &str, store: Arc<MemoryTokenStore>) -> Arc<TokenManager> {
    Arc::new(TokenManager::new(
        store,
        SpotifyOAuth::new(spotify_config(base_url)),
    ))
}

async fn client_for(
    base_url: &str,
    store: Arc<MemoryTokenStore>,
) -> (SpotifyClient, SessionStore, String) {
    let (_backend, session) = signed_in_store(Role::User).await;
    let user_id = session.user_id().unwrap();
    let client = SpotifyClient::new(
        &format!("{base_url}/v1"),
        manager(base_url, store),
        session.clone(),
    );
    (client, session, user_id)
}

#[tokio::test]
async fn test_valid_token_is_returned_without_refresh() {
    let fake = Arc::new(FakeSpotify::default());
    let base = fake_spotify(fake.clone()).await;
    let store = Arc::new(MemoryTokenStore::new());
    store
        .save("u1", &token("still-good", now_millis() + 3_600_000))
        .await
        .unwrap();

    let token = manager(&base, store).get_valid_token("u1").await.unwrap();
    assert_eq!(token.access_token, "still-good");
    assert_eq!(fake.refreshes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_token_inside_leeway_is_refreshed() {
    let fake = Arc::new(FakeSpotify::default());
    let base = fake_spotify(fake.clone()).await;
    let store = Arc::new(MemoryTokenStore::new());
    // expires in one minute, well inside the four minute leeway
    store
        .save("u1", &token("almost", now_millis() + 60_000))
        .await
        .unwrap();

    let token = manager(&base, store.clone())
        .get_valid_token("u1")
        .await
        .unwrap();
    assert_eq!(token.access_token, "fresh-1");
    // upstream omitted the refresh token, the old one stays
    assert_eq!(token.refresh_token, "refresh-1");
    assert_eq!(store.load("u1").await.unwrap(), Some(token));
}

/// Token endpoint of a confidential client: credentials travel in the basic
/// auth header and never in the form.
async fn confidential_token_endpoint(
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let expected = format!("Basic {}", STANDARD.encode("test-client:s3cret"));
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str());
    if !authorized || form.contains_key("client_id") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid_client", "error_description": "Invalid client"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "access_token": "confidential-at",
            "refresh_token": "rotated-rt",
            "scope": "streaming",
            "expires_in": 3600
        })),
    )
}

#[tokio::test]
async fn test_refresh_with_client_secret_uses_basic_auth() {
    let base = spawn_upstream(
        Router::new().route("/api/token", post(confidential_token_endpoint)),
    )
    .await;
    let mut config = spotify_config(&base);
    config.client_secret = Some("s3cret".into());
    let store = Arc::new(MemoryTokenStore::new());
    store.save("u1", &expired("stale")).await.unwrap();
    let manager = TokenManager::new(store.clone(), SpotifyOAuth::new(config));

    let token = manager.get_valid_token("u1").await.unwrap();
    assert_eq!(token.access_token, "confidential-at");
    assert_eq!(token.refresh_token, "rotated-rt");
    assert_eq!(store.load("u1").await.unwrap(), Some(token));
}

#[tokio::test]
async fn test_unlinked_user_is_reported() {
    let fake = Arc::new(FakeSpotify::default());
    let base = fake_spotify(fake).await;
    let manager = manager(&base, Arc::new(MemoryTokenStore::new()));

    let err = manager.get_valid_token("nobody").await.unwrap_err();
    assert!(matches!(err, Error::SpotifyNotLinked));
}

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let fake = Arc::new(FakeSpotify::default());
    let base = fake_spotify(fake.clone()).await;
    let store = Arc::new(MemoryTokenStore::new());
    store.save("u1", &expired("stale")).await.unwrap();
    let manager = manager(&base, store);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.get_valid_token("u1").await })
        })
        .collect();

    for handle in handles {
        let token = handle.await.unwrap().unwrap();
        assert_eq!(token.access_token, "fresh-1");
    }
    assert_eq!(fake.refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_different_users_refresh_independently() {
    let fake = Arc::new(FakeSpotify::default());
    let base = fake_spotify(fake.clone()).await;
    let store = Arc::new(MemoryTokenStore::new());
    store.save("u1", &expired("stale-1")).await.unwrap();
    store.save("u2", &expired("stale-2")).await.unwrap();
    let manager = manager(&base, store);

    let (a, b) = tokio::join!(manager.get_valid_token("u1"), manager.get_valid_token("u2"));
    assert_ne!(a.unwrap().access_token, b.unwrap().access_token);
    assert_eq!(fake.refreshes.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_expired_token_is_never_sent() {
    let fake = Arc::new(FakeSpotify::default());
    let base = fake_spotify(fake.clone()).await;
    let store = Arc::new(MemoryTokenStore::new());
    let (client, _session, user_id) = client_for(&base, store.clone()).await;
    store.save(&user_id, &expired("stale")).await.unwrap();

    let tracks = client.search("sunny", 5).await.unwrap();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].artist_names(), "Bensound");

    assert_eq!(*fake.bearers.lock().unwrap(), vec!["fresh-1".to_string()]);
    assert_eq!(fake.refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unauthorized_response_refreshes_and_retries_once() {
    let fake = Arc::new(FakeSpotify::default());
    let base = fake_spotify(fake.clone()).await;
    let store = Arc::new(MemoryTokenStore::new());
    let (client, _session, user_id) = client_for(&base, store.clone()).await;
    // looks valid locally but upstream has revoked it
    store
        .save(&user_id, &token("revoked", now_millis() + 3_600_000))
        .await
        .unwrap();

    let playlists = client.my_playlists(20).await.unwrap();
    assert_eq!(playlists.len(), 1);
    assert_eq!(playlists[0].name, "Road trip");

    assert_eq!(fake.api_calls.load(Ordering::SeqCst), 2);
    assert_eq!(fake.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(
        *fake.bearers.lock().unwrap(),
        vec!["revoked".to_string(), "fresh-1".to_string()]
    );
}

#[tokio::test]
async fn test_rejected_refresh_clears_token_and_signs_out() {
    let fake = Arc::new(FakeSpotify {
        reject_refresh: true,
        ..Default::default()
    });
    let base = fake_spotify(fake.clone()).await;
    let store = Arc::new(MemoryTokenStore::new());
    let (client, session, user_id) = client_for(&base, store.clone()).await;
    store.save(&user_id, &expired("stale")).await.unwrap();

    let err = client.my_playlists(20).await.unwrap_err();
    assert!(matches!(err, Error::AuthExpired));
    assert!(err.requires_reauth());

    assert_eq!(store.load(&user_id).await.unwrap(), None);
    assert_eq!(session.current(), AuthState::SignedOut);
    assert_eq!(fake.api_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upstream_error_message_is_surfaced() {
    let fake = Arc::new(FakeSpotify::default());
    let base = fake_spotify(fake).await;
    let store = Arc::new(MemoryTokenStore::new());
    let (client, session, user_id) = client_for(&base, store.clone()).await;
    store
        .save(&user_id, &token("fresh-0", now_millis() + 3_600_000))
        .await
        .unwrap();

    let err = client
        .play(Some("kitchen"), &["spotify:track:t1".to_string()])
        .await
        .unwrap_err();
    match err {
        Error::UpstreamApi { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Device not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // plain upstream failures leave the session alone
    assert!(session.session().is_some());
}

#[tokio::test]
async fn test_calls_require_a_signed_in_user() {
    let fake = Arc::new(FakeSpotify::default());
    let base = fake_spotify(fake).await;
    let (client, session, _user_id) = client_for(&base, Arc::new(MemoryTokenStore::new())).await;
    session.sign_out().await;

    let err = client.recently_played(10).await.unwrap_err();
    assert!(matches!(err, Error::NotSignedIn));
}
