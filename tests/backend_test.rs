mod common;

use std::sync::Arc;

use vibestream::{
    Error,
    backend::{Backend, LocalBackend},
    types::{Role, Session},
};

use common::sign_up_request;

async fn user(backend: &LocalBackend, email: &str) -> Session {
    backend
        .sign_up(&sign_up_request(email, Role::User))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_catalogue_is_sorted_by_title() {
    let backend = LocalBackend::in_memory();
    let songs = backend.list_songs().await.unwrap();
    assert_eq!(songs.len(), 10);
    let titles: Vec<_> = songs.iter().map(|s| s.title.to_lowercase()).collect();
    let mut sorted = titles.clone();
    sorted.sort();
    assert_eq!(titles, sorted);
}

#[tokio::test]
async fn test_sign_in_checks_password() {
    let backend = LocalBackend::in_memory();
    let created = user(&backend, "fan@vibestream.app").await;

    let session = backend
        .sign_in("FAN@vibestream.app", "hunter22")
        .await
        .unwrap();
    assert_eq!(session.user_id, created.user_id);

    let err = backend
        .sign_in("fan@vibestream.app", "nope-nope")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
}

#[tokio::test]
async fn test_short_password_is_rejected() {
    let backend = LocalBackend::in_memory();
    let mut request = sign_up_request("short@vibestream.app", Role::User);
    request.password = "12345".into();

    let err = backend.sign_up(&request).await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
}

#[tokio::test]
async fn test_profile_written_at_signup() {
    let backend = LocalBackend::in_memory();
    let session = backend
        .sign_up(&sign_up_request("boss@vibestream.app", Role::Admin))
        .await
        .unwrap();

    let profile = backend.profile(&session).await.unwrap().unwrap();
    assert_eq!(profile.username, "boss");
    assert_eq!(profile.role, Role::Admin);
    assert_eq!(backend.fetch_role(&session).await.unwrap(), Some(Role::Admin));
}

#[tokio::test]
async fn test_play_count_increments() {
    let backend = LocalBackend::in_memory();
    assert_eq!(backend.increment_play_count("s1").await.unwrap(), 1);
    assert_eq!(backend.increment_play_count("s1").await.unwrap(), 2);
    assert_eq!(backend.get_song("s1").await.unwrap().play_count, 2);

    let err = backend.increment_play_count("s999").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_history_is_deduplicated_newest_first() {
    let backend = LocalBackend::in_memory();
    let session = user(&backend, "dj@vibestream.app").await;

    for id in ["s1", "s2", "s3", "s1"] {
        backend.record_play(&session, id).await.unwrap();
    }

    let history = backend.listening_history(&session, 50).await.unwrap();
    let ids: Vec<_> = history.iter().map(|h| h.song_id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "s3", "s2"]);

    let limited = backend.listening_history(&session, 2).await.unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn test_history_is_per_user() {
    let backend = LocalBackend::in_memory();
    let alice = user(&backend, "alice@vibestream.app").await;
    let bob = user(&backend, "bob@vibestream.app").await;

    backend.record_play(&alice, "s1").await.unwrap();
    assert!(backend.listening_history(&bob, 50).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_like_is_idempotent() {
    let backend = LocalBackend::in_memory();
    let session = user(&backend, "fan@vibestream.app").await;

    backend.insert_like(&session, "s2").await.unwrap();
    backend.insert_like(&session, "s2").await.unwrap();
    assert_eq!(backend.liked_song_ids(&session).await.unwrap(), vec!["s2"]);

    backend.delete_like(&session, "s2").await.unwrap();
    backend.delete_like(&session, "s2").await.unwrap();
    assert!(backend.liked_song_ids(&session).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_playlist_ignores_duplicate_tracks() {
    let backend = LocalBackend::in_memory();
    let session = user(&backend, "curator@vibestream.app").await;

    let playlist = backend.create_playlist(&session, "Chill Vibes").await.unwrap();
    assert_eq!(playlist.owner, session.user_id);
    assert!(playlist.track_ids.is_empty());

    backend
        .add_to_playlist(&session, &playlist.id, "s1")
        .await
        .unwrap();
    backend
        .add_to_playlist(&session, &playlist.id, "s2")
        .await
        .unwrap();
    let updated = backend
        .add_to_playlist(&session, &playlist.id, "s1")
        .await
        .unwrap();
    assert_eq!(updated.track_ids, vec!["s1", "s2"]);

    let listed = backend.list_playlists(&session).await.unwrap();
    assert_eq!(listed, vec![updated]);
}

#[tokio::test]
async fn test_playlists_are_owner_scoped() {
    let backend = LocalBackend::in_memory();
    let alice = user(&backend, "alice@vibestream.app").await;
    let bob = user(&backend, "bob@vibestream.app").await;

    let playlist = backend.create_playlist(&alice, "Mine").await.unwrap();
    assert!(backend.list_playlists(&bob).await.unwrap().is_empty());

    let err = backend
        .add_to_playlist(&bob, &playlist.id, "s1")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_signed_out_session_is_rejected() {
    let backend = LocalBackend::in_memory();
    let session = user(&backend, "gone@vibestream.app").await;
    backend.sign_out(&session).await.unwrap();

    let err = backend.list_playlists(&session).await.unwrap_err();
    assert!(matches!(err, Error::NotSignedIn));
}

#[tokio::test]
async fn test_offline_backend_fails_with_network_error() {
    let backend = LocalBackend::in_memory();
    backend.set_offline(true);
    assert!(matches!(
        backend.list_songs().await.unwrap_err(),
        Error::Network(_)
    ));

    backend.set_offline(false);
    assert!(backend.list_songs().await.is_ok());
}

#[tokio::test]
async fn test_snapshot_survives_reopen() {
    let dir = std::env::temp_dir().join(format!("vibestream-backend-{}", std::process::id()));
    let path = dir.join("local-backend.json");
    let _ = std::fs::remove_dir_all(&dir);

    let session = {
        let backend = LocalBackend::open(path.clone()).await.unwrap();
        let session = user(&backend, "persist@vibestream.app").await;
        backend.insert_like(&session, "s7").await.unwrap();
        backend.increment_play_count("s7").await.unwrap();
        session
    };

    let reopened: Arc<dyn Backend> = Arc::new(LocalBackend::open(path).await.unwrap());
    assert_eq!(reopened.liked_song_ids(&session).await.unwrap(), vec!["s7"]);
    assert_eq!(reopened.get_song("s7").await.unwrap().play_count, 1);

    let _ = std::fs::remove_dir_all(dir);
}
