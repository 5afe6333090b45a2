use tabled::Table;

use crate::{Result, app::App, info, success, types::PlaylistTableRow};

pub async fn list(app: &App) -> Result<()> {
    let session = app.session.require_session()?;
    let playlists = app.backend().list_playlists(&session).await?;
    if playlists.is_empty() {
        info!("No playlists yet. Create one with `vibestream playlists create <name>`.");
        return Ok(());
    }

    let rows: Vec<PlaylistTableRow> = playlists
        .into_iter()
        .map(|p| PlaylistTableRow {
            id: p.id,
            name: p.name,
            tracks: p.track_ids.len(),
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}

pub async fn create(app: &App, name: &str) -> Result<()> {
    let session = app.session.require_session()?;
    let playlist = app.backend().create_playlist(&session, name).await?;
    success!("Created playlist '{}' ({})", playlist.name, playlist.id);
    Ok(())
}

pub async fn add(app: &App, playlist_id: &str, song_id: &str) -> Result<()> {
    let session = app.session.require_session()?;
    let before = app
        .backend()
        .list_playlists(&session)
        .await?
        .into_iter()
        .find(|p| p.id == playlist_id)
        .map(|p| p.track_ids.len());

    let playlist = app
        .backend()
        .add_to_playlist(&session, playlist_id, song_id)
        .await?;
    if before == Some(playlist.track_ids.len()) {
        info!("{} is already on '{}'", song_id, playlist.name);
    } else {
        success!(
            "Added {} to '{}' ({} tracks)",
            song_id,
            playlist.name,
            playlist.track_ids.len()
        );
    }
    Ok(())
}
