use tabled::Table;

use crate::{
    Result,
    app::App,
    info,
    spotify::auth,
    success,
    types::{PlaylistTableRow, TrackTableRow},
    utils,
};

/// Links the signed-in user with a Spotify account.
pub async fn link(app: &App) -> Result<()> {
    let session = app.session.require_session()?;
    let tokens = app.tokens()?;

    info!("Opening Spotify authorization in your browser...");
    auth::authorize(
        tokens.oauth().clone(),
        app.config.server_addr.clone(),
        tokens.clone(),
        &session.user_id,
    )
    .await?;
    success!("Spotify account linked.");
    Ok(())
}

pub async fn unlink(app: &App) -> Result<()> {
    let session = app.session.require_session()?;
    app.tokens()?.clear(&session.user_id).await?;
    success!("Spotify account unlinked.");
    Ok(())
}

pub async fn search(app: &App, query: &str, limit: u32) -> Result<()> {
    let client = app.spotify()?;
    let pb = super::spinner("Searching Spotify...");
    let result = client.search(query, limit).await;
    pb.finish_and_clear();
    let tracks = app.after_call(result).await?;

    if tracks.is_empty() {
        info!("No tracks found for '{}'", query);
        return Ok(());
    }

    let rows: Vec<TrackTableRow> = tracks
        .into_iter()
        .map(|t| TrackTableRow {
            artists: t.artist_names(),
            duration: utils::format_duration_ms(t.duration_ms),
            name: t.name,
            uri: t.uri,
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}

pub async fn playlists(app: &App, limit: u32) -> Result<()> {
    let client = app.spotify()?;
    let result = client.my_playlists(limit).await;
    let playlists = app.after_call(result).await?;

    let rows: Vec<PlaylistTableRow> = playlists
        .into_iter()
        .map(|p| PlaylistTableRow {
            tracks: p.tracks.map(|t| t.total as usize).unwrap_or_default(),
            id: p.id,
            name: p.name,
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}

pub async fn recent(app: &App, limit: u32) -> Result<()> {
    let client = app.spotify()?;
    let result = client.recently_played(limit).await;
    let history = app.after_call(result).await?;

    let rows: Vec<TrackTableRow> = history
        .into_iter()
        .map(|h| TrackTableRow {
            artists: h.track.artist_names(),
            duration: utils::format_timestamp(&h.played_at),
            name: h.track.name,
            uri: h.track.uri,
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}

pub async fn play(app: &App, device_id: Option<&str>, uris: &[String]) -> Result<()> {
    let client = app.spotify()?;
    let result = client.play(device_id, uris).await;
    app.after_call(result).await?;
    success!("Playback started.");
    Ok(())
}
