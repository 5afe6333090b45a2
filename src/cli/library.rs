use tabled::Table;

use crate::{
    Result,
    app::App,
    backend::HISTORY_LIMIT,
    info, success,
    types::{HistoryTableRow, SongTableRow},
    utils, warning,
};

pub async fn songs(app: &App, search: Option<String>) -> Result<()> {
    let pb = super::spinner("Loading songs...");
    let result = app.backend().list_songs().await;
    pb.finish_and_clear();

    let mut songs = result?;
    if let Some(term) = search {
        let term = term.to_lowercase();
        songs.retain(|s| {
            s.title.to_lowercase().contains(&term) || s.artist.to_lowercase().contains(&term)
        });
    }

    if songs.is_empty() {
        info!("No songs found.");
        return Ok(());
    }

    let rows: Vec<SongTableRow> = songs
        .into_iter()
        .map(|s| SongTableRow {
            liked: if app.likes.contains(&s.id) { "♥" } else { "" }.to_string(),
            id: s.id,
            title: s.title,
            artist: s.artist,
            plays: s.play_count,
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}

pub async fn play(app: &App, song_id: &str) -> Result<()> {
    let song = app.play_song(song_id).await?;
    success!(
        "Now playing {} - {} ({} plays)",
        song.title,
        song.artist,
        song.play_count
    );
    info!("{}", song.file_url);
    Ok(())
}

pub async fn like(app: &App, song_id: &str) -> Result<()> {
    if app.session.session().is_none() {
        warning!("Not signed in, the like is not saved.");
    }

    let result = app.likes.toggle(song_id).await;
    let liked = app.after_call(result).await?;
    if liked {
        success!("Liked {}", song_id);
    } else {
        success!("Removed {} from liked songs", song_id);
    }
    app.persist_session().await
}

pub async fn likes(app: &App) -> Result<()> {
    app.session.require_session()?;
    if app.likes.is_empty() {
        info!("No liked songs yet.");
        return Ok(());
    }

    let songs = app.backend().list_songs().await?;
    let rows: Vec<SongTableRow> = songs
        .into_iter()
        .filter(|s| app.likes.contains(&s.id))
        .map(|s| SongTableRow {
            id: s.id,
            title: s.title,
            artist: s.artist,
            plays: s.play_count,
            liked: "♥".to_string(),
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}

pub async fn history(app: &App, limit: Option<usize>) -> Result<()> {
    let session = app.session.require_session()?;
    let limit = limit.unwrap_or(HISTORY_LIMIT).min(HISTORY_LIMIT);

    let entries = app.backend().listening_history(&session, limit).await?;
    if entries.is_empty() {
        info!("Nothing played yet.");
        return Ok(());
    }

    let songs = app.backend().list_songs().await?;
    let rows: Vec<HistoryTableRow> = entries
        .iter()
        .map(|entry| HistoryTableRow {
            played_at: utils::format_timestamp(&entry.played_at),
            song: songs
                .iter()
                .find(|s| s.id == entry.song_id)
                .map(|s| format!("{} - {}", s.title, s.artist))
                .unwrap_or_else(|| entry.song_id.clone()),
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}
