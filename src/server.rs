use axum::{Extension, Router, routing::get};
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::{net::TcpListener, sync::Mutex};

use crate::{Error, Result, api, spotify::SpotifyOAuth, types::PkceToken};

/// Routes of the local OAuth callback listener.
pub fn router(state: Arc<Mutex<Option<PkceToken>>>, oauth: SpotifyOAuth) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback))
        .layer(Extension(state))
        .layer(Extension(oauth))
}

/// Binds `addr` and serves the callback listener until the task is aborted.
pub async fn start_api_server(
    addr: &str,
    state: Arc<Mutex<Option<PkceToken>>>,
    oauth: SpotifyOAuth,
) -> Result<()> {
    let addr = SocketAddr::from_str(addr)
        .map_err(|e| Error::Config(format!("invalid server address '{addr}': {e}")))?;

    let listener = TcpListener::bind(&addr).await?;
    serve(listener, state, oauth).await
}

pub async fn serve(
    listener: TcpListener,
    state: Arc<Mutex<Option<PkceToken>>>,
    oauth: SpotifyOAuth,
) -> Result<()> {
    tracing::debug!(addr = ?listener.local_addr().ok(), "callback server listening");
    axum::serve(listener, router(state, oauth)).await?;
    Ok(())
}
