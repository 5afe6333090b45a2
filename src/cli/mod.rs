//! # CLI Module
//!
//! Command implementations of the `vibestream` binary. Each command takes the
//! wired [`App`](crate::app::App), performs one user action through the
//! session store, the backend or the Spotify client, and prints the outcome.
//!
//! ## Command Categories
//!
//! ### Account
//!
//! - [`account::signup`] / [`account::login`] - Start a session; prints the role's landing page
//! - [`account::logout`] - Ends the session remotely and locally
//! - [`account::whoami`] - Current user, role and navigation entries
//!
//! ### Library
//!
//! - [`library::songs`] - Catalogue with play counts and liked markers
//! - [`library::play`] - Playback start: play counter and listening history
//! - [`library::like`] - Optimistic like toggle, reverted when the backend rejects it
//! - [`library::likes`] / [`library::history`] - The user's likes and recently played songs
//!
//! ### Playlists
//!
//! - [`playlists::list`], [`playlists::create`], [`playlists::add`]
//!
//! ### Spotify
//!
//! - [`spotify::link`] / [`spotify::unlink`] - OAuth authorization of a Spotify account
//! - [`spotify::search`], [`spotify::playlists`], [`spotify::recent`], [`spotify::play`]
//!
//! ### Routing
//!
//! - [`route::route`] - Which page a path renders for the current session
//!
//! ## Error Handling
//!
//! Commands return [`Result`](crate::Result); the binary prints a failure as a
//! single line and exits non-zero. The session cache is rewritten whenever a
//! command may have changed the auth state.

pub mod account;
pub mod library;
pub mod playlists;
pub mod route;
pub mod spotify;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Steady spinner for calls that go over the network.
pub(crate) fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb
}
