//! # Spotify Integration Module
//!
//! This module provides the interface to Spotify: the accounts service used
//! for OAuth and the Web API used for search, library reads and playback
//! control. It is the integration layer between VibeStream and Spotify's
//! services and handles all HTTP communication with them.
//!
//! ## Architecture
//!
//! ```text
//! Application Layer (CLI, App)
//!          ↓
//! Spotify Integration Layer
//!     ├── Authentication (OAuth 2.0 code flow, PKCE)
//!     └── Web API client (search, playlists, history, playback)
//!          ↓
//! Token Lifecycle (management::TokenManager)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//! ```
//!
//! ## Core Modules
//!
//! ### Authentication
//!
//! [`auth`] - Implements the OAuth 2.0 authorization code flow:
//! - **Authorize URL**: Redirect with `response_type=code`, scope list and optional PKCE challenge
//! - **Code Exchange**: `grant_type=authorization_code`
//! - **Refresh**: `grant_type=refresh_token`, HTTP basic client credentials when a secret is configured
//! - **Interactive Flow**: Local callback server, browser launch, token persistence
//!
//! ### Web API Client
//!
//! [`SpotifyClient`] - Bearer-authenticated calls for the signed-in user:
//! - `GET /v1/search?type=track`
//! - `GET /v1/me/playlists`
//! - `GET /v1/me/player/recently-played`
//! - `PUT /v1/me/player/play`
//!
//! ## Error Handling
//!
//! - **Expired Tokens**: Refreshed before the request, never sent
//! - **Unexpected 401**: One forced refresh and a single retry
//! - **Rejected Refresh Token**: [`Error::AuthExpired`](crate::Error::AuthExpired); the stored
//!   token is cleared and the session signed out
//! - **Other Non-2xx**: [`Error::UpstreamApi`](crate::Error::UpstreamApi) carrying Spotify's
//!   `error.message`
//!
//! No other retries are performed.

pub mod auth;
mod client;

pub use auth::SpotifyOAuth;
pub use client::SpotifyClient;
