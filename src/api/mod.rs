//! # API Module
//!
//! HTTP endpoints of the local listener the Spotify authorization redirects
//! back to.
//!
//! ## Endpoints
//!
//! - [`callback`] - Receives `code` (or `error`) from Spotify's authorization
//!   server and exchanges the code, together with the PKCE verifier, for a
//!   token pair.
//! - [`health`] - Returns status and version, handy for checking that the
//!   listener is up before opening the browser.
//!
//! The router itself lives in [`crate::server`].

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
