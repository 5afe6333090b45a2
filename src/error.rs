//! Error taxonomy shared by every layer of the client.
//!
//! All fallible operations return [`Result`]. Callers are expected to show
//! the error to the user as a transient notification; none of these are
//! fatal to the process.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Login or signup was rejected by the auth provider.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The refresh token was rejected upstream; the user has to authorize again.
    #[error("authorization expired, please sign in again")]
    AuthExpired,

    /// Spotify or the backend answered with a non-2xx status.
    #[error("upstream API error ({status}): {message}")]
    UpstreamApi { status: u16, message: String },

    /// Transport failure. Not retried.
    #[error("network error: {0}")]
    Network(String),

    #[error("not signed in")]
    NotSignedIn,

    #[error("no Spotify account linked, run `vibestream spotify auth`")]
    SpotifyNotLinked,

    #[error("{0} not found")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Error::UpstreamApi {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => Error::Network(err.to_string()),
        }
    }
}

impl Error {
    /// Whether the user has to go through a login again.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Error::AuthExpired | Error::NotSignedIn)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_display_carries_status() {
        let err = Error::UpstreamApi {
            status: 404,
            message: "Non existing id".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "upstream API error (404): Non existing id"
        );
    }

    #[test]
    fn test_requires_reauth() {
        assert!(Error::AuthExpired.requires_reauth());
        assert!(Error::NotSignedIn.requires_reauth());
        assert!(!Error::Network("offline".into()).requires_reauth());
    }
}
