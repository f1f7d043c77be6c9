//! Error types for the hosted backend

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Rejection from the auth endpoints, message as sent by the service
    #[error("{0}")]
    Auth(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not signed in")]
    NotSignedIn,
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for tally_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Auth(message) => tally_core::Error::Auth(message),
            Error::NotSignedIn => tally_core::Error::Auth("Not signed in".to_string()),
            other => tally_core::Error::Gateway(other.to_string()),
        }
    }
}
