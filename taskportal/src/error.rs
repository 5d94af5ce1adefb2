use thiserror::Error;

use crate::domain::ValidationError;

/// The request never produced an HTTP response.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("could not connect to {url}: {message}")]
    Connection { url: String, message: String },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// A node the caller cannot do without is missing from scraped markup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedMarkupError {
    #[error("missing required element '{0}'")]
    MissingElement(&'static str),
    #[error("element '{selector}' has unreadable value '{value}'")]
    UnreadableValue {
        selector: &'static str,
        value: String,
    },
}

#[derive(Error, Debug)]
pub enum PortalError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Invalid username and password combination.")]
    InvalidCredentials,
    #[error("{url} returned status {status}")]
    UnexpectedStatus { status: u16, url: String },
    #[error(transparent)]
    MalformedMarkup(#[from] MalformedMarkupError),
    #[error("failed to parse JSON from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("task is missing its {0}")]
    MissingField(&'static str),
}
