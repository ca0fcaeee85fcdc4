use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VthellError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Could not determine a config directory for this platform")]
    NoConfigDir,
}

/// Errors from the persistent event-stream connection.
///
/// Transport drops are not represented here: the client recovers from them
/// internally and surfaces them as `closed` events instead.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Stream is not connected")]
    NotConnected,

    #[error("Stream client already closed")]
    Closed,

    #[error("Failed to serialize outbound frame: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Outbound queue is full")]
    QueueFull,
}

/// Remote request failures, categorized by HTTP status.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Wrong password")]
    Unauthorized,

    #[error("Not authorized to perform this action")]
    Forbidden,

    #[error("Resource not found")]
    NotFound,

    #[error("Invalid state transition: {0}")]
    InvalidState(String),

    #[error("Internal server error")]
    Server,

    #[error("Unexpected status code {0}")]
    UnexpectedStatus(u16),

    #[error("HTTP transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Local form-data validation failures, raised before any network call.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("Chain entry {index} is missing its match data")]
    EmptyChainData { index: usize },

    #[error("Chains are only allowed on 'word' and 'regex' rules")]
    ChainsNotAllowed,
}

pub type Result<T> = std::result::Result<T, VthellError>;
