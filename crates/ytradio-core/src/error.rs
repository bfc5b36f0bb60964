//! Error types for the catalog, player and state file boundaries.
//!
//! None of these ever escape the orchestrator: every failure is converted to
//! a status line there. They exist so the collaborators can say precisely
//! what went wrong.

/// Catalog lookups (search, related songs).
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the JSON we expected
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// API answered with a non-success status
    #[error("API error: {0}")]
    Api(String),

    /// Request exceeded the configured timeout
    #[error("Request timeout")]
    Timeout,
}

/// Starting the external player.
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("player binary not found: {0}")]
    BinaryNotFound(String),

    #[error("failed to spawn player: {0}")]
    Io(#[from] std::io::Error),
}

/// Reading or writing the state file. Logged, never surfaced.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A raw catalog entry that could not be turned into a `Song`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("catalog entry is not an object")]
    NotAnObject,

    #[error("catalog entry has no videoId")]
    MissingVideoId,
}
