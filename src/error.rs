// src/error.rs
// Error types shared by the server, the upstream clients and the chat client

use thiserror::Error;

/// Main error type for the quest library
#[derive(Error, Debug)]
pub enum QuestError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid image attachment: {0}")]
    InvalidAttachment(String),

    /// Context service unreachable or answered with a non-success status
    #[error("failed to fetch context messages: {0}")]
    ContextFetch(String),

    /// Context service answered, but with nothing usable at rank 0
    #[error("malformed context result: {0}")]
    MalformedContext(String),

    /// Completion provider rejected the request before any token was produced
    #[error("completion request failed: {0}")]
    Completion(String),

    /// Completion provider failed after streaming had started
    #[error("upstream stream error: {0}")]
    UpstreamStream(String),

    #[error("image search failed: {0}")]
    ImageSearch(String),

    #[error("a chat turn is already in flight")]
    Busy,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Result using QuestError
pub type Result<T> = std::result::Result<T, QuestError>;

impl QuestError {
    /// True for failures that happen before the first streamed byte and are
    /// caused by a third-party service rather than the caller
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            QuestError::ContextFetch(_)
                | QuestError::MalformedContext(_)
                | QuestError::Completion(_)
                | QuestError::UpstreamStream(_)
                | QuestError::ImageSearch(_)
                | QuestError::Http(_)
        )
    }
}
