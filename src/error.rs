// Typed errors with thiserror. Surface meaningful messages to JS.

use thiserror::Error;

/// Engine error types.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid preference: {0:?}")]
    InvalidPreference(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Inference backend failed: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for EngineError {
    fn from(err: url::ParseError) -> Self {
        EngineError::MalformedRequest(err.to_string())
    }
}
