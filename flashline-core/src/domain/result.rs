//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Content source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Content source rejected credentials: {0}")]
    SourceUnauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("Malformed block {block_id}: {reason}")]
    MalformedContent { block_id: String, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a limit exceeded error
    pub fn limit_exceeded(msg: impl Into<String>) -> Self {
        Self::LimitExceeded(msg.into())
    }

    /// Whether the error came from the content source rather than local state
    pub fn is_source_error(&self) -> bool {
        matches!(self, Self::SourceUnavailable(_) | Self::SourceUnauthorized(_))
    }

    /// Short message suitable for showing to the person on the other end of the chat
    pub fn user_message(&self) -> String {
        match self {
            Self::SourceUnavailable(_) => {
                "Notion is not reachable right now. Please try again later.".to_string()
            }
            Self::SourceUnauthorized(_) => {
                "Notion access is missing or was revoked. Please log in again.".to_string()
            }
            Self::NotFound(what) => format!("Not found: {}", what),
            Self::LimitExceeded(what) => what.clone(),
            Self::MalformedContent { .. } => {
                "A flashcard block is malformed and was skipped.".to_string()
            }
            Self::Validation(what) => what.clone(),
            _ => "Something went wrong. Please try again later.".to_string(),
        }
    }
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Create a failed result with context
    pub fn fail_with_context(
        error: impl Into<String>,
        context: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: Some(context),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                let mut context = HashMap::new();
                context.insert("detail".to_string(), serde_json::json!(e.to_string()));
                Self::fail_with_context(e.user_message(), context)
            }
        }
    }
}
