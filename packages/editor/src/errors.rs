//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Request timed out: {0}")]
    NetworkTimeout(String),

    /// Credential missing or rejected; recoverable by signing in again
    #[error("Unauthorized, please sign in")]
    Unauthorized,

    #[error("{message}")]
    ValidationFailure {
        message: String,
        details: Option<String>,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Mutation error: {0}")]
    Mutation(#[from] crate::mutations::MutationError),

    #[error("Parse error: {0}")]
    Parse(#[from] sitefile_grammar::ParseError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl EditorError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailure {
            message: message.into(),
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::ValidationFailure {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// The 401 class, handled centrally by re-authentication
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Text shown in a notice: message plus any service-provided details
    pub fn user_message(&self) -> String {
        match self {
            Self::ValidationFailure {
                message,
                details: Some(details),
            } => format!("{}\n{}", message, details),
            other => other.to_string(),
        }
    }
}
