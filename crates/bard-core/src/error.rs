//! Error types for bard.

use thiserror::Error;

/// Result type alias using BardError.
pub type Result<T> = std::result::Result<T, BardError>;

/// Errors that can occur across the bard crates.
#[derive(Error, Debug)]
pub enum BardError {
    /// A named resource (file, session, project, chunk) does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// Invalid argument provided.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Database error.
    #[error("Database error: {message}")]
    Database { message: String },

    /// Embedding model error.
    #[error("Embedding error: {message}")]
    Embedding { message: String },

    /// Chat model error.
    #[error("Model error ({provider}): {message}")]
    Llm { provider: String, message: String },

    /// Transport-level HTTP failure.
    #[error("HTTP error: {message}")]
    Http { message: String },

    /// Chunking error.
    #[error("Chunking error: {message}")]
    Chunking { message: String },

    /// The model output could not be assembled from the offered quotes.
    #[error("Assembly failed: {message}")]
    Assembly { message: String },

    /// A translated line references quotes that are not in the corpus.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Internal error (unexpected).
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BardError {
    /// Create a not-found error.
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Create an embedding error.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create a chat model error.
    pub fn llm(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Llm {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP error.
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    /// Create a chunking error.
    pub fn chunking(message: impl Into<String>) -> Self {
        Self::Chunking {
            message: message.into(),
        }
    }

    /// Create an assembly error.
    pub fn assembly(message: impl Into<String>) -> Self {
        Self::Assembly {
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable error code for tool responses and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Embedding { .. } => "EMBEDDING_ERROR",
            Self::Llm { .. } => "LLM_ERROR",
            Self::Http { .. } => "HTTP_ERROR",
            Self::Chunking { .. } => "CHUNKING_ERROR",
            Self::Assembly { .. } => "ASSEMBLY_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BardError::not_found("Session", "trans_20250101_1200_abcdef");
        let text = err.to_string();
        assert!(text.contains("Session"));
        assert!(text.contains("trans_20250101_1200_abcdef"));

        let err = BardError::llm("anthropic", "overloaded");
        assert_eq!(err.to_string(), "Model error (anthropic): overloaded");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(BardError::not_found("x", "y").error_code(), "NOT_FOUND");
        assert_eq!(BardError::database("test").error_code(), "DATABASE_ERROR");
        assert_eq!(BardError::assembly("no match").error_code(), "ASSEMBLY_ERROR");

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(BardError::from(io).error_code(), "IO_ERROR");
    }
}
