//! Error types for palaver operations.
//!
//! Provides a structured error hierarchy with error codes and suggestions
//! for resolution. Registry and configuration errors propagate to the
//! caller; data-plane storage errors are logged and degraded at the call
//! site instead of aborting a conversation turn.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for palaver operations.
pub type PalaverResult<T> = Result<T, PalaverError>;

/// Main error type for all palaver operations.
#[derive(Error, Debug)]
pub enum PalaverError {
    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// Requested strategy is not registered.
    #[error("Strategy not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        strategy: Option<String>,
    },

    /// Durable store operation failed.
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Language model operation failed.
    #[error("Model error: {message}")]
    Model {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValMissingField,
    ValInvalidRole,

    // Strategy registry (STRAT_xxx)
    StratNotFound,
    StratBuildFailed,

    // Durable store (STORE_xxx)
    StoreOperationFailed,
    StoreCorrupted,

    // Language model (LLM_xxx)
    LlmGenerationFailed,

    // Parse (PARSE_xxx)
    ParseInvalidJson,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValMissingField => "VAL_002",
            ErrorCode::ValInvalidRole => "VAL_003",
            ErrorCode::StratNotFound => "STRAT_001",
            ErrorCode::StratBuildFailed => "STRAT_002",
            ErrorCode::StoreOperationFailed => "STORE_001",
            ErrorCode::StoreCorrupted => "STORE_002",
            ErrorCode::LlmGenerationFailed => "LLM_001",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl PalaverError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error with a suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create a not found error for an unregistered strategy.
    pub fn strategy_not_found(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::NotFound {
            message: format!("Memory strategy '{}' is not registered", name),
            code: ErrorCode::StratNotFound,
            strategy: Some(name),
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            code: ErrorCode::StoreOperationFailed,
            source: None,
        }
    }

    /// Create a storage error with a source.
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            code: ErrorCode::StoreOperationFailed,
            source: Some(Box::new(source)),
        }
    }

    /// Create a model error.
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model {
            message: message.into(),
            code: ErrorCode::LlmGenerationFailed,
            source: None,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Storage { code, .. } => *code,
            Self::Model { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::NotFound { .. } => {
                Some("Register the strategy before constructing a memory engine with it")
            }
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::Storage { .. } => {
                Some("Check that the store file path is writable and the disk is not full")
            }
            Self::Model { .. } => Some("Check your language model configuration"),
            _ => None,
        }
    }
}
