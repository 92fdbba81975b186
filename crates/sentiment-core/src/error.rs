//! Error types for ticker analysis

use sentiment_llm::LLMError;
use sentiment_tools::ToolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while analyzing a ticker
#[derive(Debug, Error)]
pub enum Error {
    /// A search client failed or timed out
    #[error("Tool unavailable: {0}")]
    ToolUnavailable(String),

    /// The model finished without calling its tool
    #[error("Model finished without calling tool '{tool}'")]
    ToolNotInvoked {
        /// Tool the model was given
        tool: String,
    },

    /// Model output could not be projected onto a classification record
    #[error("Schema coercion failed: {0}")]
    SchemaCoercion(String),

    /// Model transport or API failure
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Market data fetch or indicator failure
    #[error("Market data error: {0}")]
    MarketData(String),

    /// Empty or unknown ticker
    #[error("Invalid ticker: {0}")]
    InvalidTicker(String),

    /// Instruction template failed to render
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse error category, stable enough for logs and serialized reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`Error::ToolUnavailable`]
    ToolUnavailable,
    /// See [`Error::ToolNotInvoked`]
    ToolNotInvoked,
    /// See [`Error::SchemaCoercion`]
    SchemaCoercion,
    /// See [`Error::ModelUnavailable`]
    ModelUnavailable,
    /// See [`Error::MarketData`]
    MarketData,
    /// See [`Error::InvalidTicker`]
    InvalidTicker,
    /// See [`Error::Prompt`]
    Prompt,
    /// See [`Error::Config`]
    Config,
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ToolUnavailable(_) => ErrorKind::ToolUnavailable,
            Self::ToolNotInvoked { .. } => ErrorKind::ToolNotInvoked,
            Self::SchemaCoercion(_) => ErrorKind::SchemaCoercion,
            Self::ModelUnavailable(_) => ErrorKind::ModelUnavailable,
            Self::MarketData(_) => ErrorKind::MarketData,
            Self::InvalidTicker(_) => ErrorKind::InvalidTicker,
            Self::Prompt(_) => ErrorKind::Prompt,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

impl ErrorKind {
    /// snake_case name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToolUnavailable => "tool_unavailable",
            Self::ToolNotInvoked => "tool_not_invoked",
            Self::SchemaCoercion => "schema_coercion",
            Self::ModelUnavailable => "model_unavailable",
            Self::MarketData => "market_data",
            Self::InvalidTicker => "invalid_ticker",
            Self::Prompt => "prompt",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<ToolError> for Error {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Config(msg) => Error::Config(msg),
            other => Error::ToolUnavailable(other.to_string()),
        }
    }
}

impl From<LLMError> for Error {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::ConfigurationError(msg) => Error::Config(msg),
            other => Error::ModelUnavailable(other.to_string()),
        }
    }
}

impl From<minijinja::Error> for Error {
    fn from(err: minijinja::Error) -> Self {
        Error::Prompt(err.to_string())
    }
}
