//! Error types for tool execution

use thiserror::Error;

/// Errors raised by tools and their search clients
#[derive(Error, Debug)]
pub enum ToolError {
    /// The external service failed or answered with an error status
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Credentials were rejected
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The service throttled the request
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Transport error (connect, timeout, body decoding)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The tool was called more often than allowed within one run
    #[error("Tool '{tool}' may only be called once per run")]
    CallLimitExceeded {
        /// Name of the guarded tool
        tool: String,
    },

    /// Tool input did not match its schema
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ToolError {
    /// Whether the error came from the call guard rather than the external service
    pub fn is_call_limit(&self) -> bool {
        matches!(self, Self::CallLimitExceeded { .. })
    }
}

/// Result type alias for tool operations
pub type Result<T> = std::result::Result<T, ToolError>;
