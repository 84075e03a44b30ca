//! Error types for the gateway
//!
//! Centralized error handling using thiserror.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable error code carried in structured error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    NotFound,
    ExecutionError,
    InternalError,
    TransportError,
    BadRequest,
}

/// All error types that can occur in the gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Caller-supplied data failed a precondition
    #[error("InvalidInput: {0}")]
    InvalidInput(String),

    /// Named tool, backend or resource does not exist
    #[error("NotFound: {0}")]
    NotFound(String),

    /// Domain operation failed for a reason outside the caller's input
    #[error("ExecutionError: {0}")]
    Execution(String),

    /// Any other uncaught fault
    #[error("InternalError: {0}")]
    Internal(String),

    /// Network-level failure talking to a backend
    #[error("TransportError: {0}")]
    Transport(String),

    /// Malformed gateway request
    #[error("BadRequest: {0}")]
    BadRequest(String),

    /// Configuration could not be loaded or is inconsistent
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    /// Taxonomy name used as the prefix of composed error strings
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "InvalidInput",
            Self::NotFound(_) => "NotFound",
            Self::Execution(_) => "ExecutionError",
            Self::Internal(_) | Self::Config(_) | Self::Io(_) => "InternalError",
            Self::Transport(_) => "TransportError",
            Self::BadRequest(_) | Self::Json(_) => "BadRequest",
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Execution(_) => ErrorCode::ExecutionError,
            Self::Internal(_) | Self::Config(_) | Self::Io(_) => ErrorCode::InternalError,
            Self::Transport(_) => ErrorCode::TransportError,
            Self::BadRequest(_) | Self::Json(_) => ErrorCode::BadRequest,
        }
    }

    /// The message without the kind prefix
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidInput(m)
            | Self::NotFound(m)
            | Self::Execution(m)
            | Self::Internal(m)
            | Self::Transport(m)
            | Self::BadRequest(m)
            | Self::Config(m) => m.clone(),
            Self::Io(e) => e.to_string(),
            Self::Json(e) => e.to_string(),
        }
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_error() {
        let err = GatewayError::InvalidInput("query cannot be empty".to_string());
        assert_eq!(err.to_string(), "InvalidInput: query cannot be empty");
        assert_eq!(err.kind(), "InvalidInput");
        assert_eq!(err.detail(), "query cannot be empty");
    }

    #[test]
    fn test_not_found_error() {
        let err = GatewayError::NotFound("Tool 'nope' not found".to_string());
        assert_eq!(err.to_string(), "NotFound: Tool 'nope' not found");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_transport_error() {
        let err = GatewayError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "TransportError: connection refused");
        assert_eq!(err.code(), ErrorCode::TransportError);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GatewayError = io_err.into();
        assert!(matches!(err, GatewayError::Io(_)));
        assert_eq!(err.kind(), "InternalError");
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: GatewayError = json_err.into();
        assert!(matches!(err, GatewayError::Json(_)));
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::ExecutionError).unwrap();
        assert_eq!(json, "\"EXECUTION_ERROR\"");
        let json = serde_json::to_string(&ErrorCode::InvalidInput).unwrap();
        assert_eq!(json, "\"INVALID_INPUT\"");
    }
}
