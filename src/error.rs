//! Unified error handling for the route-safety library.
//!
//! This module provides a consistent error type for all scoring operations,
//! so callers can distinguish "the route geometry is broken" from "the
//! incident dataset is gone" instead of receiving coerced defaults.

use std::fmt;

/// Unified error type for route-safety operations.
#[derive(Debug, Clone)]
pub enum SafetyError {
    /// Encoded polyline terminated mid-codeword (dangling continuation bit)
    MalformedPolyline {
        /// Byte offset where decoding ran out of input
        position: usize,
    },
    /// Incident dataset missing or unparsable at load time
    DataUnavailable { message: String },
    /// Route candidate carries neither a polyline nor explicit bounds
    InvalidRoute { summary: String },
    /// HTTP/collaborator error
    Http {
        message: String,
        status_code: Option<u16>,
    },
    /// Generic internal error
    Internal { message: String },
}

impl fmt::Display for SafetyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafetyError::MalformedPolyline { position } => {
                write!(f, "Polyline truncated mid-codeword at byte {}", position)
            }
            SafetyError::DataUnavailable { message } => {
                write!(f, "Incident dataset unavailable: {}", message)
            }
            SafetyError::InvalidRoute { summary } => {
                write!(
                    f,
                    "Route '{}' has neither an encoded polyline nor explicit bounds",
                    summary
                )
            }
            SafetyError::Http {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "HTTP error ({}): {}", code, message)
                } else {
                    write!(f, "HTTP error: {}", message)
                }
            }
            SafetyError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for SafetyError {}

/// Result type alias for route-safety operations.
pub type Result<T> = std::result::Result<T, SafetyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SafetyError::MalformedPolyline { position: 12 };
        assert!(err.to_string().contains("byte 12"));

        let err = SafetyError::InvalidRoute {
            summary: "NH48".to_string(),
        };
        assert!(err.to_string().contains("NH48"));
    }

    #[test]
    fn test_http_error_with_status() {
        let err = SafetyError::Http {
            message: "not found".to_string(),
            status_code: Some(404),
        };
        assert!(err.to_string().contains("404"));
    }
}
