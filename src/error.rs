/// Unified error types for Courier
use thiserror::Error;

/// Main error type for the side-effect engine
#[derive(Error, Debug)]
pub enum CourierError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Malformed request content (bad chars, counts, formats)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Well-formed request that cannot be applied (no-op edit, limits)
    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Requester may not act on the target
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Conflict errors (e.g., duplicate vote)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// JSON column encoding errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CourierError {
    /// Whether the message of this error may be shown to the end user.
    ///
    /// Only request-level errors are user facing; storage and internal
    /// failures are logged and replaced by a generic message.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            CourierError::Validation(_)
                | CourierError::Unprocessable(_)
                | CourierError::NotFound(_)
                | CourierError::Forbidden(_)
                | CourierError::Conflict(_)
        )
    }

    /// HTTP status code the request layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            CourierError::Validation(_) => 400,
            CourierError::Forbidden(_) => 403,
            CourierError::NotFound(_) => 404,
            CourierError::Conflict(_) => 409,
            CourierError::Unprocessable(_) => 422,
            CourierError::Database(_)
            | CourierError::Migration(_)
            | CourierError::Internal(_)
            | CourierError::Serialization(_)
            | CourierError::Io(_) => 500,
        }
    }

    /// Message safe to return to the requester
    pub fn public_message(&self) -> String {
        if self.is_user_facing() {
            self.to_string()
        } else {
            "Internal server error".to_string() // Don't leak details
        }
    }
}

/// Result type alias for Courier operations
pub type CourierResult<T> = Result<T, CourierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_errors_keep_message() {
        let err = CourierError::Unprocessable("status was not changed".to_string());
        assert!(err.is_user_facing());
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.public_message(), "Unprocessable: status was not changed");
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let err = CourierError::Internal("failed adding poll to scheduler".to_string());
        assert!(!err.is_user_facing());
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.public_message(), "Internal server error");
    }
}
