//! Domain errors for the cascade engine.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur in the cascade engine.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Cliente not found: {0}")]
    ClienteNotFound(Uuid),

    #[error("Lead not found: {0}")]
    LeadNotFound(Uuid),

    #[error("Cascade not found: {0}")]
    CascadeNotFound(Uuid),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Transient infrastructure failure. Callers retry with backoff; the
    /// sweeper simply retries on its next tick.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Notification failed for {user_id}: {reason}")]
    NotificationFailed { user_id: String, reason: String },
}

impl DomainError {
    /// Whether the error is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::StoreUnavailable(err.to_string())
            }
            sqlx::Error::Database(db) if is_busy_message(db.message()) => {
                Self::StoreUnavailable(err.to_string())
            }
            _ => Self::DatabaseError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

fn is_busy_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked") || message.contains("database is busy")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_transient() {
        let err: DomainError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_transient());
        assert!(matches!(err, DomainError::StoreUnavailable(_)));
    }

    #[test]
    fn test_row_not_found_is_not_transient() {
        let err: DomainError = sqlx::Error::RowNotFound.into();
        assert!(!err.is_transient());
        assert!(matches!(err, DomainError::DatabaseError(_)));
    }

    #[test]
    fn test_busy_message_detection() {
        assert!(is_busy_message("database is locked"));
        assert!(is_busy_message("Database is BUSY"));
        assert!(!is_busy_message("UNIQUE constraint failed"));
    }
}
