//! Error types for the product ranking service

use thiserror::Error;

/// Result type for ranking operations
pub type Result<T> = std::result::Result<T, RankingError>;

/// Errors that can occur while reading rankings or running the rollup pipeline
#[derive(Error, Debug)]
pub enum RankingError {
    /// Caller supplied an unusable argument (page <= 0, negative product id, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A member stored in the live ordered set cannot be decoded into a product id.
    ///
    /// Signals a writer/reader encoding mismatch and is never masked.
    #[error("Malformed ranking member '{member}': {reason}")]
    MalformedMember { member: String, reason: String },

    /// A ranking row violates its invariants (rank <= 0, non-finite or non-positive score)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Ordered-set store (Redis) operation failed
    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    /// Ledger (PostgreSQL) operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected failure inside the service (e.g. a pipeline branch panicked)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RankingError {
    pub fn malformed_member(member: &str, reason: impl Into<String>) -> Self {
        RankingError::MalformedMember {
            member: member.to_string(),
            reason: reason.into(),
        }
    }

    /// Check if error is transient (connectivity), i.e. a later retry may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            RankingError::Store(err) => {
                err.kind() == redis::ErrorKind::IoError
                    || err.is_io_error()
                    || err.is_connection_dropped()
                    || err.is_timeout()
            }
            RankingError::Database(err) => matches!(
                err,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_errors_are_not_transient() {
        assert!(!RankingError::InvalidArgument("page".into()).is_transient());
        assert!(!RankingError::malformed_member("abc", "not a digit").is_transient());
        assert!(!RankingError::Validation("rank".into()).is_transient());
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        assert!(RankingError::Database(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!RankingError::Database(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn test_store_io_error_is_transient() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = redis::RedisError::from(io);
        assert!(RankingError::Store(err).is_transient());
    }

    #[test]
    fn test_malformed_member_message() {
        let err = RankingError::malformed_member("abc", "non-digit character");
        assert_eq!(
            err.to_string(),
            "Malformed ranking member 'abc': non-digit character"
        );
    }
}
