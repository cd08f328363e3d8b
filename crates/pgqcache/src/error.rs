//! Error types for pgqcache.

use thiserror::Error;

/// Result type alias for pgqcache operations.
pub type CacheDbResult<T> = Result<T, CacheDbError>;

/// Error types for database-and-cache operations.
#[derive(Debug, Error)]
pub enum CacheDbError {
    /// A filter record could not be turned into SQL (unsupported `exec`, missing
    /// required attribute, malformed predicate). Surfaced synchronously, before
    /// any database contact.
    #[error("build error: {0}")]
    Build(String),

    /// Query execution error from the driver.
    #[error("query error: {0}")]
    Db(#[from] tokio_postgres::Error),

    /// Connection pool error.
    #[error("pool error: {0}")]
    Pool(String),

    /// Cache store error. Never returned from `dispatch` directly -- constructed
    /// so the cache coordinator has something to log and hand to the error sink,
    /// but always absorbed into a DB fallback (see `cache::coordinator`).
    #[error("cache store error: {0}")]
    Store(String),

    /// Row not found where exactly one row was required.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unique constraint violation (SQLSTATE 23505).
    #[error("unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation (SQLSTATE 23503).
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation (SQLSTATE 23514).
    #[error("check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode error.
    #[error("decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Filter validation error (e.g. `DELETE` without `WHERE`).
    #[error("validation error: {0}")]
    Validation(String),

    /// Query timed out.
    #[error("query timeout after {0:?}")]
    Timeout(std::time::Duration),
}

impl CacheDbError {
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Classify a driver error by SQLSTATE, falling back to the generic `Db` variant.
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();
            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{constraint}: {message}")),
                "23503" => return Self::ForeignKeyViolation(format!("{constraint}: {message}")),
                "23514" => return Self::CheckViolation(format!("{constraint}: {message}")),
                _ => {}
            }
        }
        Self::Db(err)
    }

    /// A short excerpt suitable for logging or handing to an [`crate::logging::ErrorSink`],
    /// truncated to 100 characters per the error-sink contract.
    pub fn excerpt(sql: &str) -> String {
        sql.chars().take(100).collect()
    }
}

impl From<deadpool_postgres::PoolError> for CacheDbError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_passes_short_sql_through_unchanged() {
        let sql = "SELECT * FROM products WHERE id=1";
        assert_eq!(CacheDbError::excerpt(sql), sql);
    }

    #[test]
    fn excerpt_truncates_to_100_chars() {
        let sql = "x".repeat(250);
        let excerpt = CacheDbError::excerpt(&sql);
        assert_eq!(excerpt.chars().count(), 100);
        assert_eq!(excerpt, "x".repeat(100));
    }

    #[test]
    fn build_and_validation_errors_are_distinct_variants() {
        assert!(matches!(CacheDbError::build("bad filter"), CacheDbError::Build(_)));
        assert!(matches!(CacheDbError::validation("needs a where"), CacheDbError::Validation(_)));
    }
}
