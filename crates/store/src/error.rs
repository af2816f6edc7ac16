use common::Version;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The row changed since it was read.
    #[error(
        "Concurrency conflict for {entity} {id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        entity: &'static str,
        id: i64,
        expected: Version,
        actual: Version,
    },

    /// The row to update does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// A uniqueness constraint rejected the write.
    #[error("Duplicate value violates {constraint}")]
    Duplicate { constraint: String },

    /// A stored value could not be mapped back to a domain type.
    #[error("Corrupt {column} value: {message}")]
    Decode {
        column: &'static str,
        message: String,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Builds a `ConcurrencyConflict` and counts it.
    pub fn conflict(entity: &'static str, id: i64, expected: Version, actual: Version) -> Self {
        metrics::counter!("store_version_conflicts_total", "entity" => entity).increment(1);
        StoreError::ConcurrencyConflict {
            entity,
            id,
            expected,
            actual,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrencyConflict { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return StoreError::Duplicate {
                constraint: db_err.constraint().unwrap_or("unique").to_string(),
            };
        }
        StoreError::Database(err)
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
