use thiserror::Error;

/// Store error kinds. Constraint violations (foreign keys, CHECKs) get their
/// own variant so callers can tell a dangling reference from a broken store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[source] rusqlite::Error),

    #[error("constraint violation: {0}")]
    Constraint(#[source] rusqlite::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("column encoding: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("unsupported export table: {0}")]
    UnsupportedTable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Constraint(e)
            }
            _ => StoreError::Sqlite(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
