use catalog_history::{EntityRef, HistoryError};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: {0}")]
    NotFound(String),
    /// The caller edited a stale copy; nothing was written.
    #[error("{id} was modified concurrently: expected version {expected}, found {actual}")]
    ConcurrentModification {
        id: EntityRef,
        expected: u64,
        actual: u64,
    },
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("{0} is referenced by other entities")]
    HasLinkedEntities(EntityRef),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<redb::DatabaseError> for CatalogError {
    fn from(e: redb::DatabaseError) -> Self {
        CatalogError::Storage(e.to_string())
    }
}
impl From<redb::TransactionError> for CatalogError {
    fn from(e: redb::TransactionError) -> Self {
        CatalogError::Storage(e.to_string())
    }
}
impl From<redb::TableError> for CatalogError {
    fn from(e: redb::TableError) -> Self {
        CatalogError::Storage(e.to_string())
    }
}
impl From<redb::StorageError> for CatalogError {
    fn from(e: redb::StorageError) -> Self {
        CatalogError::Storage(e.to_string())
    }
}
impl From<redb::CommitError> for CatalogError {
    fn from(e: redb::CommitError) -> Self {
        CatalogError::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Fail unless the stored version is the one the caller last saw.
pub(crate) fn check_version(id: &EntityRef, expected: u64, actual: u64) -> Result<()> {
    if expected != actual {
        tracing::debug!(id = %id, expected, actual, "version mismatch");
        return Err(CatalogError::ConcurrentModification {
            id: id.clone(),
            expected,
            actual,
        });
    }
    Ok(())
}
