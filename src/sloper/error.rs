use crate::store::StoreError;

/// Error taxonomy for one sync run.
///
/// `Auth` and `Fetch` abort the whole run; everything else is handled at
/// the record that raised it and turned into a log line.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("unparseable source timestamp: {value:?}")]
    DateFormat { value: String },
    #[error("rename chain exceeded {max} steps at {name:?}")]
    RenameChainTooDeep { name: String, max: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Fatal errors abort the run; the rest are per-record.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Auth(_) | SyncError::Fetch(_))
    }
}

impl From<rusqlite::Error> for SyncError {
    fn from(e: rusqlite::Error) -> Self {
        SyncError::Store(crate::store::classify(e))
    }
}
