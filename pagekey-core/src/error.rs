use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database connection lock was poisoned")]
    Poisoned,

    #[error("No record with id {0}")]
    NotFound(i64),

    #[error("Page id {0} already belongs to another site")]
    PageIdTaken(String),

    #[error("Storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
