use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid snapshot: {0}")]
    SnapshotError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
