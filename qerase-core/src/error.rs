use std::path::PathBuf;

/// Failures the engine can report. Only `NothingToErase`, `Config` and `Busy`
/// stop a batch before any destructive action; everything else is per item.
#[derive(Debug, thiserror::Error)]
pub enum EraseError {
    #[error("path is missing or not readable and writable: {path:?}")]
    Validation { path: PathBuf },

    #[error("file is held open by another process: {path:?}")]
    Locked { path: PathBuf },

    #[error("overwrite failed for {path:?}: {source}")]
    Overwrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("delete failed for {path:?}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("directory survived every removal strategy: {path:?}")]
    RemovalExhausted { path: PathBuf },

    #[error("nothing to erase")]
    NothingToErase,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("an erasure batch is already running")]
    Busy,

    #[error("failed to start erasure worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("erasure worker panicked")]
    WorkerPanicked,
}

impl EraseError {
    /// True for errors that abort a batch before work starts.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, EraseError::NothingToErase | EraseError::Config(_) | EraseError::Busy)
    }
}

pub type Result<T, E = EraseError> = std::result::Result<T, E>;
