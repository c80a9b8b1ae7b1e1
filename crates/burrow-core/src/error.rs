//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Navigation(#[from] burrow_navigation::NavigationError),

    #[error(transparent)]
    Trust(#[from] burrow_trust::TrustError),

    #[error("Storage error: {0}")]
    Storage(#[from] burrow_storage::StorageError),

    #[error(transparent)]
    Fetch(#[from] burrow_protocols::FetchError),

    #[error("Unable to write {path}: {source}")]
    Save {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid link id: {0}")]
    InvalidLink(usize),

    #[error("Bookmark {0} does not exist")]
    InvalidBookmark(usize),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Usage(String),

    #[error("There is no pending request to answer")]
    NothingPending,
}
