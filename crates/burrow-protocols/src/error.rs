//! Fetch error types

use burrow_navigation::NavigationError;
use burrow_trust::TrustError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Connection error: {addr}: {source}")]
    Connection {
        addr: String,
        source: std::io::Error,
    },

    #[error("Timed out waiting for {addr}")]
    Timeout { addr: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("{message}")]
    ServerFailure { message: String },

    #[error("[6] Client certificate required (unsupported)")]
    ClientCertificateRequired,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unable to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error(transparent)]
    Trust(#[from] TrustError),

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Launch error: {0}")]
    Launch(String),
}
