//! Trust error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrustError {
    #[error("Insecure connection: {0} offered no certificate")]
    InsecureConnection(String),

    #[error("No valid certificate for {host}: {reasons}")]
    NoValidCertificate { host: String, reasons: String },

    #[error("Certificate mismatch for {host}: the pinned certificate was not offered. Use 'purge {host}' only if you trust the new certificate")]
    CertificateMismatch { host: String },

    #[error("No pinned certificate for {0}")]
    UnknownHost(String),

    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("Invalid trust entry: {0}")]
    InvalidEntry(String),
}
