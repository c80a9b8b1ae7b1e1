//! Burrow Trust
//!
//! Gemini has no certificate authorities. The first certificate a host
//! presents is pinned and every later connection must present it again
//! until it expires.

mod certificate;
mod error;
mod locks;
mod store;

pub use certificate::{fingerprint, PeerCertificate};
pub use error::TrustError;
pub use locks::HostLocks;
pub use store::{TrustEntry, TrustOutcome, TrustStore, WILDCARD};

pub type Result<T> = std::result::Result<T, TrustError>;
