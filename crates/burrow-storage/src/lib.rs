//! Burrow Storage
//!
//! Settings, bookmarks and pinned certificates live in one line-oriented
//! file made of `[SECTION]` headers and `key=value` lines.

mod error;
mod ini;
mod store;

pub use error::StorageError;
pub use ini::{IniDocument, Section};
pub use store::ConfigStore;

pub type Result<T> = std::result::Result<T, StorageError>;
