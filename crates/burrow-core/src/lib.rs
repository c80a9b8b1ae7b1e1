//! Burrow Core
//!
//! Coordination layer for the navigation engine. [`Browser`] owns the
//! history, options, bookmarks and trust store, routes parsed commands to
//! the protocol handlers and writes every change back to the config file.

mod bookmarks;
mod browser;
mod config;
mod error;

pub use bookmarks::{Bookmark, Bookmarks};
pub use browser::{Browser, Outcome, RenderSink};
pub use config::{Config, WebMode, CONFIG_FILE_NAME, SETTING_KEYS};
pub use error::CoreError;

// Re-export engine components
pub use burrow_navigation::{
    Action, Command, ContentKind, GeminiStatus, History, NavigationError, Page, Scheme, Url,
};
pub use burrow_protocols::{BlockDisplay, FetchError, Launcher};
pub use burrow_storage::{ConfigStore, StorageError};
pub use burrow_trust::{TrustEntry, TrustError, TrustStore};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging on stderr, filtered by `RUST_LOG` (default `warn`)
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
