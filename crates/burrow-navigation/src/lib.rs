//! Burrow Navigation
//!
//! The stateful half of the engine that knows nothing about sockets:
//! - Address resolution (`gopher://`, `gemini://`, `finger://`, local paths)
//! - The page model handed back by protocol handlers
//! - A bounded back/forward history of visited pages
//! - The command language typed at the prompt

mod command;
mod error;
mod history;
mod page;
mod url;

pub use command::{tokenize, Action, Command, Parser, Token, TokenKind};
pub use error::NavigationError;
pub use history::{History, HistoryEntry, HISTORY_CAPACITY};
pub use page::{wrap_lines, ContentKind, GeminiStatus, Page};
pub use url::{Scheme, Url};

pub type Result<T> = std::result::Result<T, NavigationError>;
