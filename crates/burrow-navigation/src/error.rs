//! Navigation error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("No host in address: {0}")]
    NoHost(String),

    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("You are already at the beginning of history")]
    AtBeginning,

    #[error("There is nothing further forward in history")]
    AtEnd,

    #[error("History is empty")]
    EmptyHistory,

    #[error("You are already at the top")]
    AtTop,

    #[error("You are already at the bottom")]
    AtBottom,

    #[error("No matches found for {0:?}")]
    NoMatches(String),
}
