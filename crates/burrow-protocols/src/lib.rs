//! Burrow Protocols
//!
//! One handler per scheme, all reached through [`dispatch`]:
//! - gopher, with the gophermap parser
//! - gemini over TLS, gated by the trust store, with the gemtext parser
//! - local files and directories
//! - finger
//!
//! Telnet and web addresses are handed to a [`Launcher`].

mod dispatch;
mod error;
mod finger;
mod gemini;
mod gopher;
mod local;
mod net;

pub use dispatch::{dispatch, fetch_raw, FetchContext, Launcher, Response};
pub use error::FetchError;
pub use gemini::{parse_gemtext, parse_response, BlockDisplay, GeminiResponse};
pub use gopher::{item_type_code, parse_gophermap, request_line};

pub type Result<T> = std::result::Result<T, FetchError>;
