//! Address resolution
//!
//! Every navigation starts here: a typed address, a followed link or a
//! bookmark becomes a [`Url`]. Two special forms are checked before the
//! general grammar:
//! - `finger://[user@]host[:port]`
//! - filesystem paths (leading `/`, `.` or `~`) and `local://` addresses
//!
//! The general grammar is `[scheme://]host[:port][/[type]]resource`.
//! Defaults are filled in a fixed order because each step reads what the
//! previous one wrote: scheme, port, gopher item type, download flag, and
//! finally folding the item type back into the resource for every scheme
//! that is not gopher.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, PathBuf};
use ::url::Url as WebUrl;

use crate::error::NavigationError;
use crate::Result;

/// Gopher item types recognised directly after the leading `/`.
const ITEM_TYPES: &str = "01345679gIhisp";

const FINGER_PREFIX: &str = "finger://";
const LOCAL_PREFIX: &str = "local://";
const FINGER_PORT: u16 = 79;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    Gopher,
    Gemini,
    Local,
    Finger,
    Http,
    Https,
    Telnet,
    /// Anything else; resolvable but not fetchable
    Other(String),
}

impl Scheme {
    fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "gopher" => Scheme::Gopher,
            "gemini" => Scheme::Gemini,
            "local" => Scheme::Local,
            "finger" => Scheme::Finger,
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            "telnet" => Scheme::Telnet,
            other => Scheme::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Scheme::Gopher => "gopher",
            Scheme::Gemini => "gemini",
            Scheme::Local => "local",
            Scheme::Finger => "finger",
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::Telnet => "telnet",
            Scheme::Other(name) => name,
        }
    }

    /// Port used when the address does not carry one
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Scheme::Gopher => Some(70),
            Scheme::Http => Some(80),
            Scheme::Https => Some(443),
            Scheme::Gemini => Some(1965),
            Scheme::Telnet => Some(23),
            Scheme::Finger => Some(FINGER_PORT),
            Scheme::Local | Scheme::Other(_) => None,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved, scheme-aware address.
///
/// Fields are only set by [`Url::parse`], so `full` always agrees with the
/// parts and re-parsing `full` yields an identical value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Url {
    scheme: Scheme,
    host: String,
    port: Option<u16>,
    kind: Option<char>,
    resource: String,
    full: String,
    download_only: bool,
}

impl Url {
    /// Resolve an address string
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(NavigationError::InvalidUrl(
                "empty address, unable to parse".to_string(),
            ));
        }

        if let Some(rest) = input.strip_prefix(FINGER_PREFIX) {
            return Self::parse_finger(input, rest);
        }

        if let Some(path) = input.strip_prefix(LOCAL_PREFIX) {
            return Self::parse_local(path);
        }

        if input.starts_with(['/', '.', '~']) {
            return Self::parse_local(input);
        }

        Self::parse_general(input)
    }

    fn parse_finger(input: &str, rest: &str) -> Result<Self> {
        let (user, address) = match rest.split_once('@') {
            Some((user, address)) => (user, address),
            None => ("", rest),
        };

        let (host, port) = match address.split_once(':') {
            Some((host, port)) if !port.is_empty() => (host, parse_port(input, port)?),
            Some((host, _)) => (host, FINGER_PORT),
            None => (address, FINGER_PORT),
        };

        if host.is_empty() {
            return Err(NavigationError::NoHost(input.to_string()));
        }
        if host_length(host) != host.len() {
            return Err(NavigationError::InvalidUrl(format!(
                "invalid finger address: {input}"
            )));
        }

        let full = if user.is_empty() {
            format!("finger://{host}:{port}")
        } else {
            format!("finger://{user}@{host}:{port}")
        };

        Ok(Self {
            scheme: Scheme::Finger,
            host: host.to_string(),
            port: Some(port),
            kind: None,
            resource: user.to_string(),
            full,
            download_only: false,
        })
    }

    fn parse_local(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(NavigationError::InvalidPath(
                "empty path, unable to parse".to_string(),
            ));
        }

        let expanded = match path.strip_prefix('~') {
            Some(rest) => {
                let home = dirs::home_dir().ok_or_else(|| {
                    NavigationError::InvalidPath(format!("no home directory to expand {path}"))
                })?;
                let mut joined = home.into_os_string();
                joined.push(rest);
                PathBuf::from(joined)
            }
            None => PathBuf::from(path),
        };

        let absolute = if expanded.is_absolute() {
            expanded
        } else {
            std::env::current_dir()
                .map_err(|e| NavigationError::InvalidPath(format!("{path}: {e}")))?
                .join(expanded)
        };

        let resource = clean_path(absolute)
            .to_str()
            .map(str::to_string)
            .ok_or_else(|| NavigationError::InvalidPath(format!("{path} is not valid UTF-8")))?;

        Ok(Self {
            scheme: Scheme::Local,
            host: String::new(),
            port: None,
            kind: None,
            full: format!("{LOCAL_PREFIX}{resource}"),
            resource,
            download_only: false,
        })
    }

    fn parse_general(input: &str) -> Result<Self> {
        let (scheme_name, rest) = split_scheme(input);

        let host_len = host_length(rest);
        if host_len == 0 {
            return Err(NavigationError::InvalidUrl(format!(
                "no host found in {input:?}"
            )));
        }
        let host = &rest[..host_len];
        let mut rest = &rest[host_len..];

        let mut port = None;
        if let Some(after_colon) = rest.strip_prefix(':') {
            let digits = after_colon
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after_colon.len());
            let remainder = &after_colon[digits..];
            if !remainder.is_empty() && !remainder.starts_with('/') {
                return Err(NavigationError::InvalidUrl(format!(
                    "invalid port in {input:?}"
                )));
            }
            if digits > 0 {
                port = Some(parse_port(input, &after_colon[..digits])?);
            }
            rest = remainder;
        }

        let mut kind = None;
        let mut resource = match rest.strip_prefix('/') {
            Some(after_slash) => {
                let mut chars = after_slash.chars();
                match chars.next() {
                    Some(c) if ITEM_TYPES.contains(c) => {
                        kind = Some(c);
                        chars.as_str().to_string()
                    }
                    _ => after_slash.to_string(),
                }
            }
            None => rest.to_string(),
        };

        // 1. scheme
        let scheme = scheme_name
            .map(Scheme::from_name)
            .unwrap_or(Scheme::Gopher);

        // 2. port
        let port = port.or_else(|| scheme.default_port());

        let mut download_only = false;
        if scheme == Scheme::Gopher {
            // 3. gopher item type
            if kind.is_none() || resource.is_empty() || resource == "/" {
                kind = Some(if resource.is_empty() || resource == "/" {
                    '1'
                } else {
                    '0'
                });
            }
            if kind == Some('7') && resource.contains('\t') {
                kind = Some('1');
            }

            // 4. download flag
            download_only = !matches!(kind, Some('1' | '0' | 'h' | '7'));
        } else if let Some(c) = kind.take() {
            // 5. the item type means nothing outside gopher
            resource.insert(0, c);
        }

        let full = format_full(&scheme, host, port, kind, &resource);

        Ok(Self {
            scheme,
            host: host.to_string(),
            port,
            kind,
            resource,
            full,
            download_only,
        })
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Gopher item type; always `None` for other schemes
    pub fn kind(&self) -> Option<char> {
        self.kind
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Canonical string form
    pub fn full(&self) -> &str {
        &self.full
    }

    pub fn is_download_only(&self) -> bool {
        self.download_only
    }

    /// `host:port` for opening a connection
    pub fn address(&self) -> String {
        match self.port {
            Some(port) if self.host.contains(':') && !self.host.starts_with('[') => {
                format!("[{}]:{}", self.host, port)
            }
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }

    /// Resolve a link target found on this page.
    ///
    /// Targets that already carry `://` are returned untouched; everything
    /// else follows RFC 3986 reference resolution against this address.
    pub fn resolve_relative(&self, target: &str) -> String {
        if target.contains("://") {
            return target.to_string();
        }

        match WebUrl::parse(&self.full).and_then(|base| base.join(target)) {
            Ok(joined) => joined.to_string(),
            Err(e) => {
                tracing::debug!(base = %self.full, target, error = %e, "Unable to resolve relative link");
                target.to_string()
            }
        }
    }

    /// Address that submits `text` as a query to this resource.
    ///
    /// Gopher appends a tab-separated search string; other schemes get a
    /// percent-encoded query component.
    pub fn with_query(&self, text: &str) -> String {
        match self.scheme {
            Scheme::Gopher => format!("{}\t{}", self.full, text),
            _ => match WebUrl::parse(&self.full) {
                Ok(mut url) => {
                    url.set_query(Some(text));
                    url.to_string()
                }
                Err(_) => format!("{}?{}", self.full, text),
            },
        }
    }

    /// Last path segment, used as a default name when saving
    pub fn file_name(&self) -> String {
        let path = self
            .resource
            .split(['\t', '?'])
            .next()
            .unwrap_or_default();

        path.rsplit(['/', '\\'])
            .find(|segment| !segment.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                if self.host.is_empty() {
                    "download".to_string()
                } else {
                    self.host.clone()
                }
            })
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl std::str::FromStr for Url {
    type Err = NavigationError;

    fn from_str(s: &str) -> Result<Self> {
        Url::parse(s)
    }
}

fn format_full(
    scheme: &Scheme,
    host: &str,
    port: Option<u16>,
    kind: Option<char>,
    resource: &str,
) -> String {
    let port = port.map(|p| p.to_string()).unwrap_or_default();
    let kind = kind.map(String::from).unwrap_or_default();
    format!("{scheme}://{host}:{port}/{kind}{resource}")
}

/// Split off a leading `scheme://`; the scheme must be alphabetic.
fn split_scheme(input: &str) -> (Option<&str>, &str) {
    if let Some((name, rest)) = input.split_once("://") {
        if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphabetic()) {
            return (Some(name), rest);
        }
    }
    (None, input)
}

/// Length of the host at the start of `input`, bracketed IPv6 included.
fn host_length(input: &str) -> usize {
    if input.starts_with('[') {
        return input.find(']').map(|end| end + 1).unwrap_or(0);
    }

    input
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '.' || c == '_'))
        .unwrap_or(input.len())
}

fn parse_port(input: &str, port: &str) -> Result<u16> {
    port.parse::<u16>()
        .map_err(|_| NavigationError::InvalidUrl(format!("invalid port {port:?} in {input:?}")))
}

/// Lexically normalise an absolute path: drop `.` and apply `..`.
fn clean_path(path: PathBuf) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if cleaned.parent().is_some() {
                    cleaned.pop();
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}
