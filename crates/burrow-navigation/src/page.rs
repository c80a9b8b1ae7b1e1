//! Fetched pages and text wrapping

use serde::{Deserialize, Serialize};

use crate::url::Url;

/// Width of a tab stop when laying out text
const TAB_WIDTH: usize = 4;

/// What a page holds, which decides how it may be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    /// Gophermap, gemtext or directory listing with numbered links
    Menu,
    Text,
    Binary,
    Image,
}

/// Status class of a gemini response header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeminiStatus {
    Input,
    Success,
    Redirect,
    TemporaryFailure,
    PermanentFailure,
    ClientCertificateRequired,
}

impl GeminiStatus {
    /// Map the first digit of a status code
    pub fn from_class(class: u8) -> Option<Self> {
        match class {
            1 => Some(GeminiStatus::Input),
            2 => Some(GeminiStatus::Success),
            3 => Some(GeminiStatus::Redirect),
            4 => Some(GeminiStatus::TemporaryFailure),
            5 => Some(GeminiStatus::PermanentFailure),
            6 => Some(GeminiStatus::ClientCertificateRequired),
            _ => None,
        }
    }

    pub fn class(&self) -> u8 {
        match self {
            GeminiStatus::Input => 1,
            GeminiStatus::Success => 2,
            GeminiStatus::Redirect => 3,
            GeminiStatus::TemporaryFailure => 4,
            GeminiStatus::PermanentFailure => 5,
            GeminiStatus::ClientCertificateRequired => 6,
        }
    }
}

/// A fetched document.
///
/// `content` is the display text; `payload` keeps the raw bytes so binary
/// responses can still be written to disk. `links` is indexed from 1 by
/// the user, so link `n` lives at `links[n - 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub location: Url,
    pub payload: Vec<u8>,
    pub content: String,
    pub links: Vec<String>,
    pub kind: ContentKind,
    pub status: Option<GeminiStatus>,
}

impl Page {
    pub fn new(location: Url, content: String, links: Vec<String>, kind: ContentKind) -> Self {
        Self {
            location,
            payload: content.as_bytes().to_vec(),
            content,
            links,
            kind,
            status: None,
        }
    }

    /// Plain text page without links
    pub fn text(location: Url, content: String) -> Self {
        Self::new(location, content, Vec::new(), ContentKind::Text)
    }

    /// Page whose bytes are not meant to be displayed
    pub fn binary(location: Url, payload: Vec<u8>, kind: ContentKind) -> Self {
        Self {
            location,
            payload,
            content: String::new(),
            links: Vec::new(),
            kind,
            status: None,
        }
    }

    pub fn with_status(mut self, status: GeminiStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Link target by its 1-based display number
    pub fn link(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|index| self.links.get(index))
            .map(String::as_str)
    }

    pub fn is_displayable(&self) -> bool {
        matches!(self.kind, ContentKind::Menu | ContentKind::Text)
    }
}

/// Split `content` into display lines no wider than `width` characters.
///
/// LF, CR LF, NEL, LS and PS all end a line. Tabs expand to spaces and
/// over-long lines are hard-wrapped.
pub fn wrap_lines(content: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let normalized = content.replace("\r\n", "\n");
    let mut out = Vec::new();

    for line in normalized.split(|c| matches!(c, '\n' | '\u{0085}' | '\u{2028}' | '\u{2029}')) {
        let expanded = line.replace('\t', &" ".repeat(TAB_WIDTH));
        let chars: Vec<char> = expanded.chars().collect();

        if chars.is_empty() {
            out.push(String::new());
            continue;
        }

        out.extend(chars.chunks(width).map(|chunk| chunk.iter().collect::<String>()));
    }

    out
}
