//! Gopher fetching and the gophermap parser

use std::time::Duration;

use burrow_navigation::{ContentKind, Page, Scheme, Url};

use crate::error::FetchError;
use crate::net;
use crate::Result;

/// Indent for information lines, lines them up with link labels
const INFO_INDENT: &str = "           ";

/// Three-letter display code for a gopher item type
pub fn item_type_code(kind: char) -> &'static str {
    match kind {
        '0' => "TXT",
        '1' => "MAP",
        '3' => "ERR",
        '4' => "BIN",
        '5' => "DOS",
        '6' => "UUE",
        '7' => "FTS",
        '8' => "TEL",
        '9' => "BIN",
        'T' => "TEL",
        'G' => "GEM",
        'h' => "HTM",
        'g' => "GIF",
        'I' => "IMG",
        's' => "SND",
        'p' => "PNG",
        'd' => "DOC",
        _ => "???",
    }
}

/// Bytes sent as the request for `url`.
///
/// Web addresses that end up here send only their item-type character,
/// which older gopher servers answer with their HTML redirect page.
/// [`crate::dispatch`] hands web addresses to the launcher, so this only
/// applies when the gopher handler is called with one directly.
pub fn request_line(url: &Url) -> String {
    match url.scheme() {
        Scheme::Http | Scheme::Https => {
            let kind = url
                .resource()
                .chars()
                .next()
                .filter(|c| "01345679gIhisp".contains(*c))
                .map(String::from)
                .unwrap_or_default();
            format!("{kind}\n")
        }
        _ => format!("{}\n", url.resource()),
    }
}

pub fn fetch_raw(url: &Url, timeout: Duration) -> Result<Vec<u8>> {
    let mut stream = net::connect(url, timeout)?;
    net::exchange(&mut stream, &url.address(), request_line(url).as_bytes())
}

pub fn visit(url: &Url, timeout: Duration) -> Result<Page> {
    let payload = fetch_raw(url, timeout)?;

    let page = match url.kind() {
        Some('1' | '7') => {
            let (content, links) = parse_gophermap(&String::from_utf8_lossy(&payload))?;
            Page {
                payload,
                ..Page::new(url.clone(), content, links, ContentKind::Menu)
            }
        }
        Some('g' | 'I' | 'p') => Page::binary(url.clone(), payload, ContentKind::Image),
        _ if url.is_download_only() => Page::binary(url.clone(), payload, ContentKind::Binary),
        _ => {
            let content = String::from_utf8_lossy(&payload).into_owned();
            Page {
                payload,
                ..Page::text(url.clone(), content)
            }
        }
    };

    tracing::debug!(url = %url, bytes = page.payload.len(), "Gopher response received");
    Ok(page)
}

/// Turn a gophermap into display text and its numbered links.
///
/// A menu whose first line is an error item fails with the item's label.
pub fn parse_gophermap(text: &str) -> Result<(String, Vec<String>)> {
    let mut lines = Vec::new();
    let mut links = Vec::new();

    for (index, raw) in text.split('\n').enumerate() {
        let line = raw.trim_end_matches('\r');

        if line == "." {
            lines.push(String::new());
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        let mut label_chars = fields[0].chars();
        let Some(kind) = label_chars.next() else {
            lines.push(String::new());
            continue;
        };
        let label = label_chars.as_str();

        if index == 0 && kind == '3' {
            return Err(FetchError::ServerFailure {
                message: label.to_string(),
            });
        }

        if kind == 'i' {
            lines.push(format!("{INFO_INDENT}{label}"));
            continue;
        }

        if fields.len() < 4 {
            lines.push(line.to_string());
            continue;
        }

        let selector = fields[1];
        let host = fields[2].trim();
        let port = fields[3].trim();

        links.push(link_for(kind, selector, host, port));
        lines.push(format!(
            "({}) {:2}   {}",
            item_type_code(kind),
            links.len(),
            label
        ));
    }

    Ok((lines.join("\n"), links))
}

fn link_for(kind: char, selector: &str, host: &str, port: &str) -> String {
    match kind {
        '8' | 'T' => format!("telnet://{host}:{port}"),
        'G' => format!(
            "gemini://{host}:{port}/{}",
            selector.strip_prefix('/').unwrap_or(selector)
        ),
        'h' if selector.starts_with("URL:") => {
            let target = selector["URL:".len()..].trim();
            if target.contains("://") {
                target.to_string()
            } else {
                format!("http://{target}")
            }
        }
        _ => format!("gopher://{host}:{port}/{kind}{selector}"),
    }
}
