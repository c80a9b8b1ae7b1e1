//! Local files and directory listings

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use burrow_navigation::{ContentKind, Page, Url};

use crate::error::FetchError;
use crate::Result;

pub fn fetch_raw(url: &Url) -> Result<Vec<u8>> {
    let path = url.resource();
    fs::read(path).map_err(|e| read_error(path, e))
}

pub fn open(url: &Url) -> Result<Page> {
    let path = Path::new(url.resource());
    let metadata = fs::metadata(path).map_err(|e| read_error(url.resource(), e))?;

    if metadata.is_dir() {
        return list_directory(url, path);
    }

    let bytes = fs::read(path).map_err(|e| read_error(url.resource(), e))?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => Page::text(url.clone(), text),
        Err(e) => Page::binary(url.clone(), e.into_bytes(), ContentKind::Binary),
    })
}

fn list_directory(url: &Url, path: &Path) -> Result<Page> {
    let shown = url.resource();
    let mut entries = fs::read_dir(path)
        .map_err(|e| read_error(shown, e))?
        .filter_map(|entry| entry.ok())
        .collect::<Vec<_>>();
    entries.sort_by_key(|entry| entry.file_name());

    let mut content = format!("Current directory: {shown}\n\n");
    let mut links = Vec::new();

    if let Some(parent) = path.parent() {
        if let Ok(metadata) = fs::metadata(parent) {
            links.push(format!("local://{}", parent.display()));
            content.push_str(&listing_line(links.len(), &metadata, "../"));
        }
    }

    for entry in entries {
        // broken symlinks and vanished files are skipped
        let Ok(metadata) = fs::metadata(entry.path()) else {
            continue;
        };
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if metadata.is_dir() {
            name.push('/');
        }

        links.push(format!("local://{}", entry.path().display()));
        content.push_str(&listing_line(links.len(), &metadata, &name));
    }

    tracing::debug!(path = %shown, entries = links.len(), "Listed directory");
    Ok(Page::new(url.clone(), content, links, ContentKind::Menu))
}

fn listing_line(number: usize, metadata: &fs::Metadata, name: &str) -> String {
    format!(
        "{:<5} {:<12}   {}\n",
        format!("[{number}]"),
        mode_string(metadata),
        name
    )
}

/// `drwxr-xr-x` style permissions
#[cfg(unix)]
fn mode_string(metadata: &fs::Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode();
    let kind = if metadata.is_dir() { 'd' } else { '-' };
    let bits = ['r', 'w', 'x'];

    std::iter::once(kind)
        .chain((0..9).map(|i| {
            if mode & (0o400 >> i) != 0 {
                bits[i % 3]
            } else {
                '-'
            }
        }))
        .collect()
}

#[cfg(not(unix))]
fn mode_string(metadata: &fs::Metadata) -> String {
    let kind = if metadata.is_dir() { 'd' } else { '-' };
    let write = if metadata.permissions().readonly() { '-' } else { 'w' };
    format!("{kind}r{write}-------")
}

fn read_error(path: &str, source: std::io::Error) -> FetchError {
    if source.kind() == ErrorKind::NotFound {
        FetchError::NotFound(path.to_string())
    } else {
        FetchError::Read {
            path: path.to_string(),
            source,
        }
    }
}
