use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub title: String,
    pub url: String,
}

/// Ordered bookmark list, numbered from 0 in the order they were added
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmarks {
    items: Vec<Bookmark>,
}

impl Bookmarks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from `[BOOKMARKS]` pairs (`title=url`)
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let items = pairs
            .into_iter()
            .map(|(title, url)| Bookmark {
                title: title.as_ref().trim().to_string(),
                url: url.as_ref().trim().to_string(),
            })
            .filter(|bookmark| !bookmark.url.is_empty())
            .collect();
        Self { items }
    }

    pub fn add(&mut self, url: &str, title: &str) -> Result<usize> {
        let title = normalize_title(title);
        if title.is_empty() {
            return Err(CoreError::Usage(
                "`add [target] [name...]` needs a name".to_string(),
            ));
        }

        self.items.push(Bookmark {
            title,
            url: url.to_string(),
        });
        Ok(self.items.len() - 1)
    }

    pub fn delete(&mut self, id: usize) -> Result<Bookmark> {
        if id >= self.items.len() {
            return Err(CoreError::InvalidBookmark(id));
        }
        Ok(self.items.remove(id))
    }

    pub fn get(&self, id: usize) -> Option<&Bookmark> {
        self.items.get(id)
    }

    pub fn items(&self) -> &[Bookmark] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Display lines, `[id] title`
    pub fn list(&self) -> Vec<String> {
        self.items
            .iter()
            .enumerate()
            .map(|(id, bookmark)| format!("[{id}] {}", bookmark.title))
            .collect()
    }

    /// Pairs written to `[BOOKMARKS]`
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.items
            .iter()
            .map(|bookmark| (bookmark.title.clone(), bookmark.url.clone()))
            .collect()
    }
}

/// Titles become INI keys, so `=` and brackets are replaced and runs of
/// whitespace collapse to one space.
fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(['=', '[', ']'], "-")
}
