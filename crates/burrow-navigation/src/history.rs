//! Bounded navigation history
//!
//! Holds the last [`HISTORY_CAPACITY`] visited pages. Going back and then
//! visiting something new discards the pages that were ahead of the
//! cursor. Once the history is full the oldest page is dropped.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::NavigationError;
use crate::page::{wrap_lines, Page};
use crate::Result;

pub const HISTORY_CAPACITY: usize = 20;

const WELCOME: &str = "\
Welcome to burrow

Type an address and press enter to visit it, or a link number to follow a
link on the current page.

  gopher://example.org      visit a gopher hole
  gemini://example.org      visit a gemini capsule
  ~/notes                   browse the local filesystem
  ?                         list the available commands
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum Cursor {
    Empty,
    At(usize),
}

/// A page plus the view state that belongs to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub page: Page,
    scroll_offset: usize,
    wrapped: Vec<String>,
    wrap_width: Option<usize>,
    search_term: Option<String>,
    matches: Vec<usize>,
    match_index: usize,
}

impl HistoryEntry {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            scroll_offset: 0,
            wrapped: Vec::new(),
            wrap_width: None,
            search_term: None,
            matches: Vec::new(),
            match_index: 0,
        }
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Wrapped lines from the last [`HistoryEntry::render`]
    pub fn wrapped(&self) -> &[String] {
        &self.wrapped
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search_term.as_deref()
    }

    /// Line indexes holding the current search term
    pub fn matches(&self) -> &[usize] {
        &self.matches
    }

    /// Wrap for `width` if needed and return the visible window.
    ///
    /// The scroll offset is scaled by the change in wrapped line count so
    /// roughly the same text stays on screen across a resize.
    pub fn render(&mut self, width: usize, height: usize) -> Vec<String> {
        if self.wrap_width != Some(width) {
            let old_len = self.wrapped.len();
            self.wrapped = wrap_lines(&self.page.content, width);
            self.wrap_width = Some(width);

            if old_len > 0 {
                self.scroll_offset = self.scroll_offset * self.wrapped.len() / old_len;
            }
            self.refresh_matches();
        }

        self.scroll_offset = self.scroll_offset.min(self.max_offset(height));
        self.wrapped
            .iter()
            .skip(self.scroll_offset)
            .take(height)
            .cloned()
            .collect()
    }

    /// Move the view by `amount` lines, negative is up
    pub fn scroll(&mut self, amount: isize, height: usize) -> Result<()> {
        let max = self.max_offset(height);
        if amount < 0 && self.scroll_offset == 0 {
            return Err(NavigationError::AtTop);
        }
        if amount > 0 && self.scroll_offset >= max {
            return Err(NavigationError::AtBottom);
        }

        self.scroll_offset = self
            .scroll_offset
            .saturating_add_signed(amount)
            .min(max);
        Ok(())
    }

    /// Record a case-insensitive search and jump to the first hit
    pub fn find(&mut self, term: &str, height: usize) -> Result<usize> {
        self.search_term = Some(term.to_lowercase());
        self.refresh_matches();

        let first = *self
            .matches
            .first()
            .ok_or_else(|| NavigationError::NoMatches(term.to_string()))?;
        self.match_index = 0;
        self.jump_to(first, height);
        Ok(self.matches.len())
    }

    pub fn next_match(&mut self, height: usize) -> Result<usize> {
        self.step_match(1, height)
    }

    pub fn previous_match(&mut self, height: usize) -> Result<usize> {
        self.step_match(-1, height)
    }

    fn step_match(&mut self, delta: isize, height: usize) -> Result<usize> {
        if self.matches.is_empty() {
            let term = self.search_term.clone().unwrap_or_default();
            return Err(NavigationError::NoMatches(term));
        }

        let count = self.matches.len() as isize;
        self.match_index = (self.match_index as isize + delta).rem_euclid(count) as usize;
        let line = self.matches[self.match_index];
        self.jump_to(line, height);
        Ok(line)
    }

    fn jump_to(&mut self, line: usize, height: usize) {
        self.scroll_offset = line.min(self.max_offset(height));
    }

    fn refresh_matches(&mut self) {
        self.matches = match &self.search_term {
            Some(term) if !term.is_empty() => {
                if self.wrapped.is_empty() {
                    self.wrapped = wrap_lines(&self.page.content, self.wrap_width.unwrap_or(80));
                }
                self.wrapped
                    .iter()
                    .enumerate()
                    .filter(|(_, line)| line.to_lowercase().contains(term.as_str()))
                    .map(|(index, _)| index)
                    .collect()
            }
            _ => Vec::new(),
        };
        if self.match_index >= self.matches.len() {
            self.match_index = 0;
        }
    }

    fn max_offset(&self, height: usize) -> usize {
        self.wrapped.len().saturating_sub(height)
    }
}

/// Fixed-capacity history with an explicit cursor
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    cursor: Cursor,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(HISTORY_CAPACITY),
            cursor: Cursor::Empty,
        }
    }

    /// Make `page` the current page
    pub fn add(&mut self, page: Page) {
        let location = page.location.full().to_string();
        let entry = HistoryEntry::new(page);

        match self.cursor {
            Cursor::Empty => {
                self.entries.clear();
                self.entries.push_back(entry);
                self.cursor = Cursor::At(0);
            }
            Cursor::At(position) if position + 1 == self.entries.len() => {
                if self.entries.len() == HISTORY_CAPACITY {
                    self.entries.pop_front();
                    self.entries.push_back(entry);
                } else {
                    self.entries.push_back(entry);
                    self.cursor = Cursor::At(position + 1);
                }
            }
            Cursor::At(position) => {
                self.entries.truncate(position + 1);
                self.entries.push_back(entry);
                self.cursor = Cursor::At(position + 1);
            }
        }

        tracing::debug!(
            location = %location,
            position = ?self.position(),
            len = self.entries.len(),
            "History entry added"
        );
    }

    /// Move the cursor by `delta` without wrapping
    pub fn navigate(&mut self, delta: isize) -> Result<()> {
        let current = match self.cursor {
            Cursor::Empty => -1,
            Cursor::At(position) => position as isize,
        };
        let target = current + delta;

        if target < 0 {
            return Err(NavigationError::AtBeginning);
        }
        if target > self.entries.len() as isize - 1 {
            return Err(NavigationError::AtEnd);
        }

        self.cursor = Cursor::At(target as usize);
        Ok(())
    }

    pub fn back(&mut self) -> Result<()> {
        self.navigate(-1)
    }

    pub fn forward(&mut self) -> Result<()> {
        self.navigate(1)
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        match self.cursor {
            Cursor::Empty => None,
            Cursor::At(position) => self.entries.get(position),
        }
    }

    pub fn current_mut(&mut self) -> Option<&mut HistoryEntry> {
        match self.cursor {
            Cursor::Empty => None,
            Cursor::At(position) => self.entries.get_mut(position),
        }
    }

    /// Swap the current page in place, keeping the scroll position
    pub fn replace_current(&mut self, page: Page) -> Result<()> {
        let entry = self.current_mut().ok_or(NavigationError::EmptyHistory)?;
        let offset = entry.scroll_offset;
        let term = entry.search_term.take();

        *entry = HistoryEntry::new(page);
        entry.scroll_offset = offset;
        entry.search_term = term;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.cursor, Cursor::Empty)
    }

    pub fn position(&self) -> Option<usize> {
        match self.cursor {
            Cursor::Empty => None,
            Cursor::At(position) => Some(position),
        }
    }

    /// Visible lines of the current page, or a welcome text when empty
    pub fn render(&mut self, width: usize, height: usize) -> Vec<String> {
        match self.current_mut() {
            Some(entry) => entry.render(width, height),
            None => wrap_lines(WELCOME, width)
                .into_iter()
                .take(height)
                .collect(),
        }
    }

    pub fn scroll(&mut self, amount: isize, height: usize) -> Result<()> {
        self.current_mut()
            .ok_or(NavigationError::EmptyHistory)?
            .scroll(amount, height)
    }
}
