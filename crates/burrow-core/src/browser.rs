//! Navigation engine
//!
//! [`Browser`] owns every piece of state. Front ends hand it command lines
//! and render whatever it reports back; a failed command leaves the
//! history and the current page exactly as they were.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;

use burrow_navigation::{Action, Command, GeminiStatus, History, Page, Scheme, Url};
use burrow_protocols::{dispatch, fetch_raw, FetchContext, Launcher, Response};
use burrow_storage::{ConfigStore, IniDocument};
use burrow_trust::{TrustStore, WILDCARD};

use crate::bookmarks::{Bookmark, Bookmarks};
use crate::config::{Config, WebMode};
use crate::error::CoreError;
use crate::Result;

const HELP: [(&str, &str); 13] = [
    ("[address]", "visit an address"),
    ("[link]", "follow a link on the current page"),
    ("a [target] [name...]", "bookmark an address, `.` or a link"),
    ("d [bookmark-id]", "delete a bookmark"),
    ("b [[bookmark-id]]", "list bookmarks, or visit one"),
    ("c [link-id] | c [setting]", "show a link address or a setting"),
    ("h", "visit the home address"),
    ("q", "quit"),
    ("r", "reload the current page"),
    ("search [[keyword(s)...]]", "search with the configured engine"),
    ("s [setting] [value]", "change a setting"),
    ("w [target] [[name...]]", "save an address, `.` or a link to disk"),
    ("?", "show this help"),
];

/// What a command did, for the front end to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A page became current; carries its address
    Page(String),
    Message(String),
    /// A line of input is wanted, answer with [`Browser::submit_input`]
    Prompt(String),
    /// Handed to an outside program, carries its status line
    Launched(String),
    Quit,
    Bookmarks(Vec<Bookmark>),
    Help(Vec<String>),
}

/// Where rendered pages go
pub trait RenderSink {
    fn draw_lines(&mut self, lines: &[String]) -> std::io::Result<()>;
    fn draw_status(&mut self, status: &str) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
enum Pending {
    /// Gemini input request for this address
    Input(Url),
    /// Search terms for this engine
    Search(Url),
    /// Redirect target waiting for confirmation
    Redirect(String),
}

pub struct Browser {
    config: Config,
    store: ConfigStore,
    trust: TrustStore,
    history: History,
    bookmarks: Bookmarks,
    launcher: Option<Box<dyn Launcher>>,
    pending: Option<Pending>,
}

impl Browser {
    /// Engine with `config` and nothing loaded from disk
    pub fn new(config: Config) -> Self {
        let store = ConfigStore::open(config.config_file());
        Self {
            config,
            store,
            trust: TrustStore::new(),
            history: History::new(),
            bookmarks: Bookmarks::new(),
            launcher: None,
            pending: None,
        }
    }

    /// Engine with settings, bookmarks and pins read from the config file
    pub fn open(config: Config) -> Result<Self> {
        let mut browser = Self::new(config);
        browser.load()?;
        Ok(browser)
    }

    pub fn with_launcher(mut self, launcher: Box<dyn Launcher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn load(&mut self) -> Result<()> {
        let document = self.store.load()?;

        self.config.load_settings(document.settings);
        self.bookmarks = Bookmarks::from_pairs(document.bookmarks);
        let pins = self.trust.load(document.certs, Utc::now());

        tracing::info!(
            path = %self.store.path().display(),
            bookmarks = self.bookmarks.len(),
            pins,
            "Config loaded"
        );
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bookmarks(&self) -> &Bookmarks {
        &self.bookmarks
    }

    pub fn trust(&self) -> &TrustStore {
        &self.trust
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Parse `line` and carry it out
    pub fn execute(&mut self, line: &str) -> Result<Outcome> {
        let command = Command::parse(line)?;
        tracing::debug!(command = ?command, "Executing");

        match command {
            Command::Simple { action } => self.simple(action),
            Command::GoUrl { target } => self.visit(&target),
            Command::GoLink { target } => {
                let link = self.link(target)?;
                self.visit(&link)
            }
            Command::Do { action, value } => self.do_command(action, &value),
            Command::DoAs { action, values } => self.do_as(action, values),
            Command::DoLink { action, target } => self.do_link(action, target),
            Command::DoLinkAs {
                action,
                target,
                values,
            } => self.do_link_as(action, target, values),
        }
    }

    fn simple(&mut self, action: Action) -> Result<Outcome> {
        match action {
            Action::Quit => Ok(Outcome::Quit),
            Action::Home => {
                if self.config.homeurl.trim().is_empty() {
                    return Ok(Outcome::Message("No home address has been set".to_string()));
                }
                let home = self.config.homeurl.clone();
                self.visit(&home)
            }
            Action::Bookmarks => Ok(Outcome::Bookmarks(self.bookmarks.items().to_vec())),
            Action::Search => {
                let engine = self.search_engine()?;
                self.pending = Some(Pending::Search(engine));
                Ok(Outcome::Prompt("Search:".to_string()))
            }
            Action::Reload => self.reload(),
            Action::Help => Ok(Outcome::Help(help_lines())),
            other => Err(usage(other)),
        }
    }

    fn do_command(&mut self, action: Action, value: &str) -> Result<Outcome> {
        match action {
            Action::Check => match self.config.get(value) {
                Some(setting) => Ok(Outcome::Message(format!(
                    "{} is set to: {setting:?}",
                    value.to_ascii_lowercase()
                ))),
                None => Err(CoreError::Config(format!("Invalid: {value:?} does not exist"))),
            },
            Action::Search => self.search(value),
            Action::Write => self.write_target(value, None),
            other => Err(usage(other)),
        }
    }

    fn do_as(&mut self, action: Action, values: Vec<String>) -> Result<Outcome> {
        let Some((first, rest)) = values.split_first() else {
            return Err(usage(action));
        };
        let rest = rest.join(" ");

        match action {
            Action::Add => {
                let url = self.target_address(first)?;
                self.add_bookmark(&url, &rest)
            }
            Action::Set => {
                self.config.set(first, &rest)?;
                let key = first.to_ascii_lowercase();
                let value = self.config.get(&key).unwrap_or_default();
                tracing::info!(key = %key, value = %value, "Setting changed");
                Ok(self.persist_with(format!("{key} is now set to {value:?}")))
            }
            Action::Write => self.write_target(first, Some(&rest)),
            Action::Search => self.search(&values.join(" ")),
            other => Err(usage(other)),
        }
    }

    fn do_link(&mut self, action: Action, target: usize) -> Result<Outcome> {
        match action {
            Action::Delete => {
                let removed = self.bookmarks.delete(target)?;
                tracing::info!(title = %removed.title, "Bookmark deleted");
                Ok(self.persist_with("Bookmark deleted successfully".to_string()))
            }
            Action::Bookmarks => {
                let url = self
                    .bookmarks
                    .get(target)
                    .map(|bookmark| bookmark.url.clone())
                    .ok_or(CoreError::InvalidBookmark(target))?;
                self.visit(&url)
            }
            Action::Check => {
                let link = self.link(target)?;
                Ok(Outcome::Message(format!("[{target}] {link}")))
            }
            Action::Write => {
                let link = self.link(target)?;
                self.write_address(&link, None)
            }
            other => Err(usage(other)),
        }
    }

    fn do_link_as(&mut self, action: Action, target: usize, values: Vec<String>) -> Result<Outcome> {
        let rest = values.join(" ");
        match action {
            Action::Add => {
                let link = self.link(target)?;
                self.add_bookmark(&link, &rest)
            }
            Action::Write => {
                let link = self.link(target)?;
                self.write_address(&link, Some(&rest))
            }
            other => Err(usage(other)),
        }
    }

    /// Resolve `target`, fetch it and make it the current page.
    pub fn visit(&mut self, target: &str) -> Result<Outcome> {
        let url = Url::parse(target)?;

        if matches!(url.scheme(), Scheme::Http | Scheme::Https) && self.config.webmode == WebMode::None {
            return Err(CoreError::Config(
                "'webmode' is set to none, cannot open web link".to_string(),
            ));
        }

        // a type 7 selector without a query waits for one
        if url.scheme() == &Scheme::Gopher && url.kind() == Some('7') {
            tracing::debug!(url = %url, "Search selector needs a query");
            self.pending = Some(Pending::Search(url));
            return Ok(Outcome::Prompt("Query:".to_string()));
        }

        tracing::info!(url = %url, "Visiting");
        match self.fetch(&url)? {
            Response::Launched(status) => Ok(Outcome::Launched(status)),
            Response::Page(page) => self.accept(page, false),
        }
    }

    /// Fetch the current page again and swap it in place
    pub fn reload(&mut self) -> Result<Outcome> {
        let url = self
            .history
            .current()
            .map(|entry| entry.page.location.clone())
            .ok_or(burrow_navigation::NavigationError::EmptyHistory)?;

        tracing::info!(url = %url, "Reloading");
        match self.fetch(&url)? {
            Response::Launched(status) => Ok(Outcome::Launched(status)),
            Response::Page(page) => self.accept(page, true),
        }
    }

    /// Answer the last [`Outcome::Prompt`]
    pub fn submit_input(&mut self, text: &str) -> Result<Outcome> {
        match self.pending.take() {
            Some(Pending::Input(url)) => self.visit(&url.with_query(text)),
            Some(Pending::Search(engine)) => {
                if text.trim().is_empty() {
                    return Ok(Outcome::Message("Search cancelled".to_string()));
                }
                self.visit(&engine.with_query(text.trim()))
            }
            other => {
                self.pending = other;
                Err(CoreError::NothingPending)
            }
        }
    }

    /// Visit the target of the last gemini redirect
    pub fn follow_redirect(&mut self) -> Result<Outcome> {
        match self.pending.take() {
            Some(Pending::Redirect(target)) => self.visit(&target),
            other => {
                self.pending = other;
                Err(CoreError::NothingPending)
            }
        }
    }

    /// Forget the pinned certificate for `host`, or all of them for `*`
    pub fn purge_certificate(&mut self, host: &str) -> Result<Outcome> {
        self.trust.purge(host)?;
        let message = if host == WILDCARD {
            "All certificates purged".to_string()
        } else {
            format!("Certificate for {} purged", host.to_lowercase())
        };
        Ok(self.persist_with(message))
    }

    pub fn back(&mut self) -> Result<()> {
        Ok(self.history.back()?)
    }

    pub fn forward(&mut self) -> Result<()> {
        Ok(self.history.forward()?)
    }

    pub fn scroll(&mut self, amount: isize, height: usize) -> Result<()> {
        Ok(self.history.scroll(amount, height)?)
    }

    /// Search the current page, returning the number of matching lines
    pub fn find(&mut self, term: &str, height: usize) -> Result<usize> {
        Ok(self.current_entry()?.find(term, height)?)
    }

    pub fn next_match(&mut self, height: usize) -> Result<usize> {
        Ok(self.current_entry()?.next_match(height)?)
    }

    pub fn previous_match(&mut self, height: usize) -> Result<usize> {
        Ok(self.current_entry()?.previous_match(height)?)
    }

    pub fn render(&mut self, width: usize, height: usize) -> Vec<String> {
        self.history.render(width, height)
    }

    /// Push the visible page and a status line to `sink`
    pub fn draw(&mut self, sink: &mut dyn RenderSink, width: usize, height: usize) -> std::io::Result<()> {
        let lines = self.history.render(width, height.saturating_sub(1).max(1));
        sink.draw_lines(&lines)?;
        sink.draw_status(&self.status_line())
    }

    fn status_line(&self) -> String {
        match (self.history.current(), self.history.position()) {
            (Some(entry), Some(position)) => format!(
                "{} [{}/{}]",
                entry.page.location,
                position + 1,
                self.history.len()
            ),
            _ => "burrow".to_string(),
        }
    }

    fn current_entry(&mut self) -> Result<&mut burrow_navigation::HistoryEntry> {
        Ok(self
            .history
            .current_mut()
            .ok_or(burrow_navigation::NavigationError::EmptyHistory)?)
    }

    /// Decide what a fetched page turns into
    fn accept(&mut self, page: Page, reload: bool) -> Result<Outcome> {
        let url = page.location.clone();

        match page.status {
            Some(GeminiStatus::Input) => {
                self.pending = Some(Pending::Input(url));
                return Ok(Outcome::Prompt(page.content));
            }
            Some(GeminiStatus::Redirect) => {
                let target = url.resolve_relative(page.content.trim());
                tracing::info!(from = %url, to = %target, "Redirect requested");
                let message = format!("[3] Redirect. Follow redirect? To: {target}");
                self.pending = Some(Pending::Redirect(target));
                return Ok(Outcome::Message(message));
            }
            _ => {}
        }

        if url.is_download_only() || !page.is_displayable() {
            let path = self.save(&url.file_name(), &page.payload)?;
            return Ok(Outcome::Message(format!("File saved to: {}", path.display())));
        }

        let location = url.full().to_string();
        if reload {
            self.history.replace_current(page)?;
        } else {
            self.history.add(page);
        }
        self.pending = None;
        Ok(Outcome::Page(location))
    }

    fn fetch(&self, url: &Url) -> Result<Response> {
        let pins = self.trust.dump();
        let result = dispatch(url, &self.context());
        self.persist_pins(url, pins);
        Ok(result?)
    }

    fn context(&self) -> FetchContext<'_> {
        FetchContext {
            blocks: self.config.geminiblocks,
            launcher: self.launcher.as_deref(),
            ..FetchContext::new(&self.trust, self.config.timeout())
        }
    }

    /// Write the trust store out if the last fetch pinned something new
    fn persist_pins(&self, url: &Url, before: Vec<(String, String)>) {
        if !matches!(url.scheme(), Scheme::Gemini) || self.trust.dump() == before {
            return;
        }
        if let Err(e) = self.persist() {
            tracing::warn!(host = %url.host(), error = %e, "Unable to save pinned certificate");
        }
    }

    fn search_engine(&self) -> Result<Url> {
        let engine = Url::parse(&self.config.searchengine).map_err(|_| {
            CoreError::Config("'searchengine' is not set to a valid url".to_string())
        })?;

        match engine.scheme() {
            Scheme::Gopher | Scheme::Gemini | Scheme::Http | Scheme::Https => Ok(engine),
            other => Err(CoreError::Config(format!(
                "{:?} is not a supported protocol",
                other.as_str()
            ))),
        }
    }

    fn search(&mut self, terms: &str) -> Result<Outcome> {
        let engine = self.search_engine()?;
        self.visit(&engine.with_query(terms))
    }

    /// Link `number` of the current page, resolved to an absolute address
    fn link(&self, number: usize) -> Result<String> {
        self.history
            .current()
            .and_then(|entry| entry.page.link(number))
            .map(str::to_string)
            .ok_or(CoreError::InvalidLink(number))
    }

    /// `.` is the current page, anything else must be a valid address
    fn target_address(&self, target: &str) -> Result<String> {
        if target == "." {
            return self
                .history
                .current()
                .map(|entry| entry.page.location.full().to_string())
                .ok_or_else(|| burrow_navigation::NavigationError::EmptyHistory.into());
        }
        Ok(Url::parse(target)?.full().to_string())
    }

    fn add_bookmark(&mut self, url: &str, title: &str) -> Result<Outcome> {
        self.bookmarks.add(url, title)?;
        tracing::info!(url = %url, "Bookmark added");
        Ok(self.persist_with("Bookmark added successfully".to_string()))
    }

    fn write_target(&mut self, target: &str, name: Option<&str>) -> Result<Outcome> {
        if target != "." {
            return self.write_address(target, name);
        }

        let entry = self
            .history
            .current()
            .ok_or(burrow_navigation::NavigationError::EmptyHistory)?;
        let name = name.map(str::to_string).unwrap_or_else(|| entry.page.location.file_name());
        let payload = entry.page.payload.clone();

        let path = self.save(&name, &payload)?;
        Ok(Outcome::Message(format!("File saved to: {}", path.display())))
    }

    fn write_address(&mut self, address: &str, name: Option<&str>) -> Result<Outcome> {
        let url = Url::parse(address)?;
        let name = name.map(str::to_string).unwrap_or_else(|| url.file_name());

        let pins = self.trust.dump();
        let result = fetch_raw(&url, &self.context());
        self.persist_pins(&url, pins);

        let path = self.save(&name, &result?)?;
        Ok(Outcome::Message(format!("File saved to: {}", path.display())))
    }

    fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.config.savelocation.join(name);
        fs::write(&path, bytes).map_err(|source| CoreError::Save {
            path: path.display().to_string(),
            source,
        })?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), "File saved");
        Ok(path)
    }

    fn persist(&self) -> Result<()> {
        let document = IniDocument {
            settings: self.config.settings(),
            bookmarks: self.bookmarks.to_pairs(),
            certs: self.trust.dump(),
        };
        Ok(self.store.save(&document)?)
    }

    /// Save to disk; a failure is logged and appended to `message`
    fn persist_with(&self, message: String) -> Outcome {
        match self.persist() {
            Ok(()) => Outcome::Message(message),
            Err(e) => {
                tracing::warn!(path = %self.store.path().display(), error = %e, "Unable to save config");
                Outcome::Message(format!("{message}, but the config file could not be saved: {e}"))
            }
        }
    }
}

fn help_lines() -> Vec<String> {
    HELP.iter()
        .map(|(syntax, meaning)| format!("{syntax:<28}{meaning}"))
        .collect()
}

fn usage(action: Action) -> CoreError {
    let syntax = match action {
        Action::Add => "`add [target] [name...]`",
        Action::Delete => "`delete [bookmark-id]`",
        Action::Write => "`write [target] [[name...]]`",
        Action::Set => "`set [setting] [value]`",
        Action::Search => "`search [[keyword(s)...]]`",
        Action::Home => "`home`",
        Action::Quit => "`quit`",
        Action::Bookmarks => "`bookmarks [[bookmark-id]]`",
        Action::Check => "`check [link_id]` or `check [setting]`",
        Action::Reload => "`reload`",
        Action::Help => "`help`",
    };
    CoreError::Usage(format!("Syntax: {syntax}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::{mpsc, Mutex};
    use std::thread;
    use tempfile::TempDir;

    struct Fixture {
        config_dir: TempDir,
        downloads: TempDir,
        pages: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let fixture = Self {
                config_dir: tempfile::tempdir().unwrap(),
                downloads: tempfile::tempdir().unwrap(),
                pages: tempfile::tempdir().unwrap(),
            };
            fs::write(fixture.pages.path().join("a.txt"), "hello from a").unwrap();
            fs::write(fixture.pages.path().join("b.bin"), [0xff, 0x00, 0xfe]).unwrap();
            fixture
        }

        fn config(&self) -> Config {
            Config::new(
                self.downloads.path().to_path_buf(),
                self.config_dir.path().to_path_buf(),
            )
        }

        fn page(&self, name: &str) -> String {
            self.pages.path().join(name).display().to_string()
        }
    }

    /// One-shot gopher server; yields the request line it received
    fn serve_once(response: &'static [u8]) -> (u16, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut line = String::new();
                let _ = reader.read_line(&mut line);
                let _ = tx.send(line);
                let _ = stream.write_all(response);
            }
        });

        (port, rx)
    }

    #[derive(Default)]
    struct RecordingSink {
        lines: Vec<String>,
        status: String,
    }

    impl RenderSink for RecordingSink {
        fn draw_lines(&mut self, lines: &[String]) -> std::io::Result<()> {
            self.lines = lines.to_vec();
            Ok(())
        }

        fn draw_status(&mut self, status: &str) -> std::io::Result<()> {
            self.status = status.to_string();
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingLauncher {
        seen: Mutex<Vec<String>>,
    }

    impl Launcher for RecordingLauncher {
        fn launch(&self, url: &Url) -> std::io::Result<String> {
            self.seen.lock().unwrap().push(url.full().to_string());
            Ok("opened".to_string())
        }
    }

    #[test]
    fn test_visit_and_follow_link() {
        let fixture = Fixture::new();
        let mut browser = Browser::new(fixture.config());

        let outcome = browser.execute(&fixture.pages.path().display().to_string()).unwrap();
        assert!(matches!(outcome, Outcome::Page(location) if location.starts_with("local://")));

        // link 1 is the parent directory, 2 is a.txt
        let outcome = browser.execute("2").unwrap();
        assert!(matches!(outcome, Outcome::Page(location) if location.ends_with("a.txt")));
        assert_eq!(browser.history().len(), 2);
        assert_eq!(browser.render(80, 10), vec!["hello from a".to_string()]);

        browser.back().unwrap();
        assert_eq!(browser.history().position(), Some(0));
    }

    #[test]
    fn test_failures_leave_history_untouched() {
        let fixture = Fixture::new();
        let mut browser = Browser::new(fixture.config());
        browser.execute(&fixture.page("a.txt")).unwrap();

        assert!(matches!(browser.execute("7"), Err(CoreError::InvalidLink(7))));
        assert!(matches!(
            browser.execute(&fixture.page("missing.txt")),
            Err(CoreError::Fetch(_))
        ));
        assert!(matches!(browser.execute("a q"), Err(CoreError::Navigation(_))));

        assert_eq!(browser.history().len(), 1);
        let current = browser.history().current().unwrap();
        assert!(current.page.location.full().ends_with("a.txt"));
    }

    #[test]
    fn test_simple_commands() {
        let fixture = Fixture::new();
        let mut browser = Browser::new(fixture.config());

        assert_eq!(browser.execute("q").unwrap(), Outcome::Quit);
        assert_eq!(browser.execute("BOOKMARKS").unwrap(), Outcome::Bookmarks(Vec::new()));
        match browser.execute("?").unwrap() {
            Outcome::Help(lines) => assert!(lines.iter().any(|l| l.contains("search"))),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(matches!(browser.execute("a"), Err(CoreError::Usage(_))));
        assert!(matches!(browser.execute("h here"), Err(CoreError::Usage(_))));
        assert!(matches!(
            browser.execute("r"),
            Err(CoreError::Navigation(_))
        ));
    }

    #[test]
    fn test_bookmarks_are_persisted() {
        let fixture = Fixture::new();
        let mut browser = Browser::new(fixture.config());
        browser.execute(&fixture.page("a.txt")).unwrap();

        let outcome = browser.execute("a . letter one").unwrap();
        assert_eq!(outcome, Outcome::Message("Bookmark added successfully".to_string()));
        browser.execute("a gopher://example.org other hole").unwrap();

        let mut reopened = Browser::open(fixture.config()).unwrap();
        let titles: Vec<&str> = reopened
            .bookmarks()
            .items()
            .iter()
            .map(|b| b.title.as_str())
            .collect();
        assert_eq!(titles, vec!["letter one", "other hole"]);
        assert_eq!(
            reopened.bookmarks().get(1).unwrap().url,
            "gopher://example.org:70/1"
        );

        reopened.execute("b 0").unwrap();
        assert!(reopened
            .history()
            .current()
            .unwrap()
            .page
            .location
            .full()
            .ends_with("a.txt"));

        reopened.execute("d 0").unwrap();
        assert_eq!(reopened.bookmarks().len(), 1);
        assert!(matches!(reopened.execute("d 9"), Err(CoreError::InvalidBookmark(9))));
        assert_eq!(Browser::open(fixture.config()).unwrap().bookmarks().len(), 1);
    }

    #[test]
    fn test_set_and_check_settings() {
        let fixture = Fixture::new();
        let mut browser = Browser::new(fixture.config());

        assert_eq!(
            browser.execute("s timeout 30").unwrap(),
            Outcome::Message("timeout is now set to \"30\"".to_string())
        );
        assert_eq!(
            browser.execute("c TIMEOUT").unwrap(),
            Outcome::Message("timeout is set to: \"30\"".to_string())
        );
        assert!(matches!(browser.execute("s timeout soon"), Err(CoreError::Config(_))));
        assert!(matches!(
            browser.execute("s configlocation /tmp"),
            Err(CoreError::Config(_))
        ));
        assert!(matches!(browser.execute("c colour"), Err(CoreError::Config(_))));

        let reopened = Browser::open(fixture.config()).unwrap();
        assert_eq!(reopened.config().timeout, 30);
    }

    #[test]
    fn test_check_link() {
        let fixture = Fixture::new();
        let mut browser = Browser::new(fixture.config());
        browser.execute(&fixture.pages.path().display().to_string()).unwrap();

        match browser.execute("c 2").unwrap() {
            Outcome::Message(message) => {
                assert!(message.starts_with("[2] local://"));
                assert!(message.ends_with("a.txt"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_write_current_page_and_links() {
        let fixture = Fixture::new();
        let mut browser = Browser::new(fixture.config());
        browser.execute(&fixture.pages.path().display().to_string()).unwrap();

        browser.execute("w 2").unwrap();
        assert_eq!(
            fs::read_to_string(fixture.downloads.path().join("a.txt")).unwrap(),
            "hello from a"
        );

        browser.execute("w 2 copy one").unwrap();
        assert!(fixture.downloads.path().join("copy one").exists());

        browser.execute("2").unwrap();
        let outcome = browser.execute("w . saved.txt").unwrap();
        let expected = fixture.downloads.path().join("saved.txt");
        assert_eq!(
            outcome,
            Outcome::Message(format!("File saved to: {}", expected.display()))
        );
        assert_eq!(fs::read_to_string(expected).unwrap(), "hello from a");
    }

    #[test]
    fn test_binary_pages_are_saved_not_shown() {
        let fixture = Fixture::new();
        let mut browser = Browser::new(fixture.config());

        let outcome = browser.execute(&fixture.page("b.bin")).unwrap();
        assert!(matches!(outcome, Outcome::Message(m) if m.starts_with("File saved to: ")));
        assert!(browser.history().is_empty());
        assert_eq!(
            fs::read(fixture.downloads.path().join("b.bin")).unwrap(),
            vec![0xff, 0x00, 0xfe]
        );
    }

    #[test]
    fn test_reload_replaces_in_place() {
        let fixture = Fixture::new();
        let mut browser = Browser::new(fixture.config());
        browser.execute(&fixture.page("a.txt")).unwrap();

        fs::write(fixture.pages.path().join("a.txt"), "changed").unwrap();
        assert!(matches!(browser.execute("r").unwrap(), Outcome::Page(_)));
        assert_eq!(browser.history().len(), 1);
        assert_eq!(browser.render(80, 5), vec!["changed".to_string()]);
    }

    #[test]
    fn test_search_prompt_uses_gopher_query() {
        let fixture = Fixture::new();
        let (port, requests) = serve_once(b"iNo results\t\terror.host\t1\r\n.\r\n");
        let mut config = fixture.config();
        config.searchengine = format!("gopher://127.0.0.1:{port}/7/search");
        let mut browser = Browser::new(config);

        assert_eq!(
            browser.execute("search").unwrap(),
            Outcome::Prompt("Search:".to_string())
        );
        let outcome = browser.submit_input("small web").unwrap();
        assert!(matches!(outcome, Outcome::Page(_)));
        assert_eq!(requests.recv().unwrap(), "/search\tsmall web\n");
        assert!(browser.render(80, 5)[0].contains("No results"));

        assert!(matches!(
            browser.submit_input("again"),
            Err(CoreError::NothingPending)
        ));
        assert!(matches!(browser.follow_redirect(), Err(CoreError::NothingPending)));
    }

    #[test]
    fn test_search_selector_prompts_before_fetching() {
        let fixture = Fixture::new();
        let (port, requests) = serve_once(b"iFound it\t\terror.host\t1\r\n.\r\n");
        let mut browser = Browser::new(fixture.config());

        assert_eq!(
            browser
                .execute(&format!("gopher://127.0.0.1:{port}/7/search"))
                .unwrap(),
            Outcome::Prompt("Query:".to_string())
        );
        assert!(browser.history().is_empty());
        assert!(requests.try_recv().is_err());

        let outcome = browser.submit_input("gophers").unwrap();
        assert!(matches!(outcome, Outcome::Page(location) if location.ends_with("/1/search\tgophers")));
        assert_eq!(requests.recv().unwrap(), "/search\tgophers\n");
        assert!(browser.render(80, 5)[0].contains("Found it"));
    }

    #[test]
    fn test_web_links_follow_webmode() {
        let fixture = Fixture::new();
        let mut browser = Browser::new(fixture.config())
            .with_launcher(Box::new(RecordingLauncher::default()));

        assert!(matches!(
            browser.execute("https://example.org/"),
            Err(CoreError::Config(_))
        ));

        browser.execute("s webmode gui").unwrap();
        assert_eq!(
            browser.execute("https://example.org/").unwrap(),
            Outcome::Launched("opened".to_string())
        );
        assert_eq!(
            browser.execute("telnet://bbs.example.org").unwrap(),
            Outcome::Launched("opened".to_string())
        );
        assert!(browser.history().is_empty());
    }

    #[test]
    fn test_purge_unknown_host() {
        let fixture = Fixture::new();
        let mut browser = Browser::new(fixture.config());
        assert!(matches!(
            browser.purge_certificate("example.org"),
            Err(CoreError::Trust(_))
        ));
        assert_eq!(
            browser.purge_certificate("*").unwrap(),
            Outcome::Message("All certificates purged".to_string())
        );
    }

    #[test]
    fn test_draw_and_find() {
        let fixture = Fixture::new();
        let mut browser = Browser::new(fixture.config());
        let mut sink = RecordingSink::default();

        browser.draw(&mut sink, 40, 5).unwrap();
        assert_eq!(sink.status, "burrow");
        assert!(sink.lines[0].starts_with("Welcome"));

        browser.execute(&fixture.page("a.txt")).unwrap();
        assert_eq!(browser.find("FROM", 4).unwrap(), 1);
        browser.draw(&mut sink, 40, 5).unwrap();
        assert_eq!(sink.lines, vec!["hello from a".to_string()]);
        assert!(sink.status.ends_with("a.txt [1/1]"));
    }
}
