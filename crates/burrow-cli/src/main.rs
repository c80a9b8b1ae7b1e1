//! Burrow - line-oriented front end
//!
//! `burrow [address]` reads one command per line from stdin. Lines starting
//! with `:` move around the current page instead of running a command.

mod launcher;
mod terminal;

use std::io::{self, BufRead, Stdout};

use anyhow::Context;
use burrow_core::{Browser, Config, CoreError, Outcome};

use launcher::SystemLauncher;
use terminal::Terminal;

const KEYS: [(&str, &str); 9] = [
    (":back", "previous page in history"),
    (":forward", "next page in history"),
    (":up", "scroll up one screen"),
    (":down", "scroll down one screen"),
    (":find [text]", "search the current page"),
    (":next / :prev", "jump between search matches"),
    (":follow", "follow the last redirect"),
    (":purge [host]", "forget a pinned certificate, `*` for all"),
    ("(empty line)", "redraw"),
];

fn main() -> anyhow::Result<()> {
    burrow_core::init_logging();

    let config = Config::default();
    let browser = match Browser::open(config.clone()) {
        Ok(browser) => browser,
        Err(e) => {
            tracing::warn!(path = %config.config_file().display(), error = %e, "Unable to read config, using defaults");
            Browser::new(config)
        }
    };
    let launcher = SystemLauncher::new(&browser.config().telnetcommand);
    let mut browser = browser.with_launcher(Box::new(launcher));
    let mut terminal = Terminal::new(io::stdout());

    tracing::info!("Burrow started");

    if let Some(address) = std::env::args().nth(1) {
        let result = browser.visit(&address);
        report(&mut browser, &mut terminal, result)?;
    } else {
        redraw(&mut browser, &mut terminal)?;
    }

    let mut awaiting_input = false;
    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;

        let result = if awaiting_input {
            awaiting_input = false;
            browser.submit_input(&line)
        } else if let Some(key) = line.trim().strip_prefix(':') {
            let (width, height) = terminal.size();
            match handle_key(&mut browser, key, width, height) {
                Ok(None) => {
                    redraw(&mut browser, &mut terminal)?;
                    continue;
                }
                Ok(Some(outcome)) => Ok(outcome),
                Err(e) => Err(e),
            }
        } else if line.trim().is_empty() {
            redraw(&mut browser, &mut terminal)?;
            continue;
        } else {
            browser.execute(line.trim())
        };

        match report(&mut browser, &mut terminal, result)? {
            Next::Quit => break,
            Next::Input => awaiting_input = true,
            Next::Command => {}
        }
    }

    tracing::info!("Burrow exiting");
    Ok(())
}

enum Next {
    Command,
    Input,
    Quit,
}

fn handle_key(
    browser: &mut Browser,
    key: &str,
    width: usize,
    height: usize,
) -> Result<Option<Outcome>, CoreError> {
    let body = height.saturating_sub(1).max(1);
    let (name, argument) = key
        .split_once(char::is_whitespace)
        .map(|(name, rest)| (name, rest.trim()))
        .unwrap_or((key, ""));

    // render once so the wrapped view matches the terminal before scrolling
    browser.render(width, body);

    match name {
        "back" => browser.back()?,
        "forward" => browser.forward()?,
        "up" => browser.scroll(-(body as isize), body)?,
        "down" => browser.scroll(body as isize, body)?,
        "find" => {
            let count = browser.find(argument, body)?;
            return Ok(Some(Outcome::Message(format!("{count} matching lines"))));
        }
        "next" => {
            browser.next_match(body)?;
        }
        "prev" => {
            browser.previous_match(body)?;
        }
        "follow" => return browser.follow_redirect().map(Some),
        "purge" => return browser.purge_certificate(argument).map(Some),
        other => {
            return Err(CoreError::Usage(format!("Unknown key command :{other}")));
        }
    }
    Ok(None)
}

fn redraw(browser: &mut Browser, terminal: &mut Terminal<Stdout>) -> anyhow::Result<()> {
    let (width, height) = terminal.size();
    browser
        .draw(terminal, width, height)
        .context("writing to stdout")
}

fn report(
    browser: &mut Browser,
    terminal: &mut Terminal<Stdout>,
    result: Result<Outcome, CoreError>,
) -> anyhow::Result<Next> {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            terminal.print(&e.to_string())?;
            return Ok(Next::Command);
        }
    };

    match outcome {
        Outcome::Page(_) => redraw(browser, terminal)?,
        Outcome::Message(message) | Outcome::Launched(message) => terminal.print(&message)?,
        Outcome::Prompt(prompt) => {
            terminal.prompt(&prompt)?;
            return Ok(Next::Input);
        }
        Outcome::Quit => return Ok(Next::Quit),
        Outcome::Bookmarks(bookmarks) => {
            if bookmarks.is_empty() {
                terminal.print("No bookmarks")?;
            }
            for (id, bookmark) in bookmarks.iter().enumerate() {
                terminal.print(&format!("[{id}] {}  {}", bookmark.title, bookmark.url))?;
            }
        }
        Outcome::Help(lines) => {
            for line in lines {
                terminal.print(&line)?;
            }
            for (key, meaning) in KEYS {
                terminal.print(&format!("{key:<28}{meaning}"))?;
            }
        }
    }
    Ok(Next::Command)
}
