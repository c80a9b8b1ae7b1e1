//! Command language
//!
//! Every line typed at the prompt is lexed into tokens and parsed into a
//! [`Command`]:
//! - `gopher://example.org` visits an address
//! - `3` follows link 3 of the current page
//! - `a 3 my bookmark` bookmarks link 3 as "my bookmark"
//! - `q` quits
//!
//! Parsing is all-or-nothing. A line either becomes exactly one command or
//! fails with [`NavigationError::Syntax`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::NavigationError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Add,
    Delete,
    Write,
    Set,
    Search,
    Home,
    Quit,
    Bookmarks,
    Check,
    Reload,
    Help,
}

impl Action {
    /// Match a keyword, ignoring case
    pub fn from_keyword(word: &str) -> Option<Self> {
        let action = match word.to_ascii_lowercase().as_str() {
            "a" | "add" => Action::Add,
            "d" | "delete" => Action::Delete,
            "w" | "write" => Action::Write,
            "s" | "set" => Action::Set,
            "search" => Action::Search,
            "h" | "home" => Action::Home,
            "q" | "quit" => Action::Quit,
            "b" | "bookmarks" => Action::Bookmarks,
            "c" | "check" => Action::Check,
            "r" | "reload" => Action::Reload,
            "?" | "help" => Action::Help,
            _ => return None,
        };
        Some(action)
    }

    /// Long form of the keyword
    pub fn keyword(&self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::Delete => "delete",
            Action::Write => "write",
            Action::Set => "set",
            Action::Search => "search",
            Action::Home => "home",
            Action::Quit => "quit",
            Action::Bookmarks => "bookmarks",
            Action::Check => "check",
            Action::Reload => "reload",
            Action::Help => "help",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Action(Action),
    Word,
    Value,
    Whitespace,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    fn new(kind: TokenKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
        }
    }
}

/// Split a line into tokens; the last token is always [`TokenKind::End`].
pub fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = line;

    while let Some(first) = rest.chars().next() {
        let whitespace = first.is_whitespace();
        let len = rest
            .find(|c: char| c.is_whitespace() != whitespace)
            .unwrap_or(rest.len());
        let (text, tail) = rest.split_at(len);
        rest = tail;

        let kind = if whitespace {
            TokenKind::Whitespace
        } else if text.chars().all(|c| c.is_ascii_digit()) {
            TokenKind::Value
        } else if let Some(action) = Action::from_keyword(text) {
            TokenKind::Action(action)
        } else {
            TokenKind::Word
        };
        tokens.push(Token::new(kind, text));
    }

    tokens.push(Token::new(TokenKind::End, ""));
    tokens
}

/// A parsed command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Action on its own: `q`, `r`, `b`
    Simple { action: Action },
    /// Address to visit
    GoUrl { target: String },
    /// Link number on the current page
    GoLink { target: usize },
    /// Action with one argument: `c homeurl`
    Do { action: Action, value: String },
    /// Action with several arguments: `s homeurl gopher://example.org`
    DoAs { action: Action, values: Vec<String> },
    /// Action on a link: `d 2`
    DoLink { action: Action, target: usize },
    /// Action on a link with arguments: `a 3 my bookmark`
    DoLinkAs {
        action: Action,
        target: usize,
        values: Vec<String>,
    },
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        Parser::new(line).parse()
    }
}

pub struct Parser {
    line: String,
    tokens: std::vec::IntoIter<Token>,
}

impl Parser {
    pub fn new(line: &str) -> Self {
        let tokens: Vec<Token> = tokenize(line)
            .into_iter()
            .filter(|token| token.kind != TokenKind::Whitespace)
            .collect();

        Self {
            line: line.to_string(),
            tokens: tokens.into_iter(),
        }
    }

    pub fn parse(mut self) -> Result<Command> {
        let lead = self.next();
        let command = match lead.kind {
            TokenKind::Action(action) => self.parse_action(action)?,
            TokenKind::Value => Command::GoLink {
                target: self.link_number(&lead.text)?,
            },
            TokenKind::Word => Command::GoUrl { target: lead.text },
            TokenKind::End => return Err(self.error("empty command")),
            TokenKind::Whitespace => return Err(self.error("unexpected whitespace")),
        };

        self.expect_end()?;
        Ok(command)
    }

    fn parse_action(&mut self, action: Action) -> Result<Command> {
        let argument = self.next();
        match argument.kind {
            TokenKind::End => Ok(Command::Simple { action }),
            TokenKind::Value => {
                let target = self.link_number(&argument.text)?;
                let values = self.collect_values()?;
                if values.is_empty() {
                    Ok(Command::DoLink { action, target })
                } else {
                    Ok(Command::DoLinkAs {
                        action,
                        target,
                        values,
                    })
                }
            }
            TokenKind::Word => {
                let mut values = vec![argument.text];
                values.extend(self.collect_values()?);
                if values.len() == 1 {
                    Ok(Command::Do {
                        action,
                        value: values.remove(0),
                    })
                } else {
                    Ok(Command::DoAs { action, values })
                }
            }
            TokenKind::Action(found) => Err(self.error(&format!(
                "found action {found:?} where an argument was expected"
            ))),
            TokenKind::Whitespace => Err(self.error("unexpected whitespace")),
        }
    }

    /// Gather trailing words and values up to the end of the line
    fn collect_values(&mut self) -> Result<Vec<String>> {
        let mut values = Vec::new();
        loop {
            let remaining = self.tokens.as_slice();
            match remaining.first().map(|token| token.kind) {
                Some(TokenKind::Word | TokenKind::Value) => values.push(self.next().text),
                Some(TokenKind::Action(found)) => {
                    return Err(self.error(&format!(
                        "found action {found:?} inside the argument list"
                    )))
                }
                _ => return Ok(values),
            }
        }
    }

    fn expect_end(&mut self) -> Result<()> {
        let token = self.next();
        if token.kind == TokenKind::End {
            Ok(())
        } else {
            Err(self.error(&format!("unexpected {:?}", token.text)))
        }
    }

    fn link_number(&self, text: &str) -> Result<usize> {
        text.parse::<usize>()
            .map_err(|_| self.error(&format!("link number {text} is out of range")))
    }

    fn next(&mut self) -> Token {
        self.tokens
            .next()
            .unwrap_or_else(|| Token::new(TokenKind::End, ""))
    }

    fn error(&self, reason: &str) -> NavigationError {
        NavigationError::Syntax(format!("{reason} in {:?}", self.line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_tokenize() {
        let kinds: Vec<TokenKind> = tokenize("a 3  my bookmark")
            .into_iter()
            .map(|t| t.kind)
            .collect();

        assert_eq!(
            kinds,
            vec![
                TokenKind::Action(Action::Add),
                TokenKind::Whitespace,
                TokenKind::Value,
                TokenKind::Whitespace,
                TokenKind::Word,
                TokenKind::Whitespace,
                TokenKind::Word,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(Action::from_keyword("QUIT"), Some(Action::Quit));
        assert_eq!(Action::from_keyword("Search"), Some(Action::Search));
        assert_eq!(Action::from_keyword("?"), Some(Action::Help));
        assert_eq!(Action::from_keyword("x"), None);
    }

    #[test]
    fn test_parse_simple() {
        assert_eq!(
            Command::parse("q").unwrap(),
            Command::Simple {
                action: Action::Quit
            }
        );
        assert_eq!(
            Command::parse("  RELOAD  ").unwrap(),
            Command::Simple {
                action: Action::Reload
            }
        );
    }

    #[test]
    fn test_parse_go() {
        assert_eq!(
            Command::parse("5").unwrap(),
            Command::GoLink { target: 5 }
        );
        assert_eq!(
            Command::parse("gemini://example.org").unwrap(),
            Command::GoUrl {
                target: "gemini://example.org".to_string()
            }
        );
    }

    #[test]
    fn test_parse_do() {
        assert_eq!(
            Command::parse("c homeurl").unwrap(),
            Command::Do {
                action: Action::Check,
                value: "homeurl".to_string()
            }
        );
        assert_eq!(
            Command::parse("s timeout 30").unwrap(),
            Command::DoAs {
                action: Action::Set,
                values: words(&["timeout", "30"])
            }
        );
    }

    #[test]
    fn test_parse_do_link() {
        assert_eq!(
            Command::parse("d 2").unwrap(),
            Command::DoLink {
                action: Action::Delete,
                target: 2
            }
        );
        assert_eq!(
            Command::parse("a 3 my bookmark").unwrap(),
            Command::DoLinkAs {
                action: Action::Add,
                target: 3,
                values: words(&["my", "bookmark"])
            }
        );
        assert_eq!(
            Command::parse("a 3 my bookmark extra token").unwrap(),
            Command::DoLinkAs {
                action: Action::Add,
                target: 3,
                values: words(&["my", "bookmark", "extra", "token"])
            }
        );
    }

    #[test]
    fn test_syntax_errors() {
        let bad = [
            "",
            "   ",
            "a 3 my quit",
            "a q",
            "5 6",
            "gemini://example.org extra",
            "99999999999999999999999",
        ];

        for line in bad {
            assert!(
                matches!(Command::parse(line), Err(NavigationError::Syntax(_))),
                "{line:?} should not parse"
            );
        }
    }
}
