//! The `[SECTION]` / `key=value` dialect

use std::fmt::Write as _;

use crate::error::StorageError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Settings,
    Bookmarks,
    Certs,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Settings, Section::Bookmarks, Section::Certs];

    pub fn name(&self) -> &'static str {
        match self {
            Section::Settings => "SETTINGS",
            Section::Bookmarks => "BOOKMARKS",
            Section::Certs => "CERTS",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Section::ALL
            .into_iter()
            .find(|section| section.name().eq_ignore_ascii_case(name.trim()))
    }
}

/// Parsed file contents; each section keeps its lines in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    pub settings: Vec<(String, String)>,
    pub bookmarks: Vec<(String, String)>,
    pub certs: Vec<(String, String)>,
}

impl IniDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(&self, section: Section) -> &[(String, String)] {
        match section {
            Section::Settings => &self.settings,
            Section::Bookmarks => &self.bookmarks,
            Section::Certs => &self.certs,
        }
    }

    pub fn section_mut(&mut self, section: Section) -> &mut Vec<(String, String)> {
        match section {
            Section::Settings => &mut self.settings,
            Section::Bookmarks => &mut self.bookmarks,
            Section::Certs => &mut self.certs,
        }
    }

    /// Parse file contents.
    ///
    /// Blank lines and lines starting with `;` or `#` are skipped. Lines in
    /// unknown sections are ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let mut document = Self::new();
        let mut current: Option<Option<Section>> = None;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let name = header.strip_suffix(']').ok_or_else(|| StorageError::Parse {
                    line: line_no,
                    message: "no closing brace for section".to_string(),
                })?;
                if name.contains(['[', ']', '=']) {
                    return Err(StorageError::Parse {
                        line: line_no,
                        message: format!("illegal character in section {name:?}"),
                    });
                }

                let section = Section::from_name(name);
                if section.is_none() {
                    tracing::debug!(section = %name, "Ignoring unknown config section");
                }
                current = Some(section);
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| StorageError::Parse {
                line: line_no,
                message: "no value assigned to key".to_string(),
            })?;
            let key = key.trim();

            if key.is_empty() || key.contains(['[', ']']) {
                return Err(StorageError::Parse {
                    line: line_no,
                    message: format!("invalid key {key:?}"),
                });
            }

            match current {
                None => {
                    return Err(StorageError::Parse {
                        line: line_no,
                        message: "key outside of any section".to_string(),
                    })
                }
                Some(None) => {}
                Some(Some(section)) => document
                    .section_mut(section)
                    .push((key.to_string(), value.trim().to_string())),
            }
        }

        Ok(document)
    }

    /// Serialize every section, empty ones included
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for section in Section::ALL {
            let _ = writeln!(out, "[{}]", section.name());
            for (key, value) in self.section(section) {
                let _ = writeln!(out, "{}={}", key, value);
            }
            out.push('\n');
        }
        out
    }
}
