//! Engine options

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use burrow_protocols::BlockDisplay;

use crate::error::CoreError;
use crate::Result;

/// Name of the settings file inside `configlocation`
pub const CONFIG_FILE_NAME: &str = ".burrow.ini";

/// Option names understood by `set` and `check`
pub const SETTING_KEYS: [&str; 8] = [
    "configlocation",
    "geminiblocks",
    "homeurl",
    "savelocation",
    "searchengine",
    "telnetcommand",
    "timeout",
    "webmode",
];

/// How web addresses are opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebMode {
    /// Web links are refused
    None,
    /// Web links go to the desktop's default browser
    Gui,
}

impl WebMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "none" => Some(WebMode::None),
            "gui" => Some(WebMode::Gui),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WebMode::None => "none",
            WebMode::Gui => "gui",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Address visited by `home`
    pub homeurl: String,
    /// Address that receives search queries
    pub searchengine: String,
    /// Display policy for preformatted gemtext blocks
    pub geminiblocks: BlockDisplay,
    /// Connection timeout in seconds
    pub timeout: u64,
    /// Directory downloads are written to
    pub savelocation: PathBuf,
    /// Directory holding the settings file
    pub configlocation: PathBuf,
    /// Program started for telnet links
    pub telnetcommand: String,
    pub webmode: WebMode,
}

impl Config {
    pub fn new(home: PathBuf, config_dir: PathBuf) -> Self {
        Self {
            homeurl: "gopher://bombadillo.colorfield.space:70/1/user-guide.map".to_string(),
            searchengine: "gopher://gopher.floodgap.com:70/7/v2/vs".to_string(),
            geminiblocks: BlockDisplay::Block,
            timeout: 15,
            savelocation: home,
            configlocation: config_dir,
            telnetcommand: "telnet".to_string(),
            webmode: WebMode::None,
        }
    }

    /// `$XDG_CONFIG_HOME`, or `~/.config`
    pub fn config_dir() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| Self::home_dir().join(".config"))
    }

    pub fn home_dir() -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn config_file(&self) -> PathBuf {
        self.configlocation.join(CONFIG_FILE_NAME)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Current value of `key`, or `None` for unknown keys
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key.to_ascii_lowercase().as_str() {
            "homeurl" => self.homeurl.clone(),
            "searchengine" => self.searchengine.clone(),
            "geminiblocks" => self.geminiblocks.name().to_string(),
            "timeout" => self.timeout.to_string(),
            "savelocation" => self.savelocation.display().to_string(),
            "configlocation" => self.configlocation.display().to_string(),
            "telnetcommand" => self.telnetcommand.clone(),
            "webmode" => self.webmode.name().to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Change an option from the command line.
    ///
    /// `configlocation` is fixed once the engine has started, every other
    /// key is validated before it is stored.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let key = key.to_ascii_lowercase();
        if key == "configlocation" {
            return Err(CoreError::Config(
                "configlocation is read-only, move the settings file instead".to_string(),
            ));
        }
        self.apply(&key, value)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "homeurl" => self.homeurl = value.to_string(),
            "searchengine" => self.searchengine = value.to_string(),
            "geminiblocks" => {
                self.geminiblocks = BlockDisplay::from_name(value).ok_or_else(|| {
                    CoreError::Config(format!(
                        "geminiblocks must be one of block, alt, neither or both, not {value:?}"
                    ))
                })?
            }
            "timeout" => {
                self.timeout = value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| {
                        CoreError::Config(format!("timeout must be a whole number of seconds, not {value:?}"))
                    })?
            }
            "savelocation" => self.savelocation = expand_home(value),
            "configlocation" => self.configlocation = expand_home(value),
            "telnetcommand" => self.telnetcommand = value.to_string(),
            "webmode" => {
                self.webmode = WebMode::from_name(value).ok_or_else(|| {
                    CoreError::Config(format!("webmode must be none or gui, not {value:?}"))
                })?
            }
            _ => {
                return Err(CoreError::Config(format!(
                    "Unable to set {key}, it does not exist"
                )))
            }
        }
        Ok(())
    }

    /// Apply `[SETTINGS]` pairs read from disk.
    ///
    /// Unknown keys and bad values are skipped with a warning.
    /// `configlocation` in the file is ignored, the file is already there.
    pub fn load_settings<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in pairs {
            let key = key.as_ref().trim().to_ascii_lowercase();
            if key == "configlocation" {
                continue;
            }
            if !SETTING_KEYS.contains(&key.as_str()) {
                tracing::debug!(key = %key, "Ignoring unknown setting");
                continue;
            }
            if let Err(e) = self.apply(&key, value.as_ref()) {
                tracing::warn!(key = %key, error = %e, "Ignoring invalid setting");
            }
        }
    }

    /// Pairs written to `[SETTINGS]`
    pub fn settings(&self) -> Vec<(String, String)> {
        SETTING_KEYS
            .iter()
            .filter(|key| **key != "configlocation")
            .filter_map(|key| self.get(key).map(|value| (key.to_string(), value)))
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::home_dir(), Self::config_dir())
    }
}

fn expand_home(value: &str) -> PathBuf {
    match value.strip_prefix('~') {
        Some(rest) => {
            let rest = rest.trim_start_matches('/');
            let home = Config::home_dir();
            if rest.is_empty() {
                home
            } else {
                home.join(Path::new(rest))
            }
        }
        None => PathBuf::from(value),
    }
}
