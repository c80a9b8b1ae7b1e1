//! File-backed config store

use parking_lot::Mutex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::ini::IniDocument;
use crate::Result;

pub struct ConfigStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ConfigStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file; a missing file is an empty document
    pub fn load(&self) -> Result<IniDocument> {
        let _guard = self.lock.lock();

        match fs::read_to_string(&self.path) {
            Ok(text) => IniDocument::parse(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No config file, using defaults");
                Ok(IniDocument::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the file contents through a temporary sibling file
    pub fn save(&self, document: &IniDocument) -> Result<()> {
        let _guard = self.lock.lock();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, document.dump())?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), "Config saved");
        Ok(())
    }
}
