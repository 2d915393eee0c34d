//! Capture history: every region the user saved or copied, in first-seen
//! order. Entries are never removed or reordered, so stepping backwards
//! always reaches everything committed so far.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

use crate::selection_logic::Region;

const HISTORY_FILE_NAME: &str = "history.json";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryNavigator {
    entries: Vec<Region>,
    /// `None` means "unset": the next restore starts from the newest entry.
    cursor: Option<usize>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<Region>) -> Self {
        let mut history = Self::new();
        for region in entries {
            history.commit(region);
        }
        history.cursor = None;
        history
    }

    pub fn entries(&self) -> &[Region] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Records `region`. A region that is already present only moves the
    /// cursor onto it. Returns the cursor position.
    pub fn commit(&mut self, region: Region) -> usize {
        let index = match self.entries.iter().position(|r| *r == region) {
            Some(existing) => existing,
            None => {
                self.entries.push(region);
                self.entries.len() - 1
            }
        };
        debug!("history commit {:?} at {}/{}", region, index, self.entries.len());
        self.cursor = Some(index);
        index
    }

    /// Entry under the cursor, or the newest entry when the cursor is unset.
    pub fn restore_last(&mut self) -> Option<Region> {
        let last = self.entries.len().checked_sub(1)?;
        let index = *self.cursor.get_or_insert(last);
        self.entries.get(index).copied()
    }

    /// Steps back one entry, wrapping from the first to the last.
    pub fn previous(&mut self) -> Option<Region> {
        let last = self.entries.len().checked_sub(1)?;
        let index = match self.cursor {
            Some(i) if i > 0 => i - 1,
            _ => last,
        };
        self.cursor = Some(index);
        self.entries.get(index).copied()
    }

    /// Steps forward one entry, wrapping from the last to the first.
    pub fn next(&mut self) -> Option<Region> {
        let last = self.entries.len().checked_sub(1)?;
        let index = match self.cursor {
            None => 0,
            Some(i) if i < last => i + 1,
            Some(_) => 0,
        };
        self.cursor = Some(index);
        self.entries.get(index).copied()
    }
}

#[derive(Debug, Error)]
pub enum HistoryStoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No data directory available on this platform")]
    NoDataDir,
}

/// Optional on-disk copy of the history, kept as a JSON array of regions.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        HistoryStore { path: path.into() }
    }

    /// `<data_dir>/regioncap/history.json`.
    pub fn default_location() -> Result<Self, HistoryStoreError> {
        let dir = dirs::data_dir().ok_or(HistoryStoreError::NoDataDir)?;
        Ok(Self::new(
            dir.join(crate::config::APP_DIR_NAME).join(HISTORY_FILE_NAME),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty history. Entries smaller than `min_size`
    /// on either side could never have been committed and are dropped.
    pub fn load(&self, min_size: i32) -> Result<HistoryNavigator, HistoryStoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(HistoryNavigator::new());
            }
            Err(e) => return Err(e.into()),
        };
        let mut entries: Vec<Region> = serde_json::from_str(&text)?;
        let stored = entries.len();
        entries.retain(|region| region.meets_minimum(min_size));
        if entries.len() < stored {
            warn!(
                "dropped {} undersized entries from {}",
                stored - entries.len(),
                self.path.display()
            );
        }
        Ok(HistoryNavigator::from_entries(entries))
    }

    pub fn save(&self, history: &HistoryNavigator) -> Result<(), HistoryStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(history.entries())?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Loads, logging and falling back to an empty history on failure.
    pub fn load_or_empty(&self, min_size: i32) -> HistoryNavigator {
        match self.load(min_size) {
            Ok(history) => history,
            Err(e) => {
                warn!("history store {} unreadable: {}", self.path.display(), e);
                HistoryNavigator::new()
            }
        }
    }
}
