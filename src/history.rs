//! Persist finished games to disk (XDG config or ~/.config/candyburst).

use crate::game::Outcome;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "candyburst";
const FILENAME: &str = "history.json";

/// Config directory for this app: $XDG_CONFIG_HOME/candyburst, else ~/.config/candyburst.
pub fn config_dir() -> PathBuf {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from(".")),
    };
    base.join(APP_DIR)
}

pub fn default_history_path() -> PathBuf {
    config_dir().join(FILENAME)
}

/// One finished game. Field names on disk are `score`, `result` and `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub score: u32,
    #[serde(rename = "result")]
    pub outcome: Outcome,
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(score: u32, outcome: Outcome, timestamp: DateTime<Utc>) -> Self {
        Self {
            score,
            outcome,
            timestamp,
        }
    }

    pub fn now(score: u32, outcome: Outcome) -> Self {
        Self::new(score, outcome, Utc::now())
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = match self.outcome {
            Outcome::Won => "Won",
            Outcome::Lost => "Lost",
        };
        write!(
            f,
            "{} - Score: {} - Date: {}",
            result,
            self.score,
            self.timestamp
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
        )
    }
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not encode history: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Append-only game log mirrored in memory. The in-memory list only changes after the file
/// has been replaced successfully, so both stay equal.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    /// Load the log at `path`. Missing or unreadable files give an empty history.
    pub fn open(path: PathBuf) -> Self {
        let entries = read_entries(&path);
        log::info!(
            "Loaded {} history entries from {}",
            entries.len(),
            path.display()
        );
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Read the current file, add `entry`, replace the file in one rename.
    pub fn append(&mut self, entry: HistoryEntry) -> Result<(), HistoryError> {
        let mut updated = read_entries(&self.path);
        updated.push(entry);
        write_entries(&self.path, &updated)?;
        log::debug!(
            "History now holds {} entries ({})",
            updated.len(),
            self.path.display()
        );
        self.entries = updated;
        Ok(())
    }
}

fn read_entries(path: &Path) -> Vec<HistoryEntry> {
    let content = match fs::read(path) {
        Ok(c) => c,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            log::warn!("Could not read history {}: {}", path.display(), err);
            return Vec::new();
        }
    };
    match serde_json::from_slice(&content) {
        Ok(entries) => entries,
        Err(err) => {
            log::warn!(
                "Ignoring unparsable history {}: {}",
                path.display(),
                err
            );
            Vec::new()
        }
    }
}

/// Write to a sibling temp file, then rename over the target. Creates the directory if needed.
fn write_entries(path: &Path, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
    let io_err = |source| HistoryError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_vec_pretty(entries)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "candyburst-test-{}-{}",
            std::process::id(),
            name
        ));
        let _ = fs::remove_dir_all(&dir);
        dir.join(FILENAME)
    }

    fn entry(score: u32, outcome: Outcome) -> HistoryEntry {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        HistoryEntry::new(score, outcome, ts)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let store = HistoryStore::open(temp_path("missing"));
        assert!(store.entries().is_empty());
    }

    #[test]
    fn test_garbage_file_is_empty() {
        let path = temp_path("garbage");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        let store = HistoryStore::open(path);
        assert!(store.entries().is_empty());
    }

    #[test]
    fn test_append_persists_and_mirrors_memory() {
        let path = temp_path("append");
        let mut store = HistoryStore::open(path.clone());
        store.append(entry(52, Outcome::Won)).unwrap();
        store.append(entry(12, Outcome::Lost)).unwrap();

        assert_eq!(store.entries().len(), 2);
        let reopened = HistoryStore::open(path.clone());
        assert_eq!(reopened.entries(), store.entries());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_append_keeps_entries_written_by_others() {
        let path = temp_path("merge");
        let mut a = HistoryStore::open(path.clone());
        let mut b = HistoryStore::open(path.clone());
        a.append(entry(1, Outcome::Lost)).unwrap();
        b.append(entry(60, Outcome::Won)).unwrap();
        assert_eq!(b.entries().len(), 2);
        assert_eq!(b.entries()[0].score, 1);
    }

    #[test]
    fn test_file_format_uses_result_and_date_keys() {
        let path = temp_path("format");
        let mut store = HistoryStore::open(path.clone());
        store.append(entry(52, Outcome::Won)).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["score"], 52);
        assert_eq!(raw[0]["result"], "won");
        assert_eq!(raw[0]["date"], "2024-03-01T12:30:00Z");
    }

    #[test]
    fn test_display_line() {
        let line = entry(7, Outcome::Lost).to_string();
        assert!(line.starts_with("Lost - Score: 7 - Date: "));
    }

    #[test]
    fn test_append_failure_leaves_memory_untouched() {
        // Parent "directory" is a regular file, so create_dir_all fails.
        let blocker = temp_path("blocked");
        fs::create_dir_all(blocker.parent().unwrap()).unwrap();
        fs::write(&blocker, "[]").unwrap();
        let mut store = HistoryStore::open(blocker.join(FILENAME));
        assert!(store.append(entry(3, Outcome::Lost)).is_err());
        assert!(store.entries().is_empty());
    }
}
