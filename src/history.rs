//! history.rs: durable record of already-announced identifiers.
//!
//! One identifier per line, appended in announcement order. A missing file is
//! an empty history. Compaction rewrites through a sibling temp file and a
//! rename, so an interrupted compaction leaves either the old or the new file.

use metrics::counter;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::StoreError;

/// How a stored line is compared against a queried identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Case-insensitive containment in either direction: stored `"42"`
    /// matches query `"142"`, and stored `"142"` matches query `"42"`.
    #[default]
    Substring,
    /// Case-insensitive equality on the trimmed line.
    Exact,
}

impl MatchMode {
    fn matches(self, stored_lower: &str, id_lower: &str) -> bool {
        match self {
            MatchMode::Substring => {
                stored_lower.contains(id_lower) || id_lower.contains(stored_lower.trim())
            }
            MatchMode::Exact => stored_lower.trim() == id_lower.trim(),
        }
    }
}

/// Outcome of a compaction check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compaction {
    /// Store was at or below the high-water mark.
    Untouched { lines: usize },
    /// Store was truncated from the front.
    Truncated { before: usize, after: usize },
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    lookback: usize,
    mode: MatchMode,
}

impl HistoryStore {
    /// Open (and create if absent) the history file.
    pub async fn open(
        path: impl Into<PathBuf>,
        lookback: usize,
        mode: MatchMode,
    ) -> Result<Self, StoreError> {
        let store = Self::new(path, lookback, mode);
        store.ensure_exists().await?;
        Ok(store)
    }

    /// Build a handle without touching the filesystem.
    pub fn new(path: impl Into<PathBuf>, lookback: usize, mode: MatchMode) -> Self {
        Self {
            path: path.into(),
            lookback: lookback.max(1),
            mode,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    async fn ensure_exists(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::new("create dir", parent, e))?;
        }
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreError::new("create", &self.path, e))?;
        Ok(())
    }

    /// All stored lines, oldest first. A missing file yields no lines.
    pub async fn read_lines(&self) -> Result<Vec<String>, StoreError> {
        match fs::read_to_string(&self.path).await {
            Ok(s) => Ok(s
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StoreError::new("read", &self.path, e)),
        }
    }

    /// Membership test over the most recent `lookback` lines.
    pub async fn try_contains(&self, id: &str) -> Result<bool, StoreError> {
        let lines = self.read_lines().await?;
        let start = lines.len().saturating_sub(self.lookback);
        let needle = id.to_lowercase();
        Ok(lines[start..]
            .iter()
            .any(|line| self.mode.matches(&line.to_lowercase(), &needle)))
    }

    /// Like [`try_contains`](Self::try_contains), but an unreadable store
    /// reports the id as already seen so a broken file cannot cause a flood.
    pub async fn contains(&self, id: &str) -> bool {
        match self.try_contains(id).await {
            Ok(seen) => seen,
            Err(e) => {
                tracing::error!(error = %e, id, "history lookup failed; treating as announced");
                counter!("history_io_errors_total").increment(1);
                true
            }
        }
    }

    /// Append `id` as a new line and sync it to disk before returning.
    pub async fn append(&self, id: &str) -> Result<(), StoreError> {
        let mut line = id.replace(['\r', '\n'], " ");
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreError::new("open for append", &self.path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StoreError::new("append", &self.path, e))?;
        file.sync_data()
            .await
            .map_err(|e| StoreError::new("sync", &self.path, e))?;
        Ok(())
    }

    /// If more than `high_water` lines are stored, keep only the last `low_water`.
    pub async fn compact(
        &self,
        high_water: usize,
        low_water: usize,
    ) -> Result<Compaction, StoreError> {
        let lines = self.read_lines().await?;
        let before = lines.len();
        if before <= high_water {
            return Ok(Compaction::Untouched { lines: before });
        }

        let keep = low_water.min(high_water);
        let mut body = lines[before - keep..].join("\n");
        if !body.is_empty() {
            body.push('\n');
        }

        let tmp = self.tmp_path();
        fs::write(&tmp, body.as_bytes())
            .await
            .map_err(|e| StoreError::new("write compacted", &tmp, e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::new("replace", &self.path, e))?;

        counter!("history_compactions_total").increment(1);
        tracing::info!(
            path = %self.path.display(),
            before,
            after = keep,
            "compacted announce history"
        );
        Ok(Compaction::Truncated {
            before,
            after: keep,
        })
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".compact");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_mode_matches_containment_both_ways() {
        assert!(MatchMode::Substring.matches("movie.2023.1080p", "2023"));
        assert!(MatchMode::Substring.matches("42", "142"));
        assert!(!MatchMode::Substring.matches("abc", "xyz"));
    }

    #[test]
    fn exact_mode_ignores_surrounding_whitespace() {
        assert!(MatchMode::Exact.matches(" 42 ", "42"));
        assert!(!MatchMode::Exact.matches("142", "42"));
    }

    #[tokio::test]
    async fn open_creates_missing_parent_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("history.log");
        let store = HistoryStore::open(&path, 500, MatchMode::Substring)
            .await
            .unwrap();
        assert!(path.exists());
        assert!(store.read_lines().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_flattens_embedded_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("h.log"), 500, MatchMode::Exact);
        store.append("two\nlines").await.unwrap();
        assert_eq!(store.read_lines().await.unwrap(), vec!["two lines"]);
    }
}
