//! Bounded, file-backed list of past analyses, most recent first.
//!
//! The whole list is read once when the store is opened and rewritten on
//! every change.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::state::ChatMessage;

/// Maximum number of entries kept on disk
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub summary: String,
    pub overall_assessment: String,
    pub messages: Vec<ChatMessage>,
}

impl HistoryItem {
    pub fn new(summary: String, overall_assessment: String, messages: Vec<ChatMessage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            summary,
            overall_assessment,
            messages,
        }
    }
}

pub struct HistoryStore {
    path: PathBuf,
    items: Vec<HistoryItem>,
}

impl HistoryStore {
    /// Load the list at `path`. A missing file is an empty history; so is a
    /// corrupt one, which is logged and overwritten on the next change.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<HistoryItem>>(&content) {
                Ok(mut items) => {
                    items.truncate(HISTORY_LIMIT);
                    items
                }
                Err(e) => {
                    warn!("Ignoring unreadable history file {}: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("Could not read history file {}: {}", path.display(), e);
                Vec::new()
            }
        };

        Self { path, items }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&HistoryItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert at the front, evicting the oldest entries past the limit
    pub fn push(&mut self, item: HistoryItem) -> Result<()> {
        self.items.insert(0, item);
        self.items.truncate(HISTORY_LIMIT);
        self.save()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.items.clear();
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let content = serde_json::to_string(&self.items)?;
        fs::write(&self.path, content)
            .with_context(|| format!("writing history to {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChatMessage;

    fn item(n: usize) -> HistoryItem {
        HistoryItem::new(
            format!("scan {}", n),
            format!("assessment {}", n),
            vec![ChatMessage::user(format!("ingredient {}", n), None)],
        )
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(dir.path().join("history.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_fifty_first_entry_evicts_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = HistoryStore::open(dir.path().join("history.json"));

        for n in 1..=HISTORY_LIMIT {
            store.push(item(n)).unwrap();
        }
        assert_eq!(store.len(), HISTORY_LIMIT);
        assert_eq!(store.items().last().unwrap().summary, "scan 1");

        store.push(item(51)).unwrap();
        assert_eq!(store.len(), HISTORY_LIMIT);
        assert_eq!(store.get(0).unwrap().summary, "scan 51");
        assert_eq!(store.items().last().unwrap().summary, "scan 2");
        assert!(store.items().iter().all(|i| i.summary != "scan 1"));
    }

    #[test]
    fn test_reopen_restores_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("history.json");

        let mut store = HistoryStore::open(&path);
        store.push(item(1)).unwrap();
        store.push(item(2)).unwrap();

        let reopened = HistoryStore::open(&path);
        let summaries: Vec<_> = reopened.items().iter().map(|i| i.summary.as_str()).collect();
        assert_eq!(summaries, vec!["scan 2", "scan 1"]);
        assert_eq!(reopened.get(0).unwrap().messages[0].content, "ingredient 2");
    }

    #[test]
    fn test_corrupt_file_opens_empty_and_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{not json").unwrap();

        let mut store = HistoryStore::open(&path);
        assert!(store.is_empty());

        store.push(item(1)).unwrap();
        assert_eq!(HistoryStore::open(&path).len(), 1);
    }

    #[test]
    fn test_clear_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut store = HistoryStore::open(&path);
        store.push(item(1)).unwrap();
        store.clear().unwrap();

        assert!(store.is_empty());
        assert!(HistoryStore::open(&path).is_empty());
    }
}
