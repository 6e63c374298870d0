//! Recently opened boards, kept in browser-style local storage.
//!
//! DESIGN
//! ======
//! The list is a single JSON array under [`RECENT_BOARDS_KEY`], newest first
//! and capped at [`RECENT_BOARDS_CAP`]. Storage is reached through the
//! [`KeyValueStorage`] trait so hosts can plug in their own backend.
//!
//! ERROR HANDLING
//! ==============
//! Storage is a convenience, never a requirement. Read failures and
//! undecodable contents are logged and read as an empty list; write failures
//! are logged and reported as `false`.

#[cfg(test)]
#[path = "recent_test.rs"]
mod recent_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::consts::RECENT_BOARDS_CAP;

/// Storage key of the recent-boards array.
pub const RECENT_BOARDS_KEY: &str = "notes-board:recent-boards";

const PROBE_KEY: &str = "__storage_test__";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// String key/value storage with `localStorage` semantics.
pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory [`KeyValueStorage`]. An unavailable instance fails every call,
/// like storage disabled by the browser.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
    unavailable: bool,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn unavailable() -> Self {
        Self { items: HashMap::new(), unavailable: true }
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.unavailable { Err(StorageError::Unavailable("storage disabled".into())) } else { Ok(()) }
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        self.items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        self.items.remove(key);
        Ok(())
    }
}

/// One entry of the recent-boards list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentBoard {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Epoch milliseconds of the last visit.
    pub last_accessed: i64,
    pub is_owner: bool,
}

pub struct RecentBoards<S: KeyValueStorage> {
    storage: S,
}

impl<S: KeyValueStorage> RecentBoards<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Boards newest first, at most [`RECENT_BOARDS_CAP`]. Empty when storage
    /// cannot be read.
    #[must_use]
    pub fn list(&self) -> Vec<RecentBoard> {
        match self.load() {
            Ok(boards) => boards,
            Err(e) => {
                warn!(error = %e, "reading recent boards failed");
                Vec::new()
            }
        }
    }

    /// Record a visit: refresh an existing entry or add a new one at the front.
    pub fn touch(&mut self, id: &str, name: Option<&str>, is_owner: bool, now_ms: i64) -> bool {
        let mut boards = self.list();
        boards.retain(|b| b.id != id);
        boards.insert(
            0,
            RecentBoard { id: id.to_owned(), name: name.map(str::to_owned), last_accessed: now_ms, is_owner },
        );
        boards.truncate(RECENT_BOARDS_CAP);
        self.store(&boards, "touch")
    }

    /// Forget a board. Returns whether the updated list was written.
    pub fn remove(&mut self, id: &str) -> bool {
        let mut boards = self.list();
        boards.retain(|b| b.id != id);
        self.store(&boards, "remove")
    }

    /// Whether storage accepts a write and delete right now.
    pub fn is_available(&mut self) -> bool {
        let probe = self.storage.set_item(PROBE_KEY, PROBE_KEY).and_then(|()| self.storage.remove_item(PROBE_KEY));
        match probe {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "storage probe failed");
                false
            }
        }
    }

    fn load(&self) -> Result<Vec<RecentBoard>, StorageError> {
        let Some(raw) = self.storage.get_item(RECENT_BOARDS_KEY)? else {
            return Ok(Vec::new());
        };
        let mut boards: Vec<RecentBoard> = serde_json::from_str(&raw)?;
        boards.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed));
        boards.truncate(RECENT_BOARDS_CAP);
        Ok(boards)
    }

    fn store(&mut self, boards: &[RecentBoard], op: &'static str) -> bool {
        let written = serde_json::to_string(boards)
            .map_err(StorageError::from)
            .and_then(|json| self.storage.set_item(RECENT_BOARDS_KEY, &json));
        match written {
            Ok(()) => true,
            Err(e) => {
                warn!(op, error = %e, "writing recent boards failed");
                false
            }
        }
    }
}
