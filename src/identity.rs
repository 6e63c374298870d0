//! Per-session identity shown next to this client's cursor.
//!
//! Generated once when a session starts and passed explicitly to the store.

#[cfg(test)]
#[path = "identity_test.rs"]
mod identity_test;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::doc::ClientId;

const NAMES: [&str; 32] = [
    "Alice", "Bob", "Charlie", "Diana", "Eve", "Frank", "Grace", "Henry", "Ivy", "Jack", "Kate", "Leo", "Maya",
    "Noah", "Olivia", "Paul", "Quinn", "Ruby", "Sam", "Tara", "Uma", "Victor", "Wendy", "Xander", "Yara", "Zoe",
    "Alex", "Blake", "Casey", "Drew", "Emery", "Finley",
];

/// Cursor colours handed out to clients.
pub const CURSOR_COLORS: [&str; 20] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FECA57", "#FF9FF3", "#54A0FF", "#5F27CD", "#00D2D3", "#FF9F43",
    "#10AC84", "#EE5A24", "#0984E3", "#6C5CE7", "#A29BFE", "#FD79A8", "#E84393", "#2D3436", "#636E72", "#74B9FF",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: ClientId,
    pub name: String,
    pub color: String,
}

impl Identity {
    #[must_use]
    pub fn new(id: ClientId, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self { id, name: name.into(), color: color.into() }
    }

    /// Random name (pool name plus a 0-99 suffix) and cursor colour.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let base = NAMES.choose(rng).copied().unwrap_or("Guest");
        let suffix: u8 = rng.random_range(0..100);
        let color = CURSOR_COLORS.choose(rng).copied().unwrap_or(CURSOR_COLORS[0]);
        Self { id: Uuid::new_v4(), name: format!("{base}{suffix}"), color: color.to_owned() }
    }
}
