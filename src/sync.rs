//! Seams to the synchronization collaborator.
//!
//! The engine never talks to a transport. It sees three things:
//!
//! - a [`StateContainer`]: namespaced key/value state with change listeners,
//! - a [`ConnectionState`] signal,
//! - a rolling round-trip latency, kept by [`LatencyMonitor`].
//!
//! [`MemoryContainer`] is an in-process container used by tests and by hosts
//! that mirror state through some other channel.

#[cfg(test)]
#[path = "sync_test.rs"]
mod sync_test;

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::{LATENCY_FAIR_MS, LATENCY_GOOD_MS, LATENCY_WINDOW};

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Callback invoked with the changed key and its new value (`None` on delete).
pub type Listener = Box<dyn FnMut(&str, Option<&Value>) + Send>;

/// Reactive key/value container shared with other clients.
pub trait StateContainer {
    /// Namespace all keys live under, e.g. `notes-board-<boardId>`.
    fn namespace(&self) -> &str;

    fn get(&self, key: &str) -> Option<Value>;

    /// Write `value` under `key`; `None` deletes the key.
    fn set(&mut self, key: &str, value: Option<Value>);

    fn keys(&self) -> Vec<String>;

    fn subscribe(&mut self, listener: Listener) -> SubscriptionId;

    /// Returns `false` when the id was not subscribed.
    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;

    /// Keys starting with `prefix`.
    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.keys().into_iter().filter(|k| k.starts_with(prefix)).collect()
    }
}

/// In-memory [`StateContainer`].
pub struct MemoryContainer {
    namespace: String,
    entries: BTreeMap<String, Value>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl MemoryContainer {
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), entries: BTreeMap::new(), listeners: Vec::new(), next_subscription: 1 }
    }

    /// Container for a board, namespaced the way every client agrees on.
    #[must_use]
    pub fn for_board(board_id: &str) -> Self {
        Self::new(format!("notes-board-{board_id}"))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for MemoryContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryContainer")
            .field("namespace", &self.namespace)
            .field("entries", &self.entries.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl StateContainer for MemoryContainer {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Option<Value>) {
        match &value {
            Some(v) => {
                self.entries.insert(key.to_owned(), v.clone());
            }
            None => {
                self.entries.remove(key);
            }
        }
        for (_, listener) in &mut self.listeners {
            listener(key, value.as_ref());
        }
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, listener));
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }
}

// =============================================================================
// CONNECTION / LATENCY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
}

impl ConnectionState {
    #[must_use]
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

/// Coarse latency rating shown next to the connection indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyTier {
    Unknown,
    Good,
    Fair,
    Poor,
}

/// Rolling average of round-trip samples.
#[derive(Debug, Clone, Default)]
pub struct LatencyMonitor {
    samples: VecDeque<f64>,
}

impl LatencyMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one round trip. Negative or non-finite samples are ignored.
    pub fn record(&mut self, round_trip_ms: f64) {
        if !round_trip_ms.is_finite() || round_trip_ms < 0.0 {
            return;
        }
        if self.samples.len() == LATENCY_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(round_trip_ms);
    }

    /// Average over the window, `None` before the first sample.
    #[must_use]
    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = self.samples.len() as f64;
        Some(self.samples.iter().sum::<f64>() / n)
    }

    #[must_use]
    pub fn tier(&self) -> LatencyTier {
        match self.average() {
            None => LatencyTier::Unknown,
            Some(avg) if avg < LATENCY_GOOD_MS => LatencyTier::Good,
            Some(avg) if avg < LATENCY_FAIR_MS => LatencyTier::Fair,
            Some(_) => LatencyTier::Poor,
        }
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}
