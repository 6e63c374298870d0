//! Cached board bounds with a trailing resize debounce.
//!
//! The first observation is applied immediately so pointer math has bounds to
//! work with from the first event. Later observations are held until no new
//! observation has arrived for `BOUNDS_DEBOUNCE_MS`; each one restarts the
//! wait and replaces the held value.

#[cfg(test)]
#[path = "bounds_test.rs"]
mod bounds_test;

use crate::consts::BOUNDS_DEBOUNCE_MS;
use crate::viewport::BoardBounds;

#[derive(Debug, Clone, Default)]
pub struct BoundsTracker {
    current: Option<BoardBounds>,
    pending: Option<(BoardBounds, i64)>,
}

impl BoundsTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resize observation. Returns `true` when the cached bounds
    /// changed right away.
    pub fn observe(&mut self, bounds: BoardBounds, now_ms: i64) -> bool {
        if self.current.is_none() {
            self.current = Some(bounds);
            self.pending = None;
            return true;
        }
        self.pending = Some((bounds, now_ms + BOUNDS_DEBOUNCE_MS));
        false
    }

    /// Apply a held observation whose debounce has elapsed.
    pub fn poll(&mut self, now_ms: i64) -> bool {
        match self.pending {
            Some((bounds, due)) if now_ms >= due => {
                self.pending = None;
                let changed = self.current != Some(bounds);
                self.current = Some(bounds);
                if changed {
                    tracing::debug!(width = bounds.width, height = bounds.height, "board bounds updated");
                }
                changed
            }
            _ => false,
        }
    }

    /// Cached bounds, or degenerate zero bounds before the first observation.
    #[must_use]
    pub fn current(&self) -> BoardBounds {
        self.current.unwrap_or_default()
    }

    #[must_use]
    pub fn is_known(&self) -> bool {
        self.current.is_some()
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<i64> {
        self.pending.map(|(_, due)| due)
    }

    /// Drop any held observation.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
