//! Live cursors of connected clients.
//!
//! DESIGN
//! ======
//! Each client owns exactly one entry, `liveUsers.<id>`, holding its last
//! canvas-space cursor position and timestamp. A client only ever writes or
//! retracts its own entry:
//!
//! - pointer moves inside the board pass through an [`AdaptiveThrottle`]
//!   before being published,
//! - a sweep every `PRESENCE_SWEEP_INTERVAL_MS` retracts the local entry once
//!   it has been idle for `INACTIVE_THRESHOLD_MS`.
//!
//! Remote entries are never pruned. They are filtered when rendering, and the
//! screen position is derived from the current viewport each time so cursors
//! stay put under concurrent pan/zoom.

#[cfg(test)]
#[path = "presence_test.rs"]
mod presence_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::consts::{INACTIVE_THRESHOLD_MS, PRESENCE_SWEEP_INTERVAL_MS};
use crate::doc::ClientId;
use crate::throttle::{AdaptiveThrottle, ThrottleConfig};
use crate::viewport::{CoordinateSpace, Point};

/// Canvas-space cursor position plus the time it was reported.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePosition {
    pub x: f64,
    pub y: f64,
    /// Epoch milliseconds; 0 when never reported.
    #[serde(default)]
    pub last_update: i64,
}

/// One client's presence entry, as synced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub id: ClientId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
    pub position: PresencePosition,
    /// Set while the owner is dragging a note.
    #[serde(default)]
    pub hidden: bool,
}

impl ClientInfo {
    /// Whether the entry should be drawn at `now_ms`.
    #[must_use]
    pub fn is_visible_at(&self, now_ms: i64) -> bool {
        self.position.last_update > 0
            && now_ms - self.position.last_update <= INACTIVE_THRESHOLD_MS
            && !self.hidden
            && !self.name.is_empty()
            && !self.color.is_empty()
    }
}

/// A remote cursor ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorView {
    pub id: ClientId,
    pub name: String,
    pub color: String,
    pub screen: Point,
}

#[derive(Debug, Clone)]
pub struct PresenceTracker {
    me: ClientId,
    throttle: AdaptiveThrottle<Point>,
    next_sweep_ms: Option<i64>,
}

impl PresenceTracker {
    #[must_use]
    pub fn new(me: ClientId, config: ThrottleConfig) -> Self {
        Self { me, throttle: AdaptiveThrottle::new(config), next_sweep_ms: None }
    }

    /// Arm the idle sweep.
    pub fn start(&mut self, now_ms: i64) {
        self.next_sweep_ms = Some(now_ms + PRESENCE_SWEEP_INTERVAL_MS);
    }

    /// Feed a pointer move. Returns the canvas position to publish now, if
    /// any. Moves outside the board or with unusable bounds are ignored.
    pub fn report_pointer(
        &mut self,
        screen: Point,
        space: &CoordinateSpace,
        now_ms: i64,
        avg_latency_ms: Option<f64>,
    ) -> Option<Point> {
        if !space.bounds.contains_screen(screen) {
            return None;
        }
        let canvas = space.screen_to_canvas(screen)?;
        self.throttle.submit(canvas, now_ms, avg_latency_ms)
    }

    /// Release a throttled position whose wait has elapsed.
    pub fn poll(&mut self, now_ms: i64) -> Option<Point> {
        self.throttle.poll(now_ms)
    }

    /// Whether the idle sweep should run now. Re-arms the next sweep.
    pub fn sweep_due(&mut self, now_ms: i64) -> bool {
        match self.next_sweep_ms {
            Some(due) if now_ms >= due => {
                self.next_sweep_ms = Some(now_ms + PRESENCE_SWEEP_INTERVAL_MS);
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<i64> {
        match (self.throttle.next_deadline(), self.next_sweep_ms) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Stop the sweep and drop any unpublished position.
    pub fn cancel(&mut self) {
        self.throttle.cancel();
        self.next_sweep_ms = None;
    }

    /// Remote cursors to draw at `now_ms`, sorted by client id.
    #[must_use]
    pub fn visible_cursors(
        &self,
        users: &HashMap<ClientId, ClientInfo>,
        now_ms: i64,
        space: &CoordinateSpace,
    ) -> Vec<CursorView> {
        let mut cursors: Vec<CursorView> = users
            .values()
            .filter(|u| u.id != self.me && u.is_visible_at(now_ms))
            .filter_map(|u| {
                let screen = space.canvas_to_screen(Point::new(u.position.x, u.position.y))?;
                Some(CursorView { id: u.id, name: u.name.clone(), color: u.color.clone(), screen })
            })
            .collect();
        cursors.sort_by_key(|c| c.id);
        cursors
    }
}
