//! Board gesture state machine: pan, wheel zoom, pinch, click and double-click
//! on empty board area.
//!
//! DESIGN
//! ======
//! The controller only ever sees events the engine has already hit-tested as
//! "not on a note". It never touches the store; every handler returns the
//! [`BoardIntent`]s the engine should apply.
//!
//! ```text
//!   Idle ──primary down──▶ Panning ──up──▶ Idle   (click if it never moved)
//!   Idle/Panning ──2 touches──▶ Pinching ──< 2 touches──▶ Idle
//! ```
//!
//! Pan is absolute: `start_pan + (pointer - start_pointer)` on every move,
//! with no smoothing. Wheel and pinch zoom keep the canvas point under the
//! anchor fixed via [`Viewport::zoomed_at`].
//!
//! Double-click is two clicks within `DOUBLE_CLICK_THRESHOLD_MS`. Double-tap
//! additionally requires the taps to land within `TAP_MOVE_THRESHOLD_PX` of
//! each other, and a touch that travels that far within `TAP_SETTLE_MS` of
//! landing is the start of a pan, so it clears the pending tap.
//!
//! Hosts also deliver pointer events for touches. Those still pan, but taps
//! belong to the touch handlers: a pointer-up that follows `touch_start` is
//! never a click, whichever of pointer-down and touch-start arrived first.

#[cfg(test)]
#[path = "gesture_test.rs"]
mod gesture_test;

use tracing::debug;

use crate::consts::{
    CLICK_SLOP_PX, DOUBLE_CLICK_THRESHOLD_MS, TAP_MOVE_THRESHOLD_PX, TAP_SETTLE_MS, ZOOM_WHEEL_SENSITIVITY,
};
use crate::input::{Button, Touches, WheelDelta};
use crate::viewport::{CoordinateSpace, Point, Viewport};

/// Active board gesture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Panning {
        /// Screen position of the pointer-down.
        start_pointer: Point,
        /// Pan offset at pointer-down.
        start_pan: Point,
        /// Whether the pointer has left the click slop since pointer-down.
        moved: bool,
    },
    Pinching {
        start_distance: f64,
        start_zoom: f64,
        /// Board-space midpoint of the two touches at pinch start.
        anchor: Point,
    },
}

/// What the engine should do in response to a board gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoardIntent {
    SetViewport(Viewport),
    ClearSelection,
    /// Create a note centred on this canvas point.
    CreateNote { center: Point },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Tap {
    at_ms: i64,
    screen: Point,
}

#[derive(Debug, Clone, Default)]
pub struct GestureController {
    state: GestureState,
    last_click_ms: Option<i64>,
    last_tap: Option<Tap>,
    touch_down: Option<Tap>,
    /// Set by `touch_start`, consumed by the next `pointer_up`.
    touch_sequence: bool,
}

impl GestureController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> GestureState {
        self.state
    }

    #[must_use]
    pub fn is_panning(&self) -> bool {
        matches!(self.state, GestureState::Panning { .. })
    }

    #[must_use]
    pub fn is_pinching(&self) -> bool {
        matches!(self.state, GestureState::Pinching { .. })
    }

    // --- Pointer ---

    /// Pointer-down on empty board. Returns whether a pan started.
    pub fn pointer_down(&mut self, screen: Point, button: Button, viewport: &Viewport) -> bool {
        if button != Button::Primary || self.is_pinching() {
            return false;
        }
        self.state = GestureState::Panning { start_pointer: screen, start_pan: viewport.pan_offset, moved: false };
        debug!(x = screen.x, y = screen.y, "pan start");
        true
    }

    pub fn pointer_move(&mut self, screen: Point, viewport: &Viewport) -> Option<BoardIntent> {
        let GestureState::Panning { start_pointer, start_pan, moved } = &mut self.state else {
            return None;
        };
        if !*moved && start_pointer.distance(screen) > CLICK_SLOP_PX {
            *moved = true;
        }
        let pan_offset = Point::new(start_pan.x + screen.x - start_pointer.x, start_pan.y + screen.y - start_pointer.y);
        Some(BoardIntent::SetViewport(Viewport { pan_offset, ..*viewport }))
    }

    /// Pointer-up anywhere in the window. A pan that never left the click
    /// slop is a click; two clicks inside the threshold create a note.
    pub fn pointer_up(&mut self, screen: Point, space: &CoordinateSpace, now_ms: i64) -> Vec<BoardIntent> {
        let from_touch = std::mem::take(&mut self.touch_sequence);
        let GestureState::Panning { moved, .. } = self.state else {
            return Vec::new();
        };
        self.state = GestureState::Idle;
        debug!(moved, from_touch, "pan end");
        if moved || from_touch {
            self.last_click_ms = None;
            return Vec::new();
        }

        let mut intents = vec![BoardIntent::ClearSelection];
        match self.last_click_ms {
            Some(prev) if now_ms - prev < DOUBLE_CLICK_THRESHOLD_MS => {
                self.last_click_ms = None;
                if let Some(center) = space.screen_to_canvas(screen) {
                    debug!(x = center.x, y = center.y, "double-click on board");
                    intents.push(BoardIntent::CreateNote { center });
                }
            }
            _ => self.last_click_ms = Some(now_ms),
        }
        intents
    }

    // --- Wheel ---

    /// Wheel zoom around the cursor. `None` when bounds are unknown.
    #[must_use]
    pub fn wheel(&self, screen: Point, delta: WheelDelta, space: &CoordinateSpace) -> Option<BoardIntent> {
        if space.bounds.is_degenerate() {
            return None;
        }
        let anchor = space.screen_to_board(screen);
        let requested = space.viewport.zoom_level - delta.dy * ZOOM_WHEEL_SENSITIVITY;
        Some(BoardIntent::SetViewport(space.viewport.zoomed_at(anchor, requested)))
    }

    // --- Touch ---

    pub fn touch_start(&mut self, touches: &Touches, space: &CoordinateSpace, now_ms: i64) -> Vec<BoardIntent> {
        if touches.is_empty() {
            return Vec::new();
        }
        self.touch_sequence = true;
        if let Some((distance, mid)) = touches.pair() {
            if distance > 0.0 {
                self.state = GestureState::Pinching {
                    start_distance: distance,
                    start_zoom: space.viewport.zoom_level,
                    anchor: space.screen_to_board(mid),
                };
                self.touch_down = None;
                self.last_tap = None;
                debug!(distance, zoom = space.viewport.zoom_level, "pinch start");
            }
            return Vec::new();
        }

        let Some(screen) = touches.first() else {
            return Vec::new();
        };
        let tap = Tap { at_ms: now_ms, screen };
        self.touch_down = Some(tap);

        match self.last_tap {
            Some(prev)
                if now_ms - prev.at_ms < DOUBLE_CLICK_THRESHOLD_MS
                    && prev.screen.distance(screen) < TAP_MOVE_THRESHOLD_PX =>
            {
                self.last_tap = None;
                match space.screen_to_canvas(screen) {
                    Some(center) => {
                        debug!(x = center.x, y = center.y, "double-tap on board");
                        vec![BoardIntent::CreateNote { center }]
                    }
                    None => Vec::new(),
                }
            }
            _ => {
                self.last_tap = Some(tap);
                Vec::new()
            }
        }
    }

    pub fn touch_move(&mut self, touches: &Touches, space: &CoordinateSpace, now_ms: i64) -> Option<BoardIntent> {
        if let GestureState::Pinching { start_distance, start_zoom, anchor } = self.state {
            let (distance, _) = touches.pair()?;
            if space.bounds.is_degenerate() {
                return None;
            }
            let requested = start_zoom * distance / start_distance;
            return Some(BoardIntent::SetViewport(space.viewport.zoomed_at(anchor, requested)));
        }

        let (down, screen) = (self.touch_down?, touches.first()?);
        if now_ms - down.at_ms < TAP_SETTLE_MS && down.screen.distance(screen) > TAP_MOVE_THRESHOLD_PX {
            debug!("touch moved early; tap cancelled");
            self.touch_down = None;
            self.last_tap = None;
        }
        None
    }

    /// Touch released. `remaining` is what is still on the surface.
    pub fn touch_end(&mut self, remaining: &Touches) -> Vec<BoardIntent> {
        if self.is_pinching() {
            if remaining.len() < 2 {
                self.state = GestureState::Idle;
                debug!("pinch end");
            }
            return Vec::new();
        }
        if self.touch_down.take().is_some() {
            return vec![BoardIntent::ClearSelection];
        }
        Vec::new()
    }

    /// Drop any gesture in progress and forget click/tap history.
    pub fn cancel(&mut self) {
        *self = Self::default();
    }
}
