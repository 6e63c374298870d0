//! Minimap: whole-canvas overview and a second way to steer the viewport.
//!
//! DESIGN
//! ======
//! The content box is the union of all note rectangles, padded by
//! `MINIMAP_PADDING` and grown symmetrically to at least `MINIMAP_MIN_EXTENT`
//! on each axis. With no notes it is the `MINIMAP_MIN_EXTENT` square centred
//! on `CANVAS_CENTER`. The box maps onto the minimap rectangle with
//! independent x / y scales.
//!
//! Interaction, all in minimap-local pixels:
//!
//! - click recentres the viewport on the clicked canvas point,
//! - press-and-move pans continuously once the pointer has travelled more
//!   than `MINIMAP_DRAG_THRESHOLD_PX` after `MINIMAP_DRAG_DELAY_MS`,
//! - a two-finger pinch changes zoom by travel / `MINIMAP_PINCH_PX_PER_ZOOM`,
//! - arrow keys nudge the pan offset by `MINIMAP_KEY_STEP / zoom`.

#[cfg(test)]
#[path = "minimap_test.rs"]
mod minimap_test;

use std::collections::HashMap;

use crate::consts::{
    CANVAS_CENTER, MINIMAP_DRAG_DELAY_MS, MINIMAP_DRAG_THRESHOLD_PX, MINIMAP_KEY_STEP, MINIMAP_MIN_EXTENT,
    MINIMAP_PADDING, MINIMAP_PINCH_PX_PER_ZOOM,
};
use crate::doc::{Dimensions, Note, NoteId};
use crate::input::Arrow;
use crate::viewport::{Point, Rect, Viewport, clamp_zoom};

/// Smallest drawn note size on the minimap, in pixels.
const MIN_NOTE_PX: f64 = 2.0;

/// Canvas-space box covering every note plus padding.
#[must_use]
pub fn content_bounds(notes: &HashMap<NoteId, Note>) -> Rect {
    let half = MINIMAP_MIN_EXTENT / 2.0;
    let mut rects = notes.values().map(Note::rect);
    let Some(first) = rects.next() else {
        return Rect::new(CANVAS_CENTER - half, CANVAS_CENTER - half, MINIMAP_MIN_EXTENT, MINIMAP_MIN_EXTENT);
    };

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.right(), first.bottom());
    for r in rects {
        min_x = min_x.min(r.x);
        min_y = min_y.min(r.y);
        max_x = max_x.max(r.right());
        max_y = max_y.max(r.bottom());
    }
    min_x -= MINIMAP_PADDING;
    min_y -= MINIMAP_PADDING;
    max_x += MINIMAP_PADDING;
    max_y += MINIMAP_PADDING;

    let grow = |lo: f64, hi: f64| {
        let short = MINIMAP_MIN_EXTENT - (hi - lo);
        if short > 0.0 { (lo - short / 2.0, hi + short / 2.0) } else { (lo, hi) }
    };
    let (min_x, max_x) = grow(min_x, max_x);
    let (min_y, max_y) = grow(min_y, max_y);
    Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
}

/// A note drawn on the minimap.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimapNote {
    pub id: NoteId,
    pub rect: Rect,
    pub color: String,
}

/// Affine map from the content box onto the minimap rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimapProjection {
    pub content: Rect,
    pub size: Dimensions,
}

impl MinimapProjection {
    #[must_use]
    pub fn new(notes: &HashMap<NoteId, Note>, size: Dimensions) -> Self {
        Self { content: content_bounds(notes), size }
    }

    #[must_use]
    pub fn scale_x(&self) -> f64 {
        self.size.width / self.content.width
    }

    #[must_use]
    pub fn scale_y(&self) -> f64 {
        self.size.height / self.content.height
    }

    #[must_use]
    pub fn canvas_to_minimap(&self, canvas: Point) -> Point {
        Point::new((canvas.x - self.content.x) * self.scale_x(), (canvas.y - self.content.y) * self.scale_y())
    }

    #[must_use]
    pub fn minimap_to_canvas(&self, minimap: Point) -> Point {
        Point::new(minimap.x / self.scale_x() + self.content.x, minimap.y / self.scale_y() + self.content.y)
    }

    /// Note rectangles in minimap space, at least `MIN_NOTE_PX` on each side.
    #[must_use]
    pub fn note_rects(&self, notes: &HashMap<NoteId, Note>) -> Vec<MinimapNote> {
        let mut out: Vec<MinimapNote> = notes
            .values()
            .map(|n| {
                let origin = self.canvas_to_minimap(n.position);
                MinimapNote {
                    id: n.id,
                    rect: Rect::new(
                        origin.x,
                        origin.y,
                        (n.dimensions.width * self.scale_x()).max(MIN_NOTE_PX),
                        (n.dimensions.height * self.scale_y()).max(MIN_NOTE_PX),
                    ),
                    color: n.color.clone(),
                }
            })
            .collect();
        out.sort_by_key(|n| n.id);
        out
    }

    /// The visible board area, projected and clamped inside the minimap.
    /// Zero-sized when the board size or zoom is unusable.
    #[must_use]
    pub fn viewport_rect(&self, viewport: &Viewport, board_width: f64, board_height: f64) -> Rect {
        let z = viewport.zoom_level;
        if board_width <= 0.0 || board_height <= 0.0 || z <= 0.0 {
            return Rect::default();
        }
        let top_left = Point::new(-viewport.pan_offset.x / z + CANVAS_CENTER / z, -viewport.pan_offset.y / z + CANVAS_CENTER / z);
        let bottom_right = Point::new(top_left.x + board_width / z, top_left.y + board_height / z);
        let a = self.canvas_to_minimap(top_left);
        let b = self.canvas_to_minimap(bottom_right);
        let (w, h) = (b.x - a.x, b.y - a.y);
        Rect::new(
            a.x.min(self.size.width - w).max(0.0),
            a.y.min(self.size.height - h).max(0.0),
            w.min(self.size.width),
            h.min(self.size.height),
        )
    }

    /// Viewport centred on the canvas point under `minimap`.
    #[must_use]
    pub fn recenter(&self, minimap: Point, viewport: &Viewport, board_width: f64, board_height: f64) -> Viewport {
        viewport.centered_on(self.minimap_to_canvas(minimap), board_width, board_height)
    }
}

/// Gesture state on the minimap surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MinimapGesture {
    #[default]
    Idle,
    /// Pointer is down but has not yet qualified as a drag.
    Pressed { start: Point, at_ms: i64 },
    Dragging,
    Pinching { last_distance: f64 },
}

/// Minimap interaction state. Every handler returns the viewport to apply, if any.
#[derive(Debug, Clone, Default)]
pub struct MinimapController {
    expanded: bool,
    gesture: MinimapGesture,
}

impl MinimapController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn toggle_expanded(&mut self) -> bool {
        self.expanded = !self.expanded;
        self.expanded
    }

    #[must_use]
    pub fn gesture(&self) -> MinimapGesture {
        self.gesture
    }

    pub fn pointer_down(&mut self, minimap: Point, now_ms: i64) {
        self.gesture = MinimapGesture::Pressed { start: minimap, at_ms: now_ms };
    }

    pub fn pointer_move(
        &mut self,
        minimap: Point,
        now_ms: i64,
        projection: &MinimapProjection,
        viewport: &Viewport,
        board: Dimensions,
    ) -> Option<Viewport> {
        match self.gesture {
            MinimapGesture::Pressed { start, at_ms } => {
                let held = now_ms - at_ms > MINIMAP_DRAG_DELAY_MS;
                if held && start.distance(minimap) > MINIMAP_DRAG_THRESHOLD_PX {
                    tracing::debug!("minimap drag start");
                    self.gesture = MinimapGesture::Dragging;
                    return Some(projection.recenter(minimap, viewport, board.width, board.height));
                }
                None
            }
            MinimapGesture::Dragging => Some(projection.recenter(minimap, viewport, board.width, board.height)),
            MinimapGesture::Idle | MinimapGesture::Pinching { .. } => None,
        }
    }

    /// A release that never became a drag is a click: recentre on it.
    pub fn pointer_up(
        &mut self,
        minimap: Point,
        projection: &MinimapProjection,
        viewport: &Viewport,
        board: Dimensions,
    ) -> Option<Viewport> {
        let gesture = std::mem::take(&mut self.gesture);
        match gesture {
            MinimapGesture::Pressed { .. } => Some(projection.recenter(minimap, viewport, board.width, board.height)),
            _ => None,
        }
    }

    /// Two-finger distance update. The first sample only records the distance.
    pub fn pinch(&mut self, distance: f64, viewport: &Viewport) -> Option<Viewport> {
        let MinimapGesture::Pinching { last_distance } = self.gesture else {
            self.gesture = MinimapGesture::Pinching { last_distance: distance };
            return None;
        };
        self.gesture = MinimapGesture::Pinching { last_distance: distance };
        let zoom = clamp_zoom(viewport.zoom_level + (distance - last_distance) / MINIMAP_PINCH_PX_PER_ZOOM, viewport.zoom_level);
        Some(Viewport { zoom_level: zoom, ..*viewport })
    }

    /// End whatever gesture is in progress without side effects.
    pub fn cancel(&mut self) {
        self.gesture = MinimapGesture::Idle;
    }

    /// Arrow-key nudge. Up / Left move the content down / right.
    #[must_use]
    pub fn nudge(&self, arrow: Arrow, viewport: &Viewport) -> Viewport {
        let step = MINIMAP_KEY_STEP / viewport.zoom_level;
        let (dx, dy) = match arrow {
            Arrow::Up => (0.0, step),
            Arrow::Down => (0.0, -step),
            Arrow::Left => (step, 0.0),
            Arrow::Right => (-step, 0.0),
        };
        viewport.panned_by(dx, dy)
    }
}
