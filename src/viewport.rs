//! Coordinate spaces: screen, board, canvas.
//!
//! DESIGN
//! ======
//! - Screen: document pixels as reported by pointer events.
//! - Board: pixels relative to the top-left corner of the interactive surface.
//! - Canvas: the logical plane notes live on. The board origin sits at
//!   `CANVAS_CENTER / zoom` so negative canvas coordinates stay reachable.
//!
//! `board -> canvas` is `(b - pan) / zoom + CANVAS_CENTER / zoom`, and
//! `canvas -> board` is its exact inverse. Zooming around an anchor keeps the
//! canvas point under that anchor fixed, so the pan formula works in
//! `CANVAS_CENTER`-shifted board coordinates.
//!
//! ERROR HANDLING
//! ==============
//! A degenerate bounds record (zero or non-finite width/height) or a
//! non-positive zoom makes the canvas transforms return `None`. Callers treat
//! `None` as "no-op" rather than an error.

#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

use serde::{Deserialize, Serialize};

use crate::consts::{CANVAS_CENTER, DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM};

/// A point in screen, board, canvas or minimap space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    #[must_use]
    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned rectangle. Width and height are never negative for rects
/// produced by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, pt: Point) -> bool {
        pt.x >= self.x && pt.x <= self.right() && pt.y >= self.y && pt.y <= self.bottom()
    }

    /// Whether the two rectangles overlap once each is grown by `buffer` on every side.
    #[must_use]
    pub fn overlaps(&self, other: &Rect, buffer: f64) -> bool {
        self.x < other.right() + buffer
            && other.x < self.right() + buffer
            && self.y < other.bottom() + buffer
            && other.y < self.bottom() + buffer
    }
}

/// Layout rect of the interactive surface in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoardBounds {
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
}

impl BoardBounds {
    #[must_use]
    pub fn new(width: f64, height: f64, left: f64, top: f64) -> Self {
        Self { width, height, left, top }
    }

    /// Zero-sized or non-finite bounds cannot anchor a transform.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.left.is_finite() && self.top.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }

    /// Whether a screen point falls inside the surface.
    #[must_use]
    pub fn contains_screen(&self, screen: Point) -> bool {
        screen.x >= self.left
            && screen.x <= self.left + self.width
            && screen.y >= self.top
            && screen.y <= self.top + self.height
    }
}

/// Clamp a requested zoom into `[MIN_ZOOM, MAX_ZOOM]`.
///
/// Non-finite requests resolve to `fallback`, itself clamped.
#[must_use]
pub fn clamp_zoom(requested: f64, fallback: f64) -> f64 {
    let zoom = if requested.is_finite() { requested } else { fallback };
    if zoom.is_finite() { zoom.clamp(MIN_ZOOM, MAX_ZOOM) } else { DEFAULT_ZOOM }
}

/// Pan/zoom state of the board.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub pan_offset: Point,
    pub zoom_level: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { pan_offset: Point::default(), zoom_level: DEFAULT_ZOOM }
    }
}

impl Viewport {
    #[must_use]
    pub fn new(pan_offset: Point, zoom_level: f64) -> Self {
        Self { pan_offset, zoom_level: clamp_zoom(zoom_level, DEFAULT_ZOOM) }
    }

    /// Zoom to `requested` (clamped) keeping the canvas point under the
    /// board-space `anchor` fixed.
    #[must_use]
    pub fn zoomed_at(&self, anchor: Point, requested: f64) -> Viewport {
        let zoom = clamp_zoom(requested, self.zoom_level);
        if self.zoom_level <= 0.0 || !self.zoom_level.is_finite() || !anchor.is_finite() {
            return Viewport { pan_offset: self.pan_offset, zoom_level: zoom };
        }
        let ratio = zoom / self.zoom_level;
        let pan_offset = Point::new(
            anchor.x + CANVAS_CENTER - (anchor.x - self.pan_offset.x + CANVAS_CENTER) * ratio,
            anchor.y + CANVAS_CENTER - (anchor.y - self.pan_offset.y + CANVAS_CENTER) * ratio,
        );
        Viewport { pan_offset, zoom_level: zoom }
    }

    /// Translate the pan offset by a board-space delta.
    #[must_use]
    pub fn panned_by(&self, dx: f64, dy: f64) -> Viewport {
        Viewport { pan_offset: Point::new(self.pan_offset.x + dx, self.pan_offset.y + dy), ..*self }
    }

    /// Board-space point → canvas point, `None` for a non-positive zoom.
    #[must_use]
    pub fn board_to_canvas(&self, board: Point) -> Option<Point> {
        if self.zoom_level <= 0.0 || !self.zoom_level.is_finite() {
            return None;
        }
        let z = self.zoom_level;
        Some(Point::new(
            (board.x - self.pan_offset.x) / z + CANVAS_CENTER / z,
            (board.y - self.pan_offset.y) / z + CANVAS_CENTER / z,
        ))
    }

    /// Canvas point → board-space point.
    #[must_use]
    pub fn canvas_to_board(&self, canvas: Point) -> Point {
        let z = self.zoom_level;
        Point::new(
            (canvas.x - CANVAS_CENTER / z) * z + self.pan_offset.x,
            (canvas.y - CANVAS_CENTER / z) * z + self.pan_offset.y,
        )
    }

    /// Viewport whose board centre (for a board of `width` × `height`) shows `canvas`.
    #[must_use]
    pub fn centered_on(&self, canvas: Point, width: f64, height: f64) -> Viewport {
        let z = self.zoom_level;
        Viewport {
            pan_offset: Point::new(width / 2.0 + CANVAS_CENTER - canvas.x * z, height / 2.0 + CANVAS_CENTER - canvas.y * z),
            zoom_level: z,
        }
    }
}

/// A snapshot of bounds + viewport: everything needed to move between spaces.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoordinateSpace {
    pub bounds: BoardBounds,
    pub viewport: Viewport,
}

impl CoordinateSpace {
    #[must_use]
    pub fn new(bounds: BoardBounds, viewport: Viewport) -> Self {
        Self { bounds, viewport }
    }

    #[must_use]
    pub fn screen_to_board(&self, screen: Point) -> Point {
        Point::new(screen.x - self.bounds.left, screen.y - self.bounds.top)
    }

    #[must_use]
    pub fn board_to_screen(&self, board: Point) -> Point {
        Point::new(board.x + self.bounds.left, board.y + self.bounds.top)
    }

    /// Screen point → canvas point. `None` when the bounds are degenerate.
    #[must_use]
    pub fn screen_to_canvas(&self, screen: Point) -> Option<Point> {
        if self.bounds.is_degenerate() {
            return None;
        }
        self.viewport.board_to_canvas(self.screen_to_board(screen))
    }

    /// Canvas point → screen point. `None` when the bounds are degenerate.
    #[must_use]
    pub fn canvas_to_screen(&self, canvas: Point) -> Option<Point> {
        if self.bounds.is_degenerate() || self.viewport.zoom_level <= 0.0 {
            return None;
        }
        Some(self.board_to_screen(self.viewport.canvas_to_board(canvas)))
    }

    /// Canvas-space rectangle currently visible on the board.
    #[must_use]
    pub fn visible_canvas_rect(&self) -> Option<Rect> {
        if self.bounds.is_degenerate() {
            return None;
        }
        let top_left = self.viewport.board_to_canvas(Point::new(0.0, 0.0))?;
        let z = self.viewport.zoom_level;
        Some(Rect::new(top_left.x, top_left.y, self.bounds.width / z, self.bounds.height / z))
    }

    /// Canvas point at the centre of the board.
    #[must_use]
    pub fn board_center_canvas(&self) -> Option<Point> {
        self.visible_canvas_rect().map(|r| r.center())
    }

    /// Convert a screen-space distance to canvas units.
    #[must_use]
    pub fn screen_dist_to_canvas(&self, dist: f64) -> f64 {
        if self.viewport.zoom_level > 0.0 { dist / self.viewport.zoom_level } else { dist }
    }
}
