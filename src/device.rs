//! Device classes and the note sizing / placement rules that depend on them.

#[cfg(test)]
#[path = "device_test.rs"]
mod device_test;

use rand::Rng;

use crate::consts::{DEFAULT_NOTE_COLOR, MOBILE_BREAKPOINT_PX};
use crate::doc::Dimensions;
use crate::viewport::{Point, Rect};

/// Attempts made on the placement grid before falling back to a random slot.
const PLACEMENT_ATTEMPTS: usize = 20;
/// Columns of the placement grid.
const PLACEMENT_COLUMNS: usize = 4;
/// Gap kept between a placed note and its neighbours.
const PLACEMENT_OVERLAP_BUFFER: f64 = 10.0;
/// Spread of the random fallback slot.
const PLACEMENT_RANDOM_SPREAD: f64 = 100.0;

/// Note sizing and edge padding for one device class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteConfig {
    pub min: Dimensions,
    pub max: Dimensions,
    pub default_size: Dimensions,
    pub default_color: &'static str,
    /// Minimum distance from the board edges.
    pub edge_padding: f64,
    /// Extra space reserved at the bottom for a toolbar.
    pub toolbar_padding: f64,
    /// Grid step used by `smart_note_position`.
    pub placement_step: f64,
}

const DESKTOP_NOTES: NoteConfig = NoteConfig {
    min: Dimensions { width: 200.0, height: 200.0 },
    max: Dimensions { width: 500.0, height: 500.0 },
    default_size: Dimensions { width: 200.0, height: 200.0 },
    default_color: DEFAULT_NOTE_COLOR,
    edge_padding: 20.0,
    toolbar_padding: 0.0,
    placement_step: 40.0,
};

const MOBILE_NOTES: NoteConfig = NoteConfig {
    min: Dimensions { width: 150.0, height: 120.0 },
    max: Dimensions { width: 300.0, height: 400.0 },
    default_size: Dimensions { width: 180.0, height: 140.0 },
    default_color: DEFAULT_NOTE_COLOR,
    edge_padding: 16.0,
    toolbar_padding: 80.0,
    placement_step: 30.0,
};

/// Destructive actions that need an explicit confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    DeleteNote,
    ClearBoard,
}

/// Responsive device class, derived from the window width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
}

impl DeviceClass {
    #[must_use]
    pub fn from_window_width(width: f64) -> Self {
        if width < MOBILE_BREAKPOINT_PX { Self::Mobile } else { Self::Desktop }
    }

    #[must_use]
    pub fn is_mobile(self) -> bool {
        self == Self::Mobile
    }

    #[must_use]
    pub fn note_config(self) -> &'static NoteConfig {
        match self {
            Self::Desktop => &DESKTOP_NOTES,
            Self::Mobile => &MOBILE_NOTES,
        }
    }

    /// Clamp each axis into this class's `[min, max]` box. Non-finite axes
    /// resolve to the minimum.
    #[must_use]
    pub fn clamp_dimensions(self, requested: Dimensions) -> Dimensions {
        let cfg = self.note_config();
        let axis = |v: f64, lo: f64, hi: f64| if v.is_finite() { v.max(lo).min(hi) } else { lo };
        Dimensions {
            width: axis(requested.width, cfg.min.width, cfg.max.width),
            height: axis(requested.height, cfg.min.height, cfg.max.height),
        }
    }

    #[must_use]
    pub fn default_dimensions(self) -> Dimensions {
        self.note_config().default_size
    }

    #[must_use]
    pub fn default_color(self) -> &'static str {
        self.note_config().default_color
    }

    /// Keep a note of `dimensions` inside a `width` × `height` area minus the
    /// edge and toolbar padding. When the area is too small the top/left
    /// padding wins.
    #[must_use]
    pub fn constrain_position(self, position: Point, dimensions: Dimensions, width: f64, height: f64) -> Point {
        let cfg = self.note_config();
        let min_x = cfg.edge_padding;
        let min_y = cfg.edge_padding;
        let max_x = width - dimensions.width - cfg.edge_padding;
        let max_y = height - dimensions.height - cfg.edge_padding - cfg.toolbar_padding;
        Point::new(position.x.max(min_x).min(max_x).max(min_x), position.y.max(min_y).min(max_y).max(min_y))
    }

    /// Pick a slot for a new default-sized note inside a `width` × `height`
    /// area: the centre if free, else the first free cell of a small grid,
    /// else a random spot near the top-left corner.
    pub fn smart_note_position<R: Rng + ?Sized>(self, width: f64, height: f64, existing: &[Rect], rng: &mut R) -> Point {
        let cfg = self.note_config();
        let size = cfg.default_size;
        let overlaps = |p: Point| {
            let candidate = Rect::new(p.x, p.y, size.width, size.height);
            existing.iter().any(|r| candidate.overlaps(r, PLACEMENT_OVERLAP_BUFFER))
        };

        let center = Point::new((width - size.width) / 2.0, (height - size.height - cfg.toolbar_padding) / 2.0);
        if !overlaps(center) {
            return self.constrain_position(center, size, width, height);
        }

        for attempt in 0..PLACEMENT_ATTEMPTS {
            #[allow(clippy::cast_precision_loss)]
            let (col, row) = ((attempt % PLACEMENT_COLUMNS) as f64, (attempt / PLACEMENT_COLUMNS) as f64);
            let candidate = Point::new(cfg.edge_padding + col * cfg.placement_step, cfg.edge_padding + row * cfg.placement_step);
            let candidate = self.constrain_position(candidate, size, width, height);
            if !overlaps(candidate) {
                return candidate;
            }
        }

        Point::new(
            cfg.edge_padding + rng.random_range(0.0..PLACEMENT_RANDOM_SPREAD),
            cfg.edge_padding + rng.random_range(0.0..PLACEMENT_RANDOM_SPREAD),
        )
    }

    #[must_use]
    pub fn confirm_message(self, action: ConfirmAction) -> &'static str {
        match (self, action) {
            (Self::Mobile, ConfirmAction::DeleteNote) => "Delete this note?",
            (Self::Mobile, ConfirmAction::ClearBoard) => "Clear all notes? This cannot be undone.",
            (Self::Desktop, ConfirmAction::DeleteNote) => "Are you sure you want to delete this note?",
            (Self::Desktop, ConfirmAction::ClearBoard) => {
                "Are you sure you want to clear all notes? This action cannot be undone."
            }
        }
    }

    #[must_use]
    pub fn edit_placeholder(self) -> &'static str {
        match self {
            Self::Mobile => "Tap to edit",
            Self::Desktop => "Double-click to edit",
        }
    }

    /// Minimap footprint in pixels.
    #[must_use]
    pub fn minimap_size(self, expanded: bool) -> Dimensions {
        let (width, height) = match (self, expanded) {
            (Self::Desktop, false) => (240.0, 120.0),
            (Self::Desktop, true) => (360.0, 160.0),
            (Self::Mobile, false) => (180.0, 90.0),
            (Self::Mobile, true) => (240.0, 100.0),
        };
        Dimensions { width, height }
    }
}
