//! Shared numeric constants for the noteboard crate.

// ── Viewport ────────────────────────────────────────────────────

/// Smallest allowed zoom level.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest allowed zoom level.
pub const MAX_ZOOM: f64 = 5.0;

/// Zoom level restored by a viewport reset.
pub const DEFAULT_ZOOM: f64 = 1.0;

/// Zoom increment applied by the zoom-in / zoom-out controls.
pub const ZOOM_STEP: f64 = 0.1;

/// Zoom change per pixel of wheel `deltaY`.
pub const ZOOM_WHEEL_SENSITIVITY: f64 = 0.002;

/// Canvas-space offset of the board origin, so negative coordinates stay usable.
pub const CANVAS_CENTER: f64 = 1000.0;

// ── Gestures ────────────────────────────────────────────────────

/// Two clicks or taps closer together than this form a double-click.
pub const DOUBLE_CLICK_THRESHOLD_MS: i64 = 300;

/// Maximum travel, in screen pixels, between the two taps of a double-tap.
pub const TAP_MOVE_THRESHOLD_PX: f64 = 10.0;

/// Window after touch-start during which travel beyond the tap threshold
/// cancels tap accumulation.
pub const TAP_SETTLE_MS: i64 = 100;

/// Pointer travel, in screen pixels, above which a press counts as a drag.
pub const CLICK_SLOP_PX: f64 = 4.0;

/// Screen-space size of the square resize handle in a note's bottom-right corner.
pub const RESIZE_HANDLE_PX: f64 = 20.0;

// ── Timers ──────────────────────────────────────────────────────

/// Trailing debounce applied to board resize observations.
pub const BOUNDS_DEBOUNCE_MS: i64 = 50;

/// A presence entry older than this is considered idle.
pub const INACTIVE_THRESHOLD_MS: i64 = 10_000;

/// Interval of the local idle-presence sweep.
pub const PRESENCE_SWEEP_INTERVAL_MS: i64 = 5_000;

// ── Latency ─────────────────────────────────────────────────────

/// Number of round-trip samples in the rolling latency average.
pub const LATENCY_WINDOW: usize = 20;

/// Averages below this are reported as good.
pub const LATENCY_GOOD_MS: f64 = 100.0;

/// Averages below this (and not good) are reported as fair.
pub const LATENCY_FAIR_MS: f64 = 200.0;

// ── Minimap ─────────────────────────────────────────────────────

/// Canvas-space padding around the union of all notes.
pub const MINIMAP_PADDING: f64 = 200.0;

/// Minimum canvas-space extent of the minimap content box on each axis.
pub const MINIMAP_MIN_EXTENT: f64 = 2000.0;

/// Pointer travel, in pixels, before a minimap press becomes a drag.
pub const MINIMAP_DRAG_THRESHOLD_PX: f64 = 10.0;

/// Hold time before a minimap press may become a drag.
pub const MINIMAP_DRAG_DELAY_MS: i64 = 100;

/// Arrow-key nudge distance at zoom 1.0.
pub const MINIMAP_KEY_STEP: f64 = 100.0;

/// Pinch travel, in pixels, that changes the zoom by 1.0 on the minimap.
pub const MINIMAP_PINCH_PX_PER_ZOOM: f64 = 100.0;

// ── Notes ───────────────────────────────────────────────────────

/// Colour given to new notes.
pub const DEFAULT_NOTE_COLOR: &str = "#ffffa0";

/// Preset swatches offered by the colour picker.
pub const NOTE_COLORS: [&str; 8] = [
    "#ffffa0", "#ffcc99", "#ffb3ba", "#bae1ff", "#baffc9", "#ffd1dc", "#e6ccff", "#ffffba",
];

/// Maximum committed note text length, in characters.
pub const NOTE_TEXT_MAX_LENGTH: usize = 5000;

// ── Boards ──────────────────────────────────────────────────────

/// Shortest accepted board id.
pub const BOARD_ID_MIN_LENGTH: usize = 8;

/// Longest accepted board id.
pub const BOARD_ID_MAX_LENGTH: usize = 36;

/// Number of entries kept in the recent-boards list.
pub const RECENT_BOARDS_CAP: usize = 10;

// ── Responsive ──────────────────────────────────────────────────

/// Window widths below this are treated as mobile.
pub const MOBILE_BREAKPOINT_PX: f64 = 768.0;
