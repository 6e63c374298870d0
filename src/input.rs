//! Input value types shared by the board, note and minimap controllers.
//!
//! These mirror what the host reads off DOM events. Coordinates are always
//! screen space; each controller converts them through the current
//! [`CoordinateSpace`](crate::viewport::CoordinateSpace).

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::viewport::Point;

/// Keyboard modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button, pen contact or a single-finger tap.
    Primary,
    Middle,
    Secondary,
}

/// A keyboard key as reported by the browser (e.g. `"Escape"`, `"Enter"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0 == name
    }

    #[must_use]
    pub fn arrow(&self) -> Option<Arrow> {
        match self.0.as_str() {
            "ArrowUp" => Some(Arrow::Up),
            "ArrowDown" => Some(Arrow::Down),
            "ArrowLeft" => Some(Arrow::Left),
            "ArrowRight" => Some(Arrow::Right),
            _ => None,
        }
    }
}

/// Arrow-key direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrow {
    Up,
    Down,
    Left,
    Right,
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelDelta {
    pub dx: f64,
    /// Positive scrolls down, which zooms out.
    pub dy: f64,
}

/// Active touch points of a touch event, in screen space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Touches(pub Vec<Point>);

impl Touches {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<Point> {
        self.0.first().copied()
    }

    /// Distance and midpoint of the first two touches.
    #[must_use]
    pub fn pair(&self) -> Option<(f64, Point)> {
        match self.0.as_slice() {
            [a, b, ..] => Some((a.distance(*b), a.midpoint(*b))),
            _ => None,
        }
    }
}
