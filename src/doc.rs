//! Document model: notes, their sparse patches, and draw ordering.
//!
//! Notes are stored in canvas space. `Note` is also the synced wire shape
//! (camelCase JSON under `notes.<id>`), so field names follow the shared
//! document rather than Rust convention when serialized.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::viewport::{Point, Rect};

/// Unique identifier for a note.
pub type NoteId = Uuid;

/// Unique identifier for a connected client.
pub type ClientId = Uuid;

/// Width and height of a note, in canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A note as stored locally and in the shared container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    /// Top-left corner in canvas space.
    pub position: Point,
    pub dimensions: Dimensions,
    pub text: String,
    pub color: String,
    /// Stacking order; higher draws above lower.
    pub z_index: i64,
    /// Client currently holding the (advisory) selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_by: Option<ClientId>,
}

impl Note {
    /// Canvas-space rectangle covered by the note.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.dimensions.width, self.dimensions.height)
    }

    #[must_use]
    pub fn contains(&self, canvas: Point) -> bool {
        self.rect().contains(canvas)
    }

    /// Whether another client currently holds the selection.
    #[must_use]
    pub fn is_held_by_other(&self, me: ClientId) -> bool {
        self.selected_by.is_some_and(|holder| holder != me)
    }

    /// Apply a sparse patch in place.
    pub fn apply(&mut self, patch: &NotePatch) {
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(dimensions) = patch.dimensions {
            self.dimensions = dimensions;
        }
        if let Some(text) = &patch.text {
            self.text.clone_from(text);
        }
        if let Some(color) = &patch.color {
            self.color.clone_from(color);
        }
        if let Some(z_index) = patch.z_index {
            self.z_index = z_index;
        }
        if let Some(selected_by) = patch.selected_by {
            self.selected_by = selected_by;
        }
    }
}

/// Fields for a new note. Missing values take device defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteDraft {
    pub position: Point,
    pub dimensions: Option<Dimensions>,
    pub text: Option<String>,
    pub color: Option<String>,
}

/// Sparse update for a note. Only present fields are applied.
///
/// `selected_by` is doubly optional: `Some(None)` clears the selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotePatch {
    pub position: Option<Point>,
    pub dimensions: Option<Dimensions>,
    pub text: Option<String>,
    pub color: Option<String>,
    pub z_index: Option<i64>,
    pub selected_by: Option<Option<ClientId>>,
}

impl NotePatch {
    #[must_use]
    pub fn position(position: Point) -> Self {
        Self { position: Some(position), ..Self::default() }
    }

    #[must_use]
    pub fn dimensions(dimensions: Dimensions) -> Self {
        Self { dimensions: Some(dimensions), ..Self::default() }
    }

    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Self::default() }
    }

    #[must_use]
    pub fn color(color: impl Into<String>) -> Self {
        Self { color: Some(color.into()), ..Self::default() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Combine with a later patch. Fields set in `newer` win.
    #[must_use]
    pub fn merged(self, newer: NotePatch) -> NotePatch {
        NotePatch {
            position: newer.position.or(self.position),
            dimensions: newer.dimensions.or(self.dimensions),
            text: newer.text.or(self.text),
            color: newer.color.or(self.color),
            z_index: newer.z_index.or(self.z_index),
            selected_by: newer.selected_by.or(self.selected_by),
        }
    }
}

/// Notes ordered for drawing: ascending `(z_index, id)`.
#[must_use]
pub fn sorted_notes(notes: &HashMap<NoteId, Note>) -> Vec<&Note> {
    let mut sorted: Vec<&Note> = notes.values().collect();
    sorted.sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.id.cmp(&b.id)));
    sorted
}
