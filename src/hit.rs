#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use std::collections::HashMap;

use crate::consts::RESIZE_HANDLE_PX;
use crate::doc::{Note, NoteId, sorted_notes};
use crate::viewport::{Point, Rect};

/// Which part of a note was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    /// The square in the bottom-right corner that starts a resize.
    ResizeHandle,
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub note_id: NoteId,
    pub part: HitPart,
}

/// Canvas-space rectangle of a note's resize handle at the given zoom.
#[must_use]
pub fn resize_handle_rect(note: &Note, zoom: f64) -> Rect {
    let size = if zoom > 0.0 { RESIZE_HANDLE_PX / zoom } else { RESIZE_HANDLE_PX };
    let size = size.min(note.dimensions.width).min(note.dimensions.height);
    let r = note.rect();
    Rect::new(r.right() - size, r.bottom() - size, size, size)
}

/// Find the topmost note under `canvas_pt`. Notes are checked in reverse draw
/// order so the highest `(z_index, id)` wins.
#[must_use]
pub fn hit_test(canvas_pt: Point, notes: &HashMap<NoteId, Note>, zoom: f64) -> Option<Hit> {
    sorted_notes(notes).into_iter().rev().find(|n| n.contains(canvas_pt)).map(|note| {
        let part = if resize_handle_rect(note, zoom).contains(canvas_pt) { HitPart::ResizeHandle } else { HitPart::Body };
        Hit { note_id: note.id, part }
    })
}
