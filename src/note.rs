//! Per-note interaction state machine: select, drag, resize, edit, recolor,
//! delete.
//!
//! DESIGN
//! ======
//! One [`NoteController`] exists per note per client. Its state is a single
//! [`InteractionState`] so a note can never be dragged and edited at once:
//!
//! ```text
//!   Idle ──down(body)──▶ Dragging ──up──▶ Selected ──down──▶ Dragging/Resizing
//!   Idle ──down(handle)─▶ Resizing ──up──▶ Selected
//!   Selected ──double click / mobile second tap──▶ Editing
//!   Editing ──Enter / blur──▶ Idle (committed)   Editing ──Escape──▶ Selected
//! ```
//!
//! Drag and resize work in canvas space, so the note follows the pointer at
//! any zoom. On mobile the dragged position is additionally kept inside the
//! visible board minus the device padding. Position, size and colour changes
//! share one [`AdaptiveThrottle`] whose pending patch merges field by field,
//! so a drag never swallows an unsent resize. Text is committed directly.
//!
//! A note whose `selectedBy` names another client is left alone: pointer
//! presses, clicks, edits and deletes on it are ignored. Nothing below the
//! controller enforces this.
//!
//! The controller never touches the store. Handlers return [`NoteEffect`]s
//! that the engine applies in order.

#[cfg(test)]
#[path = "note_test.rs"]
mod note_test;

use tracing::debug;

use crate::consts::{CLICK_SLOP_PX, DOUBLE_CLICK_THRESHOLD_MS, NOTE_COLORS};
use crate::device::{ConfirmAction, DeviceClass};
use crate::doc::{ClientId, Dimensions, Note, NoteId, NotePatch};
use crate::hit::HitPart;
use crate::input::{Key, Modifiers};
use crate::text::{sanitize_note_text, unescape_entities};
use crate::throttle::{AdaptiveThrottle, ThrottleConfig};
use crate::viewport::{CoordinateSpace, Point};

/// Interaction state of one note for the local client.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Selected,
    Dragging {
        /// Canvas pointer minus note position at press.
        offset: Point,
        /// Canvas pointer at press.
        origin: Point,
        /// Whether the pointer has left the click slop.
        moved: bool,
    },
    Resizing {
        start_dimensions: Dimensions,
        start_pointer: Point,
    },
    Editing {
        /// Live, unsanitized edit buffer.
        buffer: String,
    },
}

/// Store or host side effect requested by a note handler.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteEffect {
    Select,
    Deselect,
    BringToFront,
    Update(NotePatch),
    /// Show the editor seeded with this text.
    EditStarted(String),
    EditEnded,
}

/// Result of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The note is not selected by this client.
    NotAllowed,
    Declined,
    Confirmed,
}

#[derive(Debug, Clone)]
pub struct NoteController {
    id: NoteId,
    me: ClientId,
    state: InteractionState,
    picker_open: bool,
    /// Whether the note was already selected when the current press began.
    selected_at_press: bool,
    last_click_ms: Option<i64>,
    throttle: AdaptiveThrottle<NotePatch>,
}

impl NoteController {
    #[must_use]
    pub fn new(id: NoteId, me: ClientId, config: ThrottleConfig) -> Self {
        Self {
            id,
            me,
            state: InteractionState::Idle,
            picker_open: false,
            selected_at_press: false,
            last_click_ms: None,
            throttle: AdaptiveThrottle::new(config),
        }
    }

    #[must_use]
    pub fn id(&self) -> NoteId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    #[must_use]
    pub fn is_editing(&self) -> bool {
        matches!(self.state, InteractionState::Editing { .. })
    }

    /// Whether a drag or resize is in progress.
    #[must_use]
    pub fn is_manipulating(&self) -> bool {
        matches!(self.state, InteractionState::Dragging { .. } | InteractionState::Resizing { .. })
    }

    #[must_use]
    pub fn is_picker_open(&self) -> bool {
        self.picker_open
    }

    /// Current edit buffer, if editing.
    #[must_use]
    pub fn edit_buffer(&self) -> Option<&str> {
        match &self.state {
            InteractionState::Editing { buffer } => Some(buffer),
            _ => None,
        }
    }

    // --- Pointer ---

    /// Press on the note at a canvas point. Selects, raises and starts a
    /// drag or resize depending on which part was hit.
    pub fn pointer_down(&mut self, note: &Note, part: HitPart, canvas: Point) -> Vec<NoteEffect> {
        if self.is_editing() || note.is_held_by_other(self.me) {
            return Vec::new();
        }
        self.selected_at_press = matches!(self.state, InteractionState::Selected) && note.selected_by == Some(self.me);
        self.picker_open = false;

        let mut effects = Vec::with_capacity(2);
        if note.selected_by != Some(self.me) {
            effects.push(NoteEffect::Select);
        }
        effects.push(NoteEffect::BringToFront);

        self.state = match part {
            HitPart::Body => InteractionState::Dragging {
                offset: Point::new(canvas.x - note.position.x, canvas.y - note.position.y),
                origin: canvas,
                moved: false,
            },
            HitPart::ResizeHandle => {
                InteractionState::Resizing { start_dimensions: note.dimensions, start_pointer: canvas }
            }
        };
        debug!(note_id = %self.id, ?part, "note press");
        effects
    }

    /// Pointer move anywhere in the window while dragging or resizing.
    /// Returns the patch to apply now; throttled patches surface via `poll`.
    pub fn pointer_move(
        &mut self,
        note: &Note,
        canvas: Point,
        space: &CoordinateSpace,
        device: DeviceClass,
        now_ms: i64,
        avg_latency_ms: Option<f64>,
    ) -> Option<NotePatch> {
        let patch = match &mut self.state {
            InteractionState::Dragging { offset, origin, moved } => {
                if !*moved && origin.distance(canvas) * space.viewport.zoom_level > CLICK_SLOP_PX {
                    *moved = true;
                    debug!(note_id = %self.id, "drag start");
                }
                if !*moved {
                    return None;
                }
                let candidate = Point::new(canvas.x - offset.x, canvas.y - offset.y);
                NotePatch::position(constrain_to_board(candidate, note.dimensions, space, device))
            }
            InteractionState::Resizing { start_dimensions, start_pointer } => {
                let requested = Dimensions::new(
                    start_dimensions.width + canvas.x - start_pointer.x,
                    start_dimensions.height + canvas.y - start_pointer.y,
                );
                NotePatch::dimensions(device.clamp_dimensions(requested))
            }
            _ => return None,
        };
        self.throttle.submit_merged(patch, now_ms, avg_latency_ms, NotePatch::merged)
    }

    /// Pointer release anywhere in the window. A press that never left the
    /// click slop counts as a click: a second click inside the double-click
    /// window, or a tap on an already selected note on mobile, starts editing.
    pub fn pointer_up(&mut self, note: &Note, device: DeviceClass, now_ms: i64) -> Vec<NoteEffect> {
        let clicked = match self.state {
            InteractionState::Dragging { moved, .. } => {
                if moved {
                    debug!(note_id = %self.id, "drag end");
                }
                !moved
            }
            InteractionState::Resizing { .. } => {
                debug!(note_id = %self.id, "resize end");
                false
            }
            _ => return Vec::new(),
        };
        self.state = InteractionState::Selected;
        if !clicked {
            self.last_click_ms = None;
            return Vec::new();
        }

        let double = self.last_click_ms.is_some_and(|prev| now_ms - prev < DOUBLE_CLICK_THRESHOLD_MS);
        let second_tap = device.is_mobile() && self.selected_at_press;
        if double || second_tap {
            self.last_click_ms = None;
            return self.start_edit(note);
        }
        self.last_click_ms = Some(now_ms);
        Vec::new()
    }

    // --- Editing ---

    fn start_edit(&mut self, note: &Note) -> Vec<NoteEffect> {
        let mut effects = Vec::with_capacity(2);
        if note.selected_by != Some(self.me) {
            effects.push(NoteEffect::Select);
        }
        self.picker_open = false;
        // Committed text is stored escaped; the editor works on what was typed.
        let typed = unescape_entities(&note.text);
        self.state = InteractionState::Editing { buffer: typed.clone() };
        effects.push(NoteEffect::EditStarted(typed));
        debug!(note_id = %self.id, "edit start");
        effects
    }

    /// Enter editing directly (double-click delivered by the host).
    pub fn double_click(&mut self, note: &Note) -> Vec<NoteEffect> {
        if self.is_editing() || note.is_held_by_other(self.me) {
            return Vec::new();
        }
        self.last_click_ms = None;
        self.start_edit(note)
    }

    /// Replace the live edit buffer. Ignored when not editing.
    pub fn text_input(&mut self, text: &str) {
        if let InteractionState::Editing { buffer } = &mut self.state {
            text.clone_into(buffer);
        }
    }

    /// Keyboard while the note has focus: Escape reverts an edit and closes
    /// the picker, Enter without Shift commits.
    pub fn key(&mut self, note: &Note, key: &Key, modifiers: Modifiers) -> Vec<NoteEffect> {
        if key.is("Escape") {
            self.picker_open = false;
            if self.is_editing() {
                self.state = InteractionState::Selected;
                debug!(note_id = %self.id, "edit reverted");
                return vec![NoteEffect::EditEnded];
            }
            return Vec::new();
        }
        if key.is("Enter") && !modifiers.shift && self.is_editing() {
            return self.commit(note);
        }
        Vec::new()
    }

    /// Editor lost focus: commit.
    pub fn blur(&mut self, note: &Note) -> Vec<NoteEffect> {
        if self.is_editing() { self.commit(note) } else { Vec::new() }
    }

    fn commit(&mut self, note: &Note) -> Vec<NoteEffect> {
        let InteractionState::Editing { buffer } = std::mem::take(&mut self.state) else {
            return Vec::new();
        };
        let sanitized = sanitize_note_text(&buffer);
        debug!(note_id = %self.id, changed = sanitized.text != note.text, truncated = sanitized.truncated, "edit commit");

        let mut effects = Vec::with_capacity(3);
        if sanitized.text != note.text {
            effects.push(NoteEffect::Update(NotePatch::text(sanitized.text)));
        }
        effects.push(NoteEffect::EditEnded);
        effects.push(NoteEffect::Deselect);
        effects
    }

    // --- Colour ---

    /// Open the swatch picker. Only while selected.
    pub fn open_picker(&mut self) -> bool {
        if self.state == InteractionState::Selected {
            self.picker_open = true;
        }
        self.picker_open
    }

    pub fn close_picker(&mut self) {
        self.picker_open = false;
    }

    /// Pick a preset colour from the open picker. Closes the picker and
    /// returns the patch to apply now, if the throttle allows it.
    pub fn choose_color(&mut self, color: &str, now_ms: i64, avg_latency_ms: Option<f64>) -> Option<NotePatch> {
        if !self.picker_open || !NOTE_COLORS.contains(&color) {
            return None;
        }
        self.picker_open = false;
        debug!(note_id = %self.id, %color, "color chosen");
        self.throttle.submit_merged(NotePatch::color(color), now_ms, avg_latency_ms, NotePatch::merged)
    }

    // --- Delete ---

    /// Ask to delete the note. Requires this client's selection and a
    /// confirmation; `confirm` is shown the device-specific prompt.
    pub fn request_delete(
        &mut self,
        note: &Note,
        device: DeviceClass,
        confirm: impl FnOnce(&str) -> bool,
    ) -> DeleteOutcome {
        if note.selected_by != Some(self.me) {
            return DeleteOutcome::NotAllowed;
        }
        if !confirm(device.confirm_message(ConfirmAction::DeleteNote)) {
            return DeleteOutcome::Declined;
        }
        self.cancel();
        DeleteOutcome::Confirmed
    }

    // --- Sync ---

    /// Align with the note as currently stored. Losing the selection (board
    /// click, another client taking it) drops back to idle; an in-flight drag,
    /// resize or edit keeps going.
    pub fn reconcile(&mut self, note: &Note) {
        if self.state == InteractionState::Selected && note.selected_by != Some(self.me) {
            self.state = InteractionState::Idle;
            self.picker_open = false;
        }
    }

    /// Release a throttled patch whose wait has elapsed.
    pub fn poll(&mut self, now_ms: i64) -> Option<NotePatch> {
        self.throttle.poll(now_ms)
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<i64> {
        self.throttle.next_deadline()
    }

    /// Drop any pending patch and return to idle.
    pub fn cancel(&mut self) {
        self.throttle.cancel();
        self.state = InteractionState::Idle;
        self.picker_open = false;
    }
}

/// On mobile, keep a dragged note inside the visible board minus padding.
/// The clamp happens in board pixels and is mapped back to canvas space.
fn constrain_to_board(candidate: Point, dimensions: Dimensions, space: &CoordinateSpace, device: DeviceClass) -> Point {
    if !device.is_mobile() || space.bounds.is_degenerate() {
        return candidate;
    }
    let zoom = space.viewport.zoom_level;
    let board = space.viewport.canvas_to_board(candidate);
    let scaled = Dimensions::new(dimensions.width * zoom, dimensions.height * zoom);
    let clamped = device.constrain_position(board, scaled, space.bounds.width, space.bounds.height);
    space.viewport.board_to_canvas(clamped).unwrap_or(candidate)
}
