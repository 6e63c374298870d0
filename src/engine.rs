//! Board engine: routes host input to the gesture, note, presence and
//! minimap controllers and applies their results to the store.
//!
//! DESIGN
//! ======
//! [`EngineCore`] is the single owner of interaction state for one board and
//! one client. Every handler runs to completion before the next, and takes
//! the current time explicitly so timers are deterministic:
//!
//! - pointer/touch input is hit-tested against the notes; hits go to that
//!   note's [`NoteController`], misses to the [`GestureController`],
//! - a drag or resize keeps receiving moves and the release wherever the
//!   pointer goes, so a note cannot be left mid-gesture,
//! - controllers return intents/effects; only the engine mutates the store,
//! - throttled note patches, cursor positions, the bounds debounce and the
//!   presence sweep are released by [`EngineCore::tick`] at or after
//!   [`EngineCore::next_deadline`].
//!
//! Handlers return host [`Action`]s: a redraw request, a cursor change, or a
//! request to show/hide the text editor.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info};

use crate::bounds::BoundsTracker;
use crate::consts::ZOOM_STEP;
use crate::device::{ConfirmAction, DeviceClass};
use crate::doc::{Dimensions, NoteDraft, NoteId, NotePatch};
use crate::gesture::{BoardIntent, GestureController};
use crate::hit::{HitPart, hit_test};
use crate::input::{Button, Key, Modifiers, Touches, WheelDelta};
use crate::minimap::{MinimapController, MinimapProjection};
use crate::note::{DeleteOutcome, NoteController, NoteEffect};
use crate::presence::{CursorView, PresenceTracker};
use crate::store::BoardStore;
use crate::sync::{ConnectionState, StateContainer};
use crate::throttle::ThrottleConfig;
use crate::viewport::{BoardBounds, CoordinateSpace, Point, Rect, Viewport};

/// Host-side effect requested by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    RenderNeeded,
    SetCursor(String),
    /// Show the text editor for a note, seeded with `text`.
    EditStarted { id: NoteId, text: String },
    EditEnded { id: NoteId },
    /// A destructive action was not confirmed; nothing changed.
    ConfirmDeclined,
}

/// Everything the host can feed the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown { screen: Point, button: Button },
    PointerMove { screen: Point },
    PointerUp { screen: Point },
    Wheel { screen: Point, delta: WheelDelta },
    TouchStart(Touches),
    TouchMove(Touches),
    /// Touches still on the surface after the release.
    TouchEnd(Touches),
    KeyDown { key: Key, modifiers: Modifiers },
    TextInput { id: NoteId, text: String },
    Blur { id: NoteId },
    DoubleClick { id: NoteId },
    OpenColorPicker { id: NoteId },
    ChooseColor { id: NoteId, color: String },
    CloseColorPicker { id: NoteId },
    BoardResized(BoardBounds),
    WindowResized { width: f64 },
    MinimapToggle,
    MinimapPointerDown(Point),
    MinimapPointerMove(Point),
    MinimapPointerUp(Point),
    MinimapPinch { distance: f64 },
    MinimapPinchEnd,
    MinimapKey(Key),
    AddNote,
    ZoomIn,
    ZoomOut,
    ResetView,
    /// Delete with the user's answer to the confirmation prompt.
    DeleteNote { id: NoteId, confirmed: bool },
    ClearBoard { confirmed: bool },
    Remote { key: String, value: Option<Value> },
    Connection(ConnectionState),
    LatencySample(f64),
}

pub struct EngineCore<C: StateContainer> {
    store: BoardStore<C>,
    bounds: BoundsTracker,
    gesture: GestureController,
    notes: HashMap<NoteId, NoteController>,
    /// Note receiving the current drag or resize.
    active_note: Option<NoteId>,
    presence: PresenceTracker,
    minimap: MinimapController,
    device: DeviceClass,
    throttle_config: ThrottleConfig,
}

impl<C: StateContainer> EngineCore<C> {
    /// Wrap an opened store. Starts the presence sweep at `now_ms`.
    pub fn new(store: BoardStore<C>, throttle_config: ThrottleConfig, now_ms: i64) -> Self {
        let mut presence = PresenceTracker::new(store.identity().id, throttle_config);
        presence.start(now_ms);
        Self {
            store,
            bounds: BoundsTracker::new(),
            gesture: GestureController::new(),
            notes: HashMap::new(),
            active_note: None,
            presence,
            minimap: MinimapController::new(),
            device: DeviceClass::default(),
            throttle_config,
        }
    }

    // --- Accessors ---

    #[must_use]
    pub fn store(&self) -> &BoardStore<C> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut BoardStore<C> {
        &mut self.store
    }

    #[must_use]
    pub fn device(&self) -> DeviceClass {
        self.device
    }

    #[must_use]
    pub fn gesture(&self) -> &GestureController {
        &self.gesture
    }

    #[must_use]
    pub fn minimap(&self) -> &MinimapController {
        &self.minimap
    }

    #[must_use]
    pub fn note_controller(&self, id: NoteId) -> Option<&NoteController> {
        self.notes.get(&id)
    }

    #[must_use]
    pub fn space(&self) -> CoordinateSpace {
        CoordinateSpace::new(self.bounds.current(), self.store.viewport())
    }

    /// Minimap projection for the current notes and minimap size.
    #[must_use]
    pub fn minimap_projection(&self) -> MinimapProjection {
        MinimapProjection::new(self.store.notes(), self.device.minimap_size(self.minimap.is_expanded()))
    }

    /// Remote cursors to draw at `now_ms`.
    #[must_use]
    pub fn cursors(&self, now_ms: i64) -> Vec<CursorView> {
        self.presence.visible_cursors(self.store.live_users(), now_ms, &self.space())
    }

    fn latency(&self) -> Option<f64> {
        self.store.latency().average()
    }

    // --- Dispatch ---

    pub fn handle(&mut self, event: InputEvent, now_ms: i64) -> Vec<Action> {
        match event {
            InputEvent::PointerDown { screen, button } => self.on_pointer_down(screen, button),
            InputEvent::PointerMove { screen } => self.on_pointer_move(screen, now_ms),
            InputEvent::PointerUp { screen } => self.on_pointer_up(screen, now_ms),
            InputEvent::Wheel { screen, delta } => self.on_wheel(screen, delta),
            InputEvent::TouchStart(touches) => self.on_touch_start(&touches, now_ms),
            InputEvent::TouchMove(touches) => self.on_touch_move(&touches, now_ms),
            InputEvent::TouchEnd(remaining) => self.on_touch_end(&remaining),
            InputEvent::KeyDown { key, modifiers } => self.on_key_down(&key, modifiers),
            InputEvent::TextInput { id, text } => {
                if let Some(ctrl) = self.notes.get_mut(&id) {
                    ctrl.text_input(&text);
                }
                Vec::new()
            }
            InputEvent::Blur { id } => self.on_blur(id),
            InputEvent::DoubleClick { id } => self.on_double_click(id),
            InputEvent::OpenColorPicker { id } => self.open_color_picker(id),
            InputEvent::ChooseColor { id, color } => self.choose_color(id, &color, now_ms),
            InputEvent::CloseColorPicker { id } => {
                if let Some(ctrl) = self.notes.get_mut(&id) {
                    ctrl.close_picker();
                }
                vec![Action::RenderNeeded]
            }
            InputEvent::BoardResized(bounds) => self.set_bounds(bounds, now_ms),
            InputEvent::WindowResized { width } => self.set_window_width(width),
            InputEvent::MinimapToggle => {
                let expanded = self.minimap.toggle_expanded();
                debug!(expanded, "minimap toggled");
                vec![Action::RenderNeeded]
            }
            InputEvent::MinimapPointerDown(pt) => {
                self.minimap.pointer_down(pt, now_ms);
                Vec::new()
            }
            InputEvent::MinimapPointerMove(pt) => self.on_minimap_move(pt, now_ms),
            InputEvent::MinimapPointerUp(pt) => self.on_minimap_up(pt),
            InputEvent::MinimapPinch { distance } => {
                let next = self.minimap.pinch(distance, &self.store.viewport());
                self.set_viewport(next)
            }
            InputEvent::MinimapPinchEnd => {
                self.minimap.cancel();
                Vec::new()
            }
            InputEvent::MinimapKey(key) => match key.arrow() {
                Some(arrow) => {
                    let next = self.minimap.nudge(arrow, &self.store.viewport());
                    self.set_viewport(Some(next))
                }
                None => Vec::new(),
            },
            InputEvent::AddNote => self.add_note_at_center().map_or_else(Vec::new, |_| vec![Action::RenderNeeded]),
            InputEvent::ZoomIn => self.zoom_in(),
            InputEvent::ZoomOut => self.zoom_out(),
            InputEvent::ResetView => self.reset_view(),
            InputEvent::DeleteNote { id, confirmed } => match self.delete_note(id, |_| confirmed) {
                DeleteOutcome::Confirmed => vec![Action::RenderNeeded],
                DeleteOutcome::Declined => vec![Action::ConfirmDeclined],
                DeleteOutcome::NotAllowed => Vec::new(),
            },
            InputEvent::ClearBoard { confirmed } => {
                if self.clear_board(|_| confirmed) {
                    vec![Action::RenderNeeded]
                } else {
                    vec![Action::ConfirmDeclined]
                }
            }
            InputEvent::Remote { key, value } => self.apply_remote(&key, value.as_ref()),
            InputEvent::Connection(state) => {
                self.store.set_connection_state(state);
                vec![Action::RenderNeeded]
            }
            InputEvent::LatencySample(ms) => {
                self.store.record_latency(ms);
                Vec::new()
            }
        }
    }

    // --- Pointer ---

    pub fn on_pointer_down(&mut self, screen: Point, button: Button) -> Vec<Action> {
        let space = self.space();
        let Some(canvas) = space.screen_to_canvas(screen) else {
            return Vec::new();
        };
        let hit = hit_test(canvas, self.store.notes(), space.viewport.zoom_level);

        // Pressing anywhere else takes focus from an open editor.
        let mut actions = self.blur_editors_except(hit.map(|h| h.note_id));

        let Some(hit) = hit else {
            if self.gesture.pointer_down(screen, button, &space.viewport) {
                actions.push(Action::SetCursor("grabbing".into()));
            }
            return actions;
        };
        if button != Button::Primary {
            return actions;
        }

        let id = hit.note_id;
        let me = self.store.identity().id;
        let config = self.throttle_config;
        let effects = match (self.store.note(id), self.notes.entry(id).or_insert_with(|| NoteController::new(id, me, config))) {
            (Some(note), ctrl) => ctrl.pointer_down(note, hit.part, canvas),
            (None, _) => return actions,
        };
        if self.notes.get(&id).is_some_and(NoteController::is_manipulating) {
            self.active_note = Some(id);
            let cursor = match hit.part {
                HitPart::Body => "grabbing",
                HitPart::ResizeHandle => "nwse-resize",
            };
            actions.push(Action::SetCursor(cursor.into()));
        }
        actions.extend(self.apply_note_effects(id, effects));
        actions
    }

    pub fn on_pointer_move(&mut self, screen: Point, now_ms: i64) -> Vec<Action> {
        let space = self.space();
        let latency = self.latency();
        let mut actions = Vec::new();

        if let Some(canvas) = self.presence.report_pointer(screen, &space, now_ms, latency) {
            self.store.update_my_position(canvas, now_ms);
            actions.push(Action::RenderNeeded);
        }

        if let Some(id) = self.active_note {
            let Some(canvas) = space.screen_to_canvas(screen) else {
                return actions;
            };
            let device = self.device;
            let patch = match (self.store.note(id), self.notes.get_mut(&id)) {
                (Some(note), Some(ctrl)) => ctrl.pointer_move(note, canvas, &space, device, now_ms, latency),
                _ => None,
            };
            if let Some(patch) = patch {
                self.store.update_note(id, &patch);
                actions.push(Action::RenderNeeded);
            }
            return actions;
        }

        if let Some(intent) = self.gesture.pointer_move(screen, &space.viewport) {
            actions.extend(self.apply_intents(vec![intent]));
        }
        actions
    }

    pub fn on_pointer_up(&mut self, screen: Point, now_ms: i64) -> Vec<Action> {
        if let Some(id) = self.active_note.take() {
            let device = self.device;
            let effects = match (self.store.note(id), self.notes.get_mut(&id)) {
                (Some(note), Some(ctrl)) => ctrl.pointer_up(note, device, now_ms),
                _ => Vec::new(),
            };
            let mut actions = vec![Action::SetCursor("default".into())];
            actions.extend(self.apply_note_effects(id, effects));
            return actions;
        }

        let was_panning = self.gesture.is_panning();
        let intents = self.gesture.pointer_up(screen, &self.space(), now_ms);
        let mut actions = if was_panning { vec![Action::SetCursor("grab".into())] } else { Vec::new() };
        actions.extend(self.apply_intents(intents));
        actions
    }

    pub fn on_wheel(&mut self, screen: Point, delta: WheelDelta) -> Vec<Action> {
        match self.gesture.wheel(screen, delta, &self.space()) {
            Some(intent) => self.apply_intents(vec![intent]),
            None => Vec::new(),
        }
    }

    // --- Touch ---

    /// Touches starting on a note belong to the note's pointer handling; only
    /// board touches and two-finger pinches reach the gesture controller.
    fn touch_on_note(&self, touches: &Touches) -> bool {
        let space = self.space();
        touches.len() == 1
            && touches
                .first()
                .and_then(|t| space.screen_to_canvas(t))
                .and_then(|c| hit_test(c, self.store.notes(), space.viewport.zoom_level))
                .is_some()
    }

    pub fn on_touch_start(&mut self, touches: &Touches, now_ms: i64) -> Vec<Action> {
        if self.touch_on_note(touches) {
            return Vec::new();
        }
        let intents = self.gesture.touch_start(touches, &self.space(), now_ms);
        self.apply_intents(intents)
    }

    pub fn on_touch_move(&mut self, touches: &Touches, now_ms: i64) -> Vec<Action> {
        match self.gesture.touch_move(touches, &self.space(), now_ms) {
            Some(intent) => self.apply_intents(vec![intent]),
            None => Vec::new(),
        }
    }

    pub fn on_touch_end(&mut self, remaining: &Touches) -> Vec<Action> {
        let intents = self.gesture.touch_end(remaining);
        self.apply_intents(intents)
    }

    // --- Keyboard / editor ---

    /// Keys go to the note that is editing or has its picker open.
    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        let Some(id) = self.notes.values().find(|c| c.is_editing() || c.is_picker_open()).map(NoteController::id) else {
            return Vec::new();
        };
        let effects = match (self.store.note(id), self.notes.get_mut(&id)) {
            (Some(note), Some(ctrl)) => ctrl.key(note, key, modifiers),
            _ => return Vec::new(),
        };
        let mut actions = self.apply_note_effects(id, effects);
        actions.push(Action::RenderNeeded);
        actions
    }

    pub fn on_blur(&mut self, id: NoteId) -> Vec<Action> {
        let effects = match (self.store.note(id), self.notes.get_mut(&id)) {
            (Some(note), Some(ctrl)) => ctrl.blur(note),
            _ => return Vec::new(),
        };
        self.apply_note_effects(id, effects)
    }

    pub fn on_double_click(&mut self, id: NoteId) -> Vec<Action> {
        let me = self.store.identity().id;
        let config = self.throttle_config;
        let effects = match (self.store.note(id), self.notes.entry(id).or_insert_with(|| NoteController::new(id, me, config))) {
            (Some(note), ctrl) => ctrl.double_click(note),
            (None, _) => return Vec::new(),
        };
        self.apply_note_effects(id, effects)
    }

    fn blur_editors_except(&mut self, keep: Option<NoteId>) -> Vec<Action> {
        let editing: Vec<NoteId> =
            self.notes.values().filter(|c| c.is_editing() && Some(c.id()) != keep).map(NoteController::id).collect();
        editing.into_iter().flat_map(|id| self.on_blur(id)).collect()
    }

    // --- Colour ---

    pub fn open_color_picker(&mut self, id: NoteId) -> Vec<Action> {
        if self.notes.get_mut(&id).is_some_and(NoteController::open_picker) { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    pub fn choose_color(&mut self, id: NoteId, color: &str, now_ms: i64) -> Vec<Action> {
        let latency = self.latency();
        let Some(patch) = self.notes.get_mut(&id).and_then(|ctrl| ctrl.choose_color(color, now_ms, latency)) else {
            return vec![Action::RenderNeeded];
        };
        self.store.update_note(id, &patch);
        vec![Action::RenderNeeded]
    }

    // --- Layout ---

    pub fn set_bounds(&mut self, bounds: BoardBounds, now_ms: i64) -> Vec<Action> {
        if self.bounds.observe(bounds, now_ms) { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    pub fn set_window_width(&mut self, width: f64) -> Vec<Action> {
        let device = DeviceClass::from_window_width(width);
        if device == self.device {
            return Vec::new();
        }
        info!(?device, width, "device class changed");
        self.device = device;
        vec![Action::RenderNeeded]
    }

    // --- Minimap ---

    fn on_minimap_move(&mut self, pt: Point, now_ms: i64) -> Vec<Action> {
        let projection = self.minimap_projection();
        let board = self.board_dimensions();
        let next = self.minimap.pointer_move(pt, now_ms, &projection, &self.store.viewport(), board);
        self.set_viewport(next)
    }

    fn on_minimap_up(&mut self, pt: Point) -> Vec<Action> {
        let projection = self.minimap_projection();
        let board = self.board_dimensions();
        let next = self.minimap.pointer_up(pt, &projection, &self.store.viewport(), board);
        self.set_viewport(next)
    }

    fn board_dimensions(&self) -> Dimensions {
        let b = self.bounds.current();
        Dimensions::new(b.width, b.height)
    }

    fn set_viewport(&mut self, next: Option<Viewport>) -> Vec<Action> {
        match next {
            Some(v) => {
                self.store.update_viewport(v.into());
                vec![Action::RenderNeeded]
            }
            None => Vec::new(),
        }
    }

    // --- Toolbar ---

    /// Add a default note in the middle of the visible board (desktop) or in
    /// the first free slot near it (mobile). `None` before bounds are known.
    pub fn add_note_at_center(&mut self) -> Option<NoteId> {
        let space = self.space();
        let visible = space.visible_canvas_rect()?;
        let dims = self.device.default_dimensions();

        let position = if self.device.is_mobile() {
            let zoom = space.viewport.zoom_level;
            let existing: Vec<Rect> = self
                .store
                .notes()
                .values()
                .map(|n| {
                    let b = space.viewport.canvas_to_board(n.position);
                    Rect::new(b.x, b.y, n.dimensions.width * zoom, n.dimensions.height * zoom)
                })
                .collect();
            let slot = self.device.smart_note_position(space.bounds.width, space.bounds.height, &existing, &mut rand::rng());
            space.viewport.board_to_canvas(slot)?
        } else {
            let center = visible.center();
            Point::new(center.x - dims.width / 2.0, center.y - dims.height / 2.0)
        };
        Some(self.create_note(position, dims))
    }

    fn create_note(&mut self, position: Point, dimensions: Dimensions) -> NoteId {
        self.store.add_note(NoteDraft {
            position,
            dimensions: Some(dimensions),
            text: Some(String::new()),
            color: Some(self.device.default_color().to_owned()),
        })
    }

    pub fn zoom_in(&mut self) -> Vec<Action> {
        self.zoom_by(ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> Vec<Action> {
        self.zoom_by(-ZOOM_STEP)
    }

    /// Step the zoom around the board centre.
    fn zoom_by(&mut self, step: f64) -> Vec<Action> {
        let space = self.space();
        let viewport = space.viewport;
        let anchor = Point::new(space.bounds.width / 2.0, space.bounds.height / 2.0);
        let next = if space.bounds.is_degenerate() {
            Viewport { zoom_level: viewport.zoom_level + step, ..viewport }
        } else {
            viewport.zoomed_at(anchor, viewport.zoom_level + step)
        };
        self.set_viewport(Some(next))
    }

    pub fn reset_view(&mut self) -> Vec<Action> {
        self.store.reset_viewport();
        vec![Action::RenderNeeded]
    }

    /// Remove every note after confirmation. Returns whether it happened.
    pub fn clear_board(&mut self, confirm: impl FnOnce(&str) -> bool) -> bool {
        if !confirm(self.device.confirm_message(ConfirmAction::ClearBoard)) {
            return false;
        }
        for ctrl in self.notes.values_mut() {
            ctrl.cancel();
        }
        self.notes.clear();
        self.active_note = None;
        self.store.clear_board();
        true
    }

    /// Delete a note this client has selected, after confirmation.
    pub fn delete_note(&mut self, id: NoteId, confirm: impl FnOnce(&str) -> bool) -> DeleteOutcome {
        let device = self.device;
        let outcome = match (self.store.note(id), self.notes.get_mut(&id)) {
            (Some(note), Some(ctrl)) => ctrl.request_delete(note, device, confirm),
            _ => DeleteOutcome::NotAllowed,
        };
        if outcome == DeleteOutcome::Confirmed {
            self.notes.remove(&id);
            if self.active_note == Some(id) {
                self.active_note = None;
            }
            self.store.delete_note(id);
        }
        outcome
    }

    // --- Collaborator ---

    pub fn apply_remote(&mut self, key: &str, value: Option<&Value>) -> Vec<Action> {
        if !self.store.apply_remote(key, value) {
            return Vec::new();
        }
        let mut actions = self.reconcile();
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Align note controllers with the store: drop controllers of deleted
    /// notes and let the rest observe selection changes.
    fn reconcile(&mut self) -> Vec<Action> {
        let gone: Vec<NoteId> = self.notes.keys().filter(|id| self.store.note(**id).is_none()).copied().collect();
        let mut actions = Vec::new();
        for id in gone {
            if let Some(mut ctrl) = self.notes.remove(&id) {
                if ctrl.is_editing() {
                    actions.push(Action::EditEnded { id });
                }
                ctrl.cancel();
            }
            if self.active_note == Some(id) {
                self.active_note = None;
            }
        }
        for (id, ctrl) in &mut self.notes {
            if let Some(note) = self.store.note(*id) {
                ctrl.reconcile(note);
            }
        }
        actions
    }

    // --- Intents / effects ---

    fn apply_intents(&mut self, intents: Vec<BoardIntent>) -> Vec<Action> {
        if intents.is_empty() {
            return Vec::new();
        }
        let mut actions = Vec::new();
        for intent in intents {
            match intent {
                BoardIntent::SetViewport(v) => self.store.update_viewport(v.into()),
                BoardIntent::ClearSelection => {
                    self.store.select_note(None);
                    actions.extend(self.reconcile());
                }
                BoardIntent::CreateNote { center } => {
                    let dims = self.device.default_dimensions();
                    let position = Point::new(center.x - dims.width / 2.0, center.y - dims.height / 2.0);
                    self.create_note(position, dims);
                }
            }
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    fn apply_note_effects(&mut self, id: NoteId, effects: Vec<NoteEffect>) -> Vec<Action> {
        if effects.is_empty() {
            return Vec::new();
        }
        let mut actions = Vec::new();
        for effect in effects {
            match effect {
                NoteEffect::Select => {
                    self.store.select_note(Some(id));
                    actions.extend(self.reconcile());
                }
                NoteEffect::Deselect => {
                    self.store.select_note(None);
                    actions.extend(self.reconcile());
                }
                NoteEffect::BringToFront => {
                    self.store.bring_to_front(id);
                }
                NoteEffect::Update(patch) => {
                    self.store.update_note(id, &patch);
                }
                NoteEffect::EditStarted(text) => actions.push(Action::EditStarted { id, text }),
                NoteEffect::EditEnded => actions.push(Action::EditEnded { id }),
            }
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Timers ---

    /// Release everything whose time has come.
    pub fn tick(&mut self, now_ms: i64) -> Vec<Action> {
        let mut render = self.bounds.poll(now_ms);

        if let Some(canvas) = self.presence.poll(now_ms) {
            self.store.update_my_position(canvas, now_ms);
            render = true;
        }
        if self.presence.sweep_due(now_ms) && self.store.remove_me_from_live_users(true, now_ms) {
            render = true;
        }

        let ready: Vec<(NoteId, NotePatch)> =
            self.notes.iter_mut().filter_map(|(id, ctrl)| ctrl.poll(now_ms).map(|p| (*id, p))).collect();
        for (id, patch) in ready {
            render |= self.store.update_note(id, &patch);
        }

        if render { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    /// Earliest time `tick` has work to do.
    #[must_use]
    pub fn next_deadline(&self) -> Option<i64> {
        let notes = self.notes.values().filter_map(NoteController::next_deadline);
        [self.bounds.next_deadline(), self.presence.next_deadline()].into_iter().flatten().chain(notes).min()
    }

    /// Cancel every timer and retract this client's presence.
    pub fn teardown(&mut self, now_ms: i64) {
        for ctrl in self.notes.values_mut() {
            ctrl.cancel();
        }
        self.active_note = None;
        self.gesture.cancel();
        self.minimap.cancel();
        self.bounds.cancel();
        self.presence.cancel();
        self.store.remove_me_from_live_users(false, now_ms);
        info!(board_id = %self.store.board_id(), client_id = %self.store.identity().id, "engine torn down");
    }
}
