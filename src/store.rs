//! Board store: local state plus its mirror in the shared container.
//!
//! DESIGN
//! ======
//! Every action mutates local state synchronously, notifies subscribers with a
//! [`StoreEvent`], then mirrors the synced keys into the [`StateContainer`]:
//!
//! - `notes.<id>`: one JSON note per key
//! - `clientZCounter`: this client's stacking counter
//! - `liveUsers.<id>`: one presence entry per client
//!
//! The viewport, connection state and latency are local only. Updates from
//! other clients arrive through [`BoardStore::apply_remote`], which never
//! writes back to the container.
//!
//! The z-counter is per client and synced last-write-wins, so two clients
//! bringing notes to front at the same time can disagree on stacking order
//! until their next writes converge. `selectedBy` is advisory: the store
//! records it, nothing here enforces it.
//!
//! ERROR HANDLING
//! ==============
//! Only [`BoardStore::open`] returns errors, for an invalid board id or a
//! container entry that fails to decode. Remote updates that fail to decode
//! are logged and skipped; local actions on missing notes are no-ops.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::consts::{DEFAULT_NOTE_COLOR, INACTIVE_THRESHOLD_MS};
use crate::device::DeviceClass;
use crate::doc::{ClientId, Note, NoteDraft, NoteId, NotePatch, sorted_notes};
use crate::identity::Identity;
use crate::presence::{ClientInfo, PresencePosition};
use crate::sync::{ConnectionState, LatencyMonitor, StateContainer, SubscriptionId};
use crate::text::validate_board_id;
use crate::viewport::{Point, Viewport, clamp_zoom};

pub const NOTES_PREFIX: &str = "notes.";
pub const LIVE_USERS_PREFIX: &str = "liveUsers.";
pub const Z_COUNTER_KEY: &str = "clientZCounter";

/// Initial value of the stacking counter, also restored by `clear_board`.
const INITIAL_Z_COUNTER: i64 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid board id: {0:?}")]
    InvalidBoardId(String),
    #[error("failed to decode {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown key: {0}")]
    UnknownKey(String),
}

/// What changed in the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    NotesChanged,
    ViewportChanged(Viewport),
    PresenceChanged,
    ConnectionChanged(ConnectionState),
    LatencyChanged(Option<f64>),
}

pub type StoreListener = Box<dyn FnMut(&StoreEvent) + Send>;

/// Partial viewport update; absent fields are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewportPatch {
    pub pan_offset: Option<Point>,
    pub zoom_level: Option<f64>,
}

impl From<Viewport> for ViewportPatch {
    fn from(v: Viewport) -> Self {
        Self { pan_offset: Some(v.pan_offset), zoom_level: Some(v.zoom_level) }
    }
}

enum Entry {
    Note(NoteId, Option<Note>),
    ZCounter(Option<i64>),
    LiveUser(ClientId, Option<ClientInfo>),
}

pub struct BoardStore<C: StateContainer> {
    board_id: String,
    identity: Identity,
    container: C,
    notes: HashMap<NoteId, Note>,
    z_counter: i64,
    live_users: HashMap<ClientId, ClientInfo>,
    viewport: Viewport,
    connection: ConnectionState,
    latency: LatencyMonitor,
    listeners: Vec<(SubscriptionId, StoreListener)>,
    next_subscription: u64,
}

impl<C: StateContainer> BoardStore<C> {
    /// Open the store for `board_id`, hydrating from whatever the container
    /// already holds.
    pub fn open(board_id: &str, identity: Identity, container: C) -> Result<Self, StoreError> {
        if !validate_board_id(board_id) {
            return Err(StoreError::InvalidBoardId(board_id.to_owned()));
        }
        let mut store = Self {
            board_id: board_id.to_owned(),
            identity,
            container,
            notes: HashMap::new(),
            z_counter: INITIAL_Z_COUNTER,
            live_users: HashMap::new(),
            viewport: Viewport::default(),
            connection: ConnectionState::default(),
            latency: LatencyMonitor::new(),
            listeners: Vec::new(),
            next_subscription: 1,
        };

        for key in store.container.keys() {
            let value = store.container.get(&key);
            match decode_entry(&key, value.as_ref()) {
                Ok(entry) => store.apply_entry(entry),
                Err(StoreError::UnknownKey(key)) => debug!(%key, "ignoring unknown key"),
                Err(e) => return Err(e),
            }
        }

        info!(
            board_id = %store.board_id,
            notes = store.notes.len(),
            live_users = store.live_users.len(),
            client_id = %store.identity.id,
            "board store opened"
        );
        Ok(store)
    }

    // --- Subscriptions ---

    pub fn subscribe(&mut self, listener: StoreListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, event: &StoreEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    // --- Mirroring ---

    fn mirror_note(&mut self, id: NoteId) {
        let key = format!("{NOTES_PREFIX}{id}");
        let value = match self.notes.get(&id).map(serde_json::to_value) {
            Some(Ok(v)) => Some(v),
            Some(Err(e)) => {
                warn!(%id, error = %e, "failed to encode note; not mirrored");
                return;
            }
            None => None,
        };
        self.container.set(&key, value);
    }

    fn mirror_z_counter(&mut self) {
        self.container.set(Z_COUNTER_KEY, Some(Value::from(self.z_counter)));
    }

    fn mirror_live_user(&mut self, id: ClientId) {
        let key = format!("{LIVE_USERS_PREFIX}{id}");
        let value = match self.live_users.get(&id).map(serde_json::to_value) {
            Some(Ok(v)) => Some(v),
            Some(Err(e)) => {
                warn!(%id, error = %e, "failed to encode presence; not mirrored");
                return;
            }
            None => None,
        };
        self.container.set(&key, value);
    }

    // --- Note actions ---

    /// Create a note on top of the stack. Missing draft fields take the
    /// desktop defaults.
    pub fn add_note(&mut self, draft: NoteDraft) -> NoteId {
        let id = uuid::Uuid::new_v4();
        self.z_counter += 1;
        let note = Note {
            id,
            position: draft.position,
            dimensions: draft.dimensions.unwrap_or_else(|| DeviceClass::Desktop.default_dimensions()),
            text: draft.text.unwrap_or_default(),
            color: draft.color.unwrap_or_else(|| DEFAULT_NOTE_COLOR.to_owned()),
            z_index: self.z_counter,
            selected_by: None,
        };
        debug!(%id, z_index = note.z_index, "note added");
        self.notes.insert(id, note);
        self.emit(&StoreEvent::NotesChanged);
        self.mirror_z_counter();
        self.mirror_note(id);
        id
    }

    /// Apply a sparse patch. Moving a note hides this client's own cursor
    /// until its next position report.
    pub fn update_note(&mut self, id: NoteId, patch: &NotePatch) -> bool {
        let Some(note) = self.notes.get_mut(&id) else {
            return false;
        };
        note.apply(patch);
        self.emit(&StoreEvent::NotesChanged);
        self.mirror_note(id);

        if patch.position.is_some() {
            let me = self.identity.id;
            if let Some(info) = self.live_users.get_mut(&me).filter(|info| !info.hidden) {
                info.hidden = true;
                self.emit(&StoreEvent::PresenceChanged);
                self.mirror_live_user(me);
            }
        }
        true
    }

    pub fn delete_note(&mut self, id: NoteId) -> bool {
        if self.notes.remove(&id).is_none() {
            return false;
        }
        debug!(%id, "note deleted");
        self.emit(&StoreEvent::NotesChanged);
        self.mirror_note(id);
        true
    }

    /// Mark `id` as selected by this client and release any other note this
    /// client held. `None` releases everything.
    pub fn select_note(&mut self, id: Option<NoteId>) {
        let me = self.identity.id;
        let mut changed = Vec::new();
        for note in self.notes.values_mut() {
            if Some(note.id) == id {
                if note.selected_by != Some(me) {
                    note.selected_by = Some(me);
                    changed.push(note.id);
                }
            } else if note.selected_by == Some(me) {
                note.selected_by = None;
                changed.push(note.id);
            }
        }
        if changed.is_empty() {
            return;
        }
        self.emit(&StoreEvent::NotesChanged);
        for note_id in changed {
            self.mirror_note(note_id);
        }
    }

    /// Give `id` a z-index above every note this client has stacked so far.
    pub fn bring_to_front(&mut self, id: NoteId) -> bool {
        if !self.notes.contains_key(&id) {
            return false;
        }
        self.z_counter += 1;
        let z_index = self.z_counter;
        if let Some(note) = self.notes.get_mut(&id) {
            note.z_index = z_index;
        }
        self.emit(&StoreEvent::NotesChanged);
        self.mirror_z_counter();
        self.mirror_note(id);
        true
    }

    /// Remove every note and reset the stacking counter.
    pub fn clear_board(&mut self) {
        let ids: Vec<NoteId> = self.notes.keys().copied().collect();
        self.notes.clear();
        self.z_counter = INITIAL_Z_COUNTER;
        info!(board_id = %self.board_id, removed = ids.len(), "board cleared");
        self.emit(&StoreEvent::NotesChanged);
        self.mirror_z_counter();
        for id in ids {
            self.mirror_note(id);
        }
    }

    // --- Viewport actions ---

    pub fn update_viewport(&mut self, patch: ViewportPatch) {
        let mut next = self.viewport;
        if let Some(pan) = patch.pan_offset.filter(|p| p.is_finite()) {
            next.pan_offset = pan;
        }
        if let Some(zoom) = patch.zoom_level {
            next.zoom_level = clamp_zoom(zoom, self.viewport.zoom_level);
        }
        if next != self.viewport {
            self.viewport = next;
            self.emit(&StoreEvent::ViewportChanged(next));
        }
    }

    pub fn reset_viewport(&mut self) {
        self.update_viewport(Viewport::default().into());
    }

    // --- Presence actions ---

    /// Publish this client's cursor at a canvas-space point and unhide it.
    pub fn update_my_position(&mut self, canvas: Point, now_ms: i64) {
        let me = self.identity.id;
        let position = PresencePosition { x: canvas.x, y: canvas.y, last_update: now_ms };
        match self.live_users.get_mut(&me) {
            Some(info) => {
                info.position = position;
                info.hidden = false;
            }
            None => {
                self.live_users.insert(
                    me,
                    ClientInfo {
                        id: me,
                        name: self.identity.name.clone(),
                        color: self.identity.color.clone(),
                        position,
                        hidden: false,
                    },
                );
            }
        }
        self.emit(&StoreEvent::PresenceChanged);
        self.mirror_live_user(me);
    }

    /// Retract this client's presence entry. With `only_if_idle`, only a
    /// visible entry that has not moved for `INACTIVE_THRESHOLD_MS` is removed.
    pub fn remove_me_from_live_users(&mut self, only_if_idle: bool, now_ms: i64) -> bool {
        let me = self.identity.id;
        let Some(info) = self.live_users.get(&me) else {
            return false;
        };
        let idle = !info.hidden && now_ms - info.position.last_update >= INACTIVE_THRESHOLD_MS;
        if only_if_idle && !idle {
            return false;
        }
        self.live_users.remove(&me);
        debug!(client_id = %me, only_if_idle, "presence retracted");
        self.emit(&StoreEvent::PresenceChanged);
        self.mirror_live_user(me);
        true
    }

    // --- Collaborator signals ---

    pub fn set_connection_state(&mut self, state: ConnectionState) {
        if self.connection == state {
            return;
        }
        info!(board_id = %self.board_id, from = ?self.connection, to = ?state, "connection state changed");
        self.connection = state;
        self.emit(&StoreEvent::ConnectionChanged(state));
    }

    pub fn record_latency(&mut self, round_trip_ms: f64) {
        self.latency.record(round_trip_ms);
        let avg = self.latency.average();
        self.emit(&StoreEvent::LatencyChanged(avg));
    }

    /// Apply an update pushed by the collaborator. Returns whether local state
    /// changed. Undecodable payloads are logged and skipped.
    pub fn apply_remote(&mut self, key: &str, value: Option<&Value>) -> bool {
        match decode_entry(key, value) {
            Ok(entry) => {
                let event = match &entry {
                    Entry::Note(..) | Entry::ZCounter(_) => StoreEvent::NotesChanged,
                    Entry::LiveUser(..) => StoreEvent::PresenceChanged,
                };
                self.apply_entry(entry);
                self.emit(&event);
                true
            }
            Err(e) => {
                warn!(%key, error = %e, "skipping remote update");
                false
            }
        }
    }

    fn apply_entry(&mut self, entry: Entry) {
        match entry {
            Entry::Note(id, Some(note)) => {
                self.notes.insert(id, note);
            }
            Entry::Note(id, None) => {
                self.notes.remove(&id);
            }
            Entry::ZCounter(Some(z)) => self.z_counter = z,
            Entry::ZCounter(None) => self.z_counter = INITIAL_Z_COUNTER,
            Entry::LiveUser(id, Some(info)) => {
                self.live_users.insert(id, info);
            }
            Entry::LiveUser(id, None) => {
                self.live_users.remove(&id);
            }
        }
    }

    // --- Selectors ---

    #[must_use]
    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn notes(&self) -> &HashMap<NoteId, Note> {
        &self.notes
    }

    #[must_use]
    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(&id)
    }

    /// Notes in draw order.
    #[must_use]
    pub fn sorted_notes(&self) -> Vec<&Note> {
        sorted_notes(&self.notes)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    #[must_use]
    pub fn z_counter(&self) -> i64 {
        self.z_counter
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn live_users(&self) -> &HashMap<ClientId, ClientInfo> {
        &self.live_users
    }

    #[must_use]
    pub fn my_info(&self) -> Option<&ClientInfo> {
        self.live_users.get(&self.identity.id)
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    #[must_use]
    pub fn latency(&self) -> &LatencyMonitor {
        &self.latency
    }

    #[must_use]
    pub fn container(&self) -> &C {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut C {
        &mut self.container
    }
}

fn decode_entry(key: &str, value: Option<&Value>) -> Result<Entry, StoreError> {
    let decode_err = |source| StoreError::Decode { key: key.to_owned(), source };

    if key == Z_COUNTER_KEY {
        return match value {
            Some(v) => serde_json::from_value::<i64>(v.clone()).map(|z| Entry::ZCounter(Some(z))).map_err(decode_err),
            None => Ok(Entry::ZCounter(None)),
        };
    }
    if let Some(raw_id) = key.strip_prefix(NOTES_PREFIX) {
        let id = parse_id(key, raw_id)?;
        return match value {
            Some(v) => serde_json::from_value::<Note>(v.clone())
                .map(|mut note| {
                    note.id = id;
                    Entry::Note(id, Some(note))
                })
                .map_err(decode_err),
            None => Ok(Entry::Note(id, None)),
        };
    }
    if let Some(raw_id) = key.strip_prefix(LIVE_USERS_PREFIX) {
        let id = parse_id(key, raw_id)?;
        return match value {
            Some(v) => serde_json::from_value::<ClientInfo>(v.clone())
                .map(|mut info| {
                    info.id = id;
                    Entry::LiveUser(id, Some(info))
                })
                .map_err(decode_err),
            None => Ok(Entry::LiveUser(id, None)),
        };
    }
    Err(StoreError::UnknownKey(key.to_owned()))
}

fn parse_id(key: &str, raw: &str) -> Result<uuid::Uuid, StoreError> {
    uuid::Uuid::parse_str(raw).map_err(|_| StoreError::UnknownKey(key.to_owned()))
}
