#![allow(clippy::float_cmp)]

use uuid::Uuid;

use super::*;
use crate::viewport::{BoardBounds, Viewport};

fn space() -> CoordinateSpace {
    CoordinateSpace::new(BoardBounds::new(800.0, 600.0, 0.0, 0.0), Viewport::default())
}

/// Latency unknown, so every note update is spaced 100 ms apart.
fn config() -> ThrottleConfig {
    ThrottleConfig { target_latency_ms: 100.0, base_rate: 10.0, min_rate: 2.0, default_delay_ms: 100.0 }
}

fn note(w: f64, h: f64) -> Note {
    Note {
        id: Uuid::new_v4(),
        position: Point::new(1100.0, 1100.0),
        dimensions: Dimensions::new(w, h),
        text: "hello".into(),
        color: "#ffffa0".into(),
        z_index: 2,
        selected_by: None,
    }
}

fn setup() -> (NoteController, Note, ClientId) {
    let me = Uuid::new_v4();
    let n = note(200.0, 200.0);
    (NoteController::new(n.id, me, config()), n, me)
}

/// Press and release in place, as the engine would, applying the selection.
fn click(c: &mut NoteController, n: &mut Note, me: ClientId, device: DeviceClass, now_ms: i64) -> Vec<NoteEffect> {
    let mut effects = c.pointer_down(n, HitPart::Body, Point::new(1150.0, 1150.0));
    if effects.contains(&NoteEffect::Select) {
        n.selected_by = Some(me);
    }
    effects.extend(c.pointer_up(n, device, now_ms));
    effects
}

fn enter() -> Key {
    Key::new("Enter")
}

// =============================================================================
// Press / drag / resize
// =============================================================================

#[test]
fn press_selects_raises_and_starts_drag() {
    let (mut c, n, _) = setup();
    let effects = c.pointer_down(&n, HitPart::Body, Point::new(1150.0, 1130.0));
    assert_eq!(effects, vec![NoteEffect::Select, NoteEffect::BringToFront]);
    assert_eq!(
        c.state(),
        &InteractionState::Dragging { offset: Point::new(50.0, 30.0), origin: Point::new(1150.0, 1130.0), moved: false }
    );
}

#[test]
fn press_on_own_selection_only_raises() {
    let (mut c, mut n, me) = setup();
    n.selected_by = Some(me);
    assert_eq!(c.pointer_down(&n, HitPart::Body, Point::new(1150.0, 1150.0)), vec![NoteEffect::BringToFront]);
}

#[test]
fn foreign_selection_refuses_interaction() {
    let (mut c, mut n, _) = setup();
    n.selected_by = Some(Uuid::new_v4());
    assert!(c.pointer_down(&n, HitPart::Body, Point::new(1150.0, 1150.0)).is_empty());
    assert!(c.pointer_down(&n, HitPart::ResizeHandle, Point::new(1290.0, 1290.0)).is_empty());
    assert_eq!(c.state(), &InteractionState::Idle);
    assert!(c.double_click(&n).is_empty());
    assert!(!c.is_editing());
    assert_eq!(c.request_delete(&n, DeviceClass::Desktop, |_| true), DeleteOutcome::NotAllowed);
}

#[test]
fn drag_follows_pointer_minus_offset_with_throttling() {
    let (mut c, n, _) = setup();
    let s = space();
    c.pointer_down(&n, HitPart::Body, Point::new(1150.0, 1150.0));

    let mut applied = Vec::new();
    // Ten moves inside 100 ms.
    for i in 0..10_i32 {
        let pointer = Point::new(1160.0 + f64::from(i) * 10.0, 1150.0);
        if let Some(patch) = c.pointer_move(&n, pointer, &s, DeviceClass::Desktop, i64::from(i * 10), None) {
            applied.push(patch);
        }
    }
    assert_eq!(applied, vec![NotePatch::position(Point::new(1110.0, 1100.0))]);
    assert_eq!(c.next_deadline(), Some(100));
    assert_eq!(c.poll(99), None);
    applied.extend(c.poll(100));
    assert_eq!(applied.len(), 2);
    assert_eq!(applied[1], NotePatch::position(Point::new(1200.0, 1100.0)));
    assert_eq!(c.poll(500), None);
}

#[test]
fn movement_inside_click_slop_does_not_move() {
    let (mut c, n, _) = setup();
    c.pointer_down(&n, HitPart::Body, Point::new(1150.0, 1150.0));
    assert!(c.pointer_move(&n, Point::new(1153.0, 1150.0), &space(), DeviceClass::Desktop, 0, None).is_none());
    assert!(!c.throttle.is_pending());
}

#[test]
fn click_slop_is_measured_on_screen() {
    let (mut c, n, _) = setup();
    let zoomed = CoordinateSpace::new(space().bounds, Viewport::new(Point::default(), 2.0));
    c.pointer_down(&n, HitPart::Body, Point::new(1150.0, 1150.0));
    let patch = c.pointer_move(&n, Point::new(1153.0, 1150.0), &zoomed, DeviceClass::Desktop, 0, None);
    assert_eq!(patch, Some(NotePatch::position(Point::new(1103.0, 1100.0))));
}

#[test]
fn mobile_drag_stays_inside_board() {
    let me = Uuid::new_v4();
    let n = note(180.0, 140.0);
    let mut c = NoteController::new(n.id, me, config());
    c.pointer_down(&n, HitPart::Body, Point::new(1150.0, 1150.0));
    let patch = c.pointer_move(&n, Point::new(950.0, 1150.0), &space(), DeviceClass::Mobile, 0, None);
    assert_eq!(patch, Some(NotePatch::position(Point::new(1016.0, 1100.0))));
}

#[test]
fn desktop_drag_is_unconstrained() {
    let (mut c, n, _) = setup();
    c.pointer_down(&n, HitPart::Body, Point::new(1150.0, 1150.0));
    let patch = c.pointer_move(&n, Point::new(-500.0, 1150.0), &space(), DeviceClass::Desktop, 0, None);
    assert_eq!(patch, Some(NotePatch::position(Point::new(-550.0, 1100.0))));
}

#[test]
fn resize_adds_pointer_delta_and_clamps() {
    let (mut c, n, _) = setup();
    let s = space();
    c.pointer_down(&n, HitPart::ResizeHandle, Point::new(1290.0, 1290.0));
    assert!(matches!(c.state(), InteractionState::Resizing { .. }));

    let grown = c.pointer_move(&n, Point::new(1340.0, 1310.0), &s, DeviceClass::Desktop, 0, None);
    assert_eq!(grown, Some(NotePatch::dimensions(Dimensions::new(250.0, 220.0))));

    let shrunk = c.pointer_move(&n, Point::new(1000.0, 1000.0), &s, DeviceClass::Desktop, 1_000, None);
    assert_eq!(shrunk, Some(NotePatch::dimensions(Dimensions::new(200.0, 200.0))));

    let huge = c.pointer_move(&n, Point::new(9000.0, 9000.0), &s, DeviceClass::Desktop, 2_000, None);
    assert_eq!(huge, Some(NotePatch::dimensions(Dimensions::new(500.0, 500.0))));
}

#[test]
fn release_ends_drag_or_resize() {
    let (mut c, n, _) = setup();
    c.pointer_down(&n, HitPart::ResizeHandle, Point::new(1290.0, 1290.0));
    assert!(c.is_manipulating());
    assert!(c.pointer_up(&n, DeviceClass::Desktop, 0).is_empty());
    assert_eq!(c.state(), &InteractionState::Selected);
    assert!(c.pointer_move(&n, Point::new(0.0, 0.0), &space(), DeviceClass::Desktop, 10, None).is_none());
}

#[test]
fn release_while_idle_is_ignored() {
    let (mut c, n, _) = setup();
    assert!(c.pointer_up(&n, DeviceClass::Desktop, 0).is_empty());
    assert_eq!(c.state(), &InteractionState::Idle);
}

#[test]
fn drag_inside_window_keeps_unsent_resize() {
    let (mut c, n, _) = setup();
    let s = space();
    c.pointer_down(&n, HitPart::ResizeHandle, Point::new(1290.0, 1290.0));
    let first = c.pointer_move(&n, Point::new(1340.0, 1340.0), &s, DeviceClass::Desktop, 0, None);
    assert_eq!(first, Some(NotePatch::dimensions(Dimensions::new(250.0, 250.0))));
    assert!(c.pointer_move(&n, Point::new(1390.0, 1390.0), &s, DeviceClass::Desktop, 10, None).is_none());
    c.pointer_up(&n, DeviceClass::Desktop, 20);

    c.pointer_down(&n, HitPart::Body, Point::new(1150.0, 1150.0));
    assert!(c.pointer_move(&n, Point::new(1250.0, 1150.0), &s, DeviceClass::Desktop, 40, None).is_none());

    let trailing = c.poll(100).unwrap();
    assert_eq!(trailing.dimensions, Some(Dimensions::new(300.0, 300.0)));
    assert_eq!(trailing.position, Some(Point::new(1200.0, 1100.0)));
}

// =============================================================================
// Click → edit
// =============================================================================

#[test]
fn double_click_starts_editing() {
    let (mut c, mut n, me) = setup();
    click(&mut c, &mut n, me, DeviceClass::Desktop, 0);
    assert_eq!(c.state(), &InteractionState::Selected);
    let effects = click(&mut c, &mut n, me, DeviceClass::Desktop, 200);
    assert_eq!(effects, vec![NoteEffect::BringToFront, NoteEffect::EditStarted("hello".into())]);
    assert_eq!(c.edit_buffer(), Some("hello"));
}

#[test]
fn slow_clicks_do_not_edit() {
    let (mut c, mut n, me) = setup();
    click(&mut c, &mut n, me, DeviceClass::Desktop, 0);
    click(&mut c, &mut n, me, DeviceClass::Desktop, 400);
    assert!(!c.is_editing());
}

#[test]
fn drag_between_clicks_breaks_double_click() {
    let (mut c, mut n, me) = setup();
    click(&mut c, &mut n, me, DeviceClass::Desktop, 0);
    c.pointer_down(&n, HitPart::Body, Point::new(1150.0, 1150.0));
    c.pointer_move(&n, Point::new(1200.0, 1150.0), &space(), DeviceClass::Desktop, 50, None);
    c.pointer_up(&n, DeviceClass::Desktop, 60);
    click(&mut c, &mut n, me, DeviceClass::Desktop, 100);
    assert!(!c.is_editing());
}

#[test]
fn mobile_second_tap_on_selected_note_edits() {
    let (mut c, mut n, me) = setup();
    click(&mut c, &mut n, me, DeviceClass::Mobile, 0);
    assert!(!c.is_editing());
    click(&mut c, &mut n, me, DeviceClass::Mobile, 5_000);
    assert!(c.is_editing());
}

#[test]
fn desktop_single_click_on_selected_note_does_not_edit() {
    let (mut c, mut n, me) = setup();
    click(&mut c, &mut n, me, DeviceClass::Desktop, 0);
    click(&mut c, &mut n, me, DeviceClass::Desktop, 5_000);
    assert!(!c.is_editing());
}

#[test]
fn host_double_click_selects_and_edits() {
    let (mut c, n, _) = setup();
    let effects = c.double_click(&n);
    assert_eq!(effects, vec![NoteEffect::Select, NoteEffect::EditStarted("hello".into())]);
}

// =============================================================================
// Editing
// =============================================================================

#[test]
fn enter_commits_sanitized_buffer_and_deselects() {
    let (mut c, n, _) = setup();
    c.double_click(&n);
    c.text_input("<b>hi</b>");
    let effects = c.key(&n, &enter(), Modifiers::default());
    let expected = sanitize_note_text("<b>hi</b>").text;
    assert_eq!(
        effects,
        vec![NoteEffect::Update(NotePatch::text(expected)), NoteEffect::EditEnded, NoteEffect::Deselect]
    );
    assert_eq!(c.state(), &InteractionState::Idle);
}

#[test]
fn live_buffer_is_not_sanitized() {
    let (mut c, n, _) = setup();
    c.double_click(&n);
    c.text_input("a < b");
    assert_eq!(c.edit_buffer(), Some("a < b"));
}

#[test]
fn shift_enter_keeps_editing() {
    let (mut c, n, _) = setup();
    c.double_click(&n);
    let shift = Modifiers { shift: true, ..Modifiers::default() };
    assert!(c.key(&n, &enter(), shift).is_empty());
    assert!(c.is_editing());
}

#[test]
fn escape_reverts_edit() {
    let (mut c, n, _) = setup();
    c.double_click(&n);
    c.text_input("changed");
    assert_eq!(c.key(&n, &Key::new("Escape"), Modifiers::default()), vec![NoteEffect::EditEnded]);
    assert_eq!(c.state(), &InteractionState::Selected);
    assert_eq!(c.edit_buffer(), None);
}

#[test]
fn blur_with_unchanged_text_only_ends_edit() {
    let (mut c, n, _) = setup();
    c.double_click(&n);
    assert_eq!(c.blur(&n), vec![NoteEffect::EditEnded, NoteEffect::Deselect]);
    assert!(c.blur(&n).is_empty());
}

#[test]
fn reopening_escaped_text_edits_what_was_typed() {
    let (mut c, mut n, _) = setup();
    n.text = sanitize_note_text("don't & go").text;
    assert_eq!(n.text, "don&#x27;t &amp; go");

    for _ in 0..2 {
        let effects = c.double_click(&n);
        assert_eq!(effects.last(), Some(&NoteEffect::EditStarted("don't & go".into())));
        assert_eq!(c.blur(&n), vec![NoteEffect::EditEnded, NoteEffect::Deselect]);
    }
}

#[test]
fn overlong_text_is_truncated_on_commit() {
    let (mut c, n, _) = setup();
    c.double_click(&n);
    c.text_input(&"x".repeat(6_000));
    let effects = c.blur(&n);
    let NoteEffect::Update(patch) = &effects[0] else {
        panic!("expected update");
    };
    assert_eq!(patch.text.as_ref().map(|t| t.chars().count()), Some(5_000));
}

#[test]
fn press_while_editing_is_ignored() {
    let (mut c, n, _) = setup();
    c.double_click(&n);
    assert!(c.pointer_down(&n, HitPart::Body, Point::new(1150.0, 1150.0)).is_empty());
    assert!(c.is_editing());
}

// =============================================================================
// Colour
// =============================================================================

#[test]
fn picker_requires_selection() {
    let (mut c, mut n, me) = setup();
    assert!(!c.open_picker());
    click(&mut c, &mut n, me, DeviceClass::Desktop, 0);
    assert!(c.open_picker());
}

#[test]
fn choosing_preset_closes_picker() {
    let (mut c, mut n, me) = setup();
    click(&mut c, &mut n, me, DeviceClass::Desktop, 0);
    c.open_picker();
    assert_eq!(c.choose_color("#bae1ff", 0, None), Some(NotePatch::color("#bae1ff")));
    assert!(!c.is_picker_open());
    assert_eq!(c.choose_color("#ffb3ba", 10, None), None);
}

#[test]
fn non_preset_color_is_ignored() {
    let (mut c, mut n, me) = setup();
    click(&mut c, &mut n, me, DeviceClass::Desktop, 0);
    c.open_picker();
    assert_eq!(c.choose_color("#123456", 0, None), None);
    assert!(c.is_picker_open());
}

#[test]
fn escape_closes_picker() {
    let (mut c, mut n, me) = setup();
    click(&mut c, &mut n, me, DeviceClass::Desktop, 0);
    c.open_picker();
    assert!(c.key(&n, &Key::new("Escape"), Modifiers::default()).is_empty());
    assert!(!c.is_picker_open());
    assert_eq!(c.state(), &InteractionState::Selected);
}

// =============================================================================
// Delete / sync
// =============================================================================

#[test]
fn delete_needs_own_selection_and_confirmation() {
    let (mut c, mut n, me) = setup();
    assert_eq!(c.request_delete(&n, DeviceClass::Desktop, |_| true), DeleteOutcome::NotAllowed);

    n.selected_by = Some(me);
    let mut prompt = String::new();
    let outcome = c.request_delete(&n, DeviceClass::Desktop, |msg| {
        prompt = msg.to_owned();
        false
    });
    assert_eq!(outcome, DeleteOutcome::Declined);
    assert_eq!(prompt, "Are you sure you want to delete this note?");

    assert_eq!(c.request_delete(&n, DeviceClass::Mobile, |msg| msg == "Delete this note?"), DeleteOutcome::Confirmed);
    assert_eq!(c.state(), &InteractionState::Idle);
}

#[test]
fn losing_selection_returns_to_idle() {
    let (mut c, mut n, me) = setup();
    click(&mut c, &mut n, me, DeviceClass::Desktop, 0);
    c.open_picker();
    n.selected_by = None;
    c.reconcile(&n);
    assert_eq!(c.state(), &InteractionState::Idle);
    assert!(!c.is_picker_open());
}

#[test]
fn remote_takeover_does_not_abort_drag() {
    let (mut c, mut n, _) = setup();
    c.pointer_down(&n, HitPart::Body, Point::new(1150.0, 1150.0));
    n.selected_by = Some(Uuid::new_v4());
    c.reconcile(&n);
    assert!(c.is_manipulating());
}

#[test]
fn cancel_drops_pending_update() {
    let (mut c, n, _) = setup();
    let s = space();
    c.pointer_down(&n, HitPart::Body, Point::new(1150.0, 1150.0));
    c.pointer_move(&n, Point::new(1170.0, 1150.0), &s, DeviceClass::Desktop, 0, None);
    c.pointer_move(&n, Point::new(1180.0, 1150.0), &s, DeviceClass::Desktop, 10, None);
    assert!(c.next_deadline().is_some());
    c.cancel();
    assert_eq!(c.next_deadline(), None);
    assert_eq!(c.poll(1_000), None);
    assert_eq!(c.id(), n.id);
}
