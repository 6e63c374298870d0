//! End-to-end: a spawned session fed host input on virtual time.

use std::time::Duration;

use noteboard::engine::{Action, InputEvent};
use noteboard::identity::Identity;
use noteboard::input::{Button, Key, Modifiers};
use noteboard::session::Session;
use noteboard::store::BoardStore;
use noteboard::sync::{MemoryContainer, StateContainer};
use noteboard::throttle::ThrottleConfig;
use noteboard::viewport::{BoardBounds, Point};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

const BOARD: &str = "team-retro-42";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn open_store() -> BoardStore<MemoryContainer> {
    let identity = Identity::new(Uuid::new_v4(), "Cleo55", "#96CEB4");
    BoardStore::open(BOARD, identity, MemoryContainer::for_board(BOARD)).unwrap()
}

fn click(screen: Point) -> [InputEvent; 2] {
    [InputEvent::PointerDown { screen, button: Button::Primary }, InputEvent::PointerUp { screen }]
}

fn drain(rx: &mut UnboundedReceiver<Action>) -> Vec<Action> {
    let mut out = Vec::new();
    while let Ok(action) = rx.try_recv() {
        out.push(action);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn create_edit_and_move_note() {
    init_tracing();
    let (tx, mut actions, handle) = Session::start(open_store(), ThrottleConfig::default()).spawn();

    tx.send(InputEvent::BoardResized(BoardBounds::new(800.0, 600.0, 0.0, 0.0))).unwrap();
    for event in click(Point::new(400.0, 300.0)).into_iter().chain(click(Point::new(400.0, 300.0))) {
        tx.send(event).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(drain(&mut actions).contains(&Action::RenderNeeded));

    // The new note spans screen (300,200)..(500,400); grab it and move right.
    tx.send(InputEvent::PointerDown { screen: Point::new(350.0, 250.0), button: Button::Primary }).unwrap();
    tx.send(InputEvent::PointerMove { screen: Point::new(450.0, 250.0) }).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    tx.send(InputEvent::PointerMove { screen: Point::new(460.0, 250.0) }).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(InputEvent::PointerUp { screen: Point::new(460.0, 250.0) }).unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;

    let drained = drain(&mut actions);
    assert!(drained.contains(&Action::SetCursor("default".into())), "drag never ended: {drained:?}");

    drop(tx);
    let engine = handle.await.unwrap();
    let notes = engine.store().sorted_notes();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].position, Point::new(1410.0, 1200.0));

    // Mirrored for other clients; presence retracted on shutdown.
    let key = format!("notes.{}", notes[0].id);
    assert_eq!(engine.store().container().get(&key).unwrap()["position"]["x"], 1410.0);
    assert!(engine.store().my_info().is_none());
}

#[tokio::test(start_paused = true)]
async fn double_click_edit_commits_sanitized_text() {
    init_tracing();
    let (tx, mut actions, handle) = Session::start(open_store(), ThrottleConfig::default()).spawn();

    tx.send(InputEvent::BoardResized(BoardBounds::new(800.0, 600.0, 0.0, 0.0))).unwrap();
    tx.send(InputEvent::AddNote).unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    drain(&mut actions);

    // Double-click the note in the middle of the board.
    let opened = {
        for event in click(Point::new(400.0, 300.0)) {
            tx.send(event).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        for event in click(Point::new(400.0, 300.0)) {
            tx.send(event).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
        drain(&mut actions)
    };
    let Some(id) = opened.iter().find_map(|a| match a {
        Action::EditStarted { id, .. } => Some(*id),
        _ => None,
    }) else {
        panic!("editor never opened: {opened:?}");
    };

    tx.send(InputEvent::TextInput { id, text: "<b>ship it</b>".into() }).unwrap();
    tx.send(InputEvent::KeyDown { key: Key::new("Enter"), modifiers: Modifiers::default() }).unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(drain(&mut actions).contains(&Action::EditEnded { id }));

    drop(tx);
    let engine = handle.await.unwrap();
    let note = engine.store().note(id).unwrap();
    assert_eq!(note.text, "&lt;b&gt;ship it&lt;&#x2F;b&gt;");
    assert_eq!(note.selected_by, None);
}
