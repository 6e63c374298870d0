#![allow(clippy::float_cmp)]

use std::sync::{Arc, Mutex};

use serde_json::json;

use super::*;

// =============================================================================
// MemoryContainer
// =============================================================================

#[test]
fn board_namespace() {
    let c = MemoryContainer::for_board("abcd1234");
    assert_eq!(c.namespace(), "notes-board-abcd1234");
    assert!(c.is_empty());
}

#[test]
fn set_get_delete() {
    let mut c = MemoryContainer::new("ns");
    c.set("a", Some(json!(1)));
    assert_eq!(c.get("a"), Some(json!(1)));
    assert_eq!(c.len(), 1);
    c.set("a", None);
    assert_eq!(c.get("a"), None);
    assert!(c.is_empty());
}

#[test]
fn keys_with_prefix_filters() {
    let mut c = MemoryContainer::new("ns");
    c.set("notes.1", Some(json!({})));
    c.set("notes.2", Some(json!({})));
    c.set("liveUsers.1", Some(json!({})));
    assert_eq!(c.keys_with_prefix("notes."), vec!["notes.1".to_owned(), "notes.2".to_owned()]);
    assert_eq!(c.keys().len(), 3);
}

#[test]
fn listeners_see_sets_and_deletes() {
    let seen: Arc<Mutex<Vec<(String, Option<Value>)>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let mut c = MemoryContainer::new("ns");
    c.subscribe(Box::new(move |k, v| sink.lock().unwrap().push((k.to_owned(), v.cloned()))));
    c.set("x", Some(json!("v")));
    c.set("x", None);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.as_slice(), &[("x".to_owned(), Some(json!("v"))), ("x".to_owned(), None)]);
}

#[test]
fn unsubscribe_stops_notifications() {
    let count = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&count);
    let mut c = MemoryContainer::new("ns");
    let id = c.subscribe(Box::new(move |_, _| *sink.lock().unwrap() += 1));
    c.set("x", Some(json!(1)));
    assert!(c.unsubscribe(id));
    assert!(!c.unsubscribe(id));
    c.set("x", Some(json!(2)));
    assert_eq!(*count.lock().unwrap(), 1);
}

// =============================================================================
// Connection / latency
// =============================================================================

#[test]
fn connection_state_wire_names() {
    assert_eq!(serde_json::to_value(ConnectionState::Disconnecting).unwrap(), json!("disconnecting"));
    assert_eq!(ConnectionState::default(), ConnectionState::Connecting);
    assert!(ConnectionState::Connected.is_connected());
}

#[test]
fn latency_unknown_without_samples() {
    let m = LatencyMonitor::new();
    assert_eq!(m.average(), None);
    assert_eq!(m.tier(), LatencyTier::Unknown);
}

#[test]
fn latency_average_and_tiers() {
    let mut m = LatencyMonitor::new();
    m.record(50.0);
    m.record(70.0);
    assert_eq!(m.average(), Some(60.0));
    assert_eq!(m.tier(), LatencyTier::Good);
    m.record(380.0);
    assert_eq!(m.tier(), LatencyTier::Fair);
    m.record(1000.0);
    assert_eq!(m.tier(), LatencyTier::Poor);
}

#[test]
fn latency_window_drops_oldest() {
    let mut m = LatencyMonitor::new();
    m.record(10_000.0);
    for _ in 0..LATENCY_WINDOW {
        m.record(20.0);
    }
    assert_eq!(m.average(), Some(20.0));
}

#[test]
fn latency_ignores_bad_samples() {
    let mut m = LatencyMonitor::new();
    m.record(-5.0);
    m.record(f64::NAN);
    assert_eq!(m.average(), None);
    m.record(30.0);
    m.reset();
    assert_eq!(m.average(), None);
}
