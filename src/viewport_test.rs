#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-6;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn point_approx_eq(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

fn space(left: f64, top: f64, pan: Point, zoom: f64) -> CoordinateSpace {
    CoordinateSpace::new(BoardBounds::new(800.0, 600.0, left, top), Viewport { pan_offset: pan, zoom_level: zoom })
}

// --- Point / Rect ---

#[test]
fn point_distance_and_midpoint() {
    let a = Point::new(0.0, 0.0);
    let b = Point::new(3.0, 4.0);
    assert!(approx_eq(a.distance(b), 5.0));
    assert_eq!(a.midpoint(b), Point::new(1.5, 2.0));
}

#[test]
fn rect_contains_is_inclusive() {
    let r = Rect::new(10.0, 10.0, 20.0, 20.0);
    assert!(r.contains(Point::new(10.0, 10.0)));
    assert!(r.contains(Point::new(30.0, 30.0)));
    assert!(!r.contains(Point::new(30.1, 30.0)));
}

#[test]
fn rect_overlaps_with_buffer() {
    let a = Rect::new(0.0, 0.0, 100.0, 100.0);
    let b = Rect::new(105.0, 0.0, 100.0, 100.0);
    assert!(!a.overlaps(&b, 0.0));
    assert!(a.overlaps(&b, 10.0));
}

// --- BoardBounds ---

#[test]
fn zero_sized_bounds_are_degenerate() {
    assert!(BoardBounds::new(0.0, 600.0, 0.0, 0.0).is_degenerate());
    assert!(BoardBounds::new(800.0, 0.0, 0.0, 0.0).is_degenerate());
    assert!(BoardBounds::new(f64::NAN, 600.0, 0.0, 0.0).is_degenerate());
    assert!(!BoardBounds::new(800.0, 600.0, 0.0, 0.0).is_degenerate());
}

#[test]
fn contains_screen_uses_offset() {
    let b = BoardBounds::new(100.0, 100.0, 50.0, 50.0);
    assert!(b.contains_screen(Point::new(60.0, 60.0)));
    assert!(!b.contains_screen(Point::new(40.0, 60.0)));
}

// --- Zoom clamping ---

#[test]
fn clamp_zoom_limits() {
    assert_eq!(clamp_zoom(0.01, 1.0), MIN_ZOOM);
    assert_eq!(clamp_zoom(50.0, 1.0), MAX_ZOOM);
    assert_eq!(clamp_zoom(2.5, 1.0), 2.5);
}

#[test]
fn clamp_zoom_non_finite_keeps_fallback() {
    assert_eq!(clamp_zoom(f64::NAN, 2.0), 2.0);
    assert_eq!(clamp_zoom(f64::INFINITY, 0.5), 0.5);
    assert_eq!(clamp_zoom(f64::NAN, f64::NAN), DEFAULT_ZOOM);
}

#[test]
fn viewport_default_is_reset_state() {
    let v = Viewport::default();
    assert_eq!(v.pan_offset, Point::new(0.0, 0.0));
    assert_eq!(v.zoom_level, 1.0);
}

#[test]
fn viewport_serializes_camel_case() {
    let v = Viewport::default();
    let json = serde_json::to_value(v).unwrap();
    assert!(json.get("panOffset").is_some());
    assert_eq!(json["zoomLevel"], 1.0);
}

// --- Transforms ---

#[test]
fn screen_to_canvas_identity_view() {
    let s = space(0.0, 0.0, Point::new(0.0, 0.0), 1.0);
    let c = s.screen_to_canvas(Point::new(400.0, 300.0)).unwrap();
    assert!(point_approx_eq(c, Point::new(1400.0, 1300.0)));
}

#[test]
fn screen_to_canvas_subtracts_bounds_and_pan() {
    let s = space(10.0, 20.0, Point::new(30.0, 40.0), 2.0);
    let c = s.screen_to_canvas(Point::new(110.0, 120.0)).unwrap();
    // board (100, 100) less pan is (70, 60); halve it and add 1000 / 2
    assert!(point_approx_eq(c, Point::new(535.0, 530.0)));
}

#[test]
fn round_trip_over_many_views() {
    let pans = [Point::new(0.0, 0.0), Point::new(-350.5, 120.25), Point::new(9000.0, -42.0)];
    let zooms = [0.1, 0.37, 1.0, 2.2, 5.0];
    let points = [Point::new(0.0, 0.0), Point::new(-1234.5, 987.0), Point::new(1e5, -1e5), Point::new(1000.0, 1000.0)];
    for pan in pans {
        for zoom in zooms {
            let s = space(13.0, 77.0, pan, zoom);
            for p in points {
                let back = s.screen_to_canvas(s.canvas_to_screen(p).unwrap()).unwrap();
                assert!((back.x - p.x).abs() < 1e-6 * p.x.abs().max(1.0), "{p:?} {pan:?} {zoom}");
                assert!((back.y - p.y).abs() < 1e-6 * p.y.abs().max(1.0), "{p:?} {pan:?} {zoom}");
            }
        }
    }
}

#[test]
fn degenerate_bounds_are_a_no_op() {
    let s = CoordinateSpace::new(BoardBounds::default(), Viewport::default());
    assert!(s.screen_to_canvas(Point::new(10.0, 10.0)).is_none());
    assert!(s.canvas_to_screen(Point::new(10.0, 10.0)).is_none());
    assert!(s.visible_canvas_rect().is_none());
}

// --- Zoom to cursor ---

#[test]
fn zoom_at_keeps_canvas_point_under_anchor() {
    let before = space(0.0, 0.0, Point::new(0.0, 0.0), 1.0);
    let cursor = Point::new(100.0, 50.0);
    let canvas_before = before.screen_to_canvas(cursor).unwrap();

    let after = CoordinateSpace::new(before.bounds, before.viewport.zoomed_at(cursor, 1.2));
    assert!(approx_eq(after.viewport.zoom_level, 1.2));
    let canvas_after = after.screen_to_canvas(cursor).unwrap();
    assert!(point_approx_eq(canvas_before, canvas_after));
}

#[test]
fn zoom_at_with_offset_bounds_and_pan() {
    let before = space(40.0, 60.0, Point::new(-250.0, 310.0), 0.8);
    let cursor_screen = Point::new(333.0, 222.0);
    let anchor = before.screen_to_board(cursor_screen);
    for target in [0.1, 0.5, 1.7, 4.9, 12.0] {
        let after = CoordinateSpace::new(before.bounds, before.viewport.zoomed_at(anchor, target));
        assert!(point_approx_eq(
            before.screen_to_canvas(cursor_screen).unwrap(),
            after.screen_to_canvas(cursor_screen).unwrap()
        ));
    }
}

#[test]
fn zoom_at_clamps_request() {
    let v = Viewport::default().zoomed_at(Point::new(0.0, 0.0), 100.0);
    assert_eq!(v.zoom_level, MAX_ZOOM);
    let v = Viewport::default().zoomed_at(Point::new(0.0, 0.0), -3.0);
    assert_eq!(v.zoom_level, MIN_ZOOM);
}

#[test]
fn zoom_at_same_zoom_leaves_pan() {
    let v = Viewport { pan_offset: Point::new(12.0, -7.0), zoom_level: 1.5 };
    let z = v.zoomed_at(Point::new(300.0, 200.0), 1.5);
    assert!(point_approx_eq(z.pan_offset, v.pan_offset));
}

// --- Centering / visible rect ---

#[test]
fn centered_on_puts_point_in_board_center() {
    let s = space(0.0, 0.0, Point::new(0.0, 0.0), 2.0);
    let target = Point::new(-500.0, 2500.0);
    let centered = CoordinateSpace::new(s.bounds, s.viewport.centered_on(target, 800.0, 600.0));
    assert!(point_approx_eq(centered.board_center_canvas().unwrap(), target));
}

#[test]
fn visible_rect_scales_with_zoom() {
    let s = space(0.0, 0.0, Point::new(0.0, 0.0), 2.0);
    let r = s.visible_canvas_rect().unwrap();
    assert!(approx_eq(r.width, 400.0));
    assert!(approx_eq(r.height, 300.0));
    assert!(approx_eq(r.x, 500.0));
}

#[test]
fn screen_dist_to_canvas_divides_by_zoom() {
    let s = space(0.0, 0.0, Point::new(0.0, 0.0), 4.0);
    assert!(approx_eq(s.screen_dist_to_canvas(20.0), 5.0));
}
