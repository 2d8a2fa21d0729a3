//! Segment intersection, reflection and rectangle tests.
//!
//! Every collision and line-of-sight check in the crate goes through these
//! functions. Degenerate input (parallel or zero-length segments) is reported
//! as "no intersection", never as an error.

use crate::types::{Point, Rect};

/// Cross products below this magnitude are treated as parallel segments.
pub const PARALLEL_EPSILON: f64 = 1e-8;

/// A level-authored static obstacle segment in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionLine {
    pub start: Point,
    pub end: Point,
}

impl CollisionLine {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        CollisionLine {
            start: Point::new(x1, y1),
            end: Point::new(x2, y2),
        }
    }

    /// True when the line spans more horizontally than vertically.
    pub fn is_more_horizontal(&self) -> bool {
        (self.start.y - self.end.y).abs() < (self.start.x - self.end.x).abs()
    }
}

/// Segment a→b paired with segment c→d, solved for the scalar parameters
/// `t` (along a→b) and `u` (along c→d).
fn solve(a: Point, b: Point, c: Point, d: Point) -> Option<(f64, f64)> {
    let d1 = b - a;
    let d2 = d - c;
    let cross = d1.x * d2.y - d1.y * d2.x;
    if cross.abs() < PARALLEL_EPSILON {
        return None;
    }
    let ac = c - a;
    let t = (ac.x * d2.y - ac.y * d2.x) / cross;
    let u = (ac.x * d1.y - ac.y * d1.x) / cross;
    Some((t, u))
}

fn in_unit_range(v: f64) -> bool {
    (0.0..=1.0).contains(&v)
}

/// Whether segment p1→p2 crosses segment p3→p4 (endpoints inclusive).
pub fn segments_intersect(p1: Point, p2: Point, p3: Point, p4: Point) -> bool {
    match solve(p1, p2, p3, p4) {
        Some((t, u)) => in_unit_range(t) && in_unit_range(u),
        None => false,
    }
}

/// The crossing point of segment p1→p2 with segment p3→p4, if any.
pub fn segment_intersection_point(p1: Point, p2: Point, p3: Point, p4: Point) -> Option<Point> {
    let (t, u) = solve(p1, p2, p3, p4)?;
    if in_unit_range(t) && in_unit_range(u) {
        Some(p1 + (p2 - p1) * t)
    } else {
        None
    }
}

/// Mirrors `point` across the infinite line through `line_start` and `line_end`.
///
/// A zero-length line has no direction; the point is returned unchanged.
pub fn reflect_point_over_line(point: Point, line_start: Point, line_end: Point) -> Point {
    let ab = line_end - line_start;
    let ab2 = ab.dot(&ab);
    if ab2 == 0.0 {
        return point;
    }
    let t = (point - line_start).dot(&ab) / ab2;
    let closest = line_start + ab * t;
    closest * 2.0 - point
}

/// Inclusive point-in-rectangle test.
pub fn point_in_rect(point: Point, rect: &Rect) -> bool {
    point.x >= rect.x && point.x <= rect.right() && point.y >= rect.y && point.y <= rect.bottom()
}

/// True if either endpoint of the path lies inside `rect` or the path
/// crosses any of its four edges.
pub fn path_intersects_rect(start: Point, end: Point, rect: &Rect) -> bool {
    if point_in_rect(start, rect) || point_in_rect(end, rect) {
        return true;
    }
    let tl = Point::new(rect.x, rect.y);
    let tr = Point::new(rect.right(), rect.y);
    let bl = Point::new(rect.x, rect.bottom());
    let br = Point::new(rect.right(), rect.bottom());
    [(tl, tr), (bl, br), (tl, bl), (tr, br)]
        .iter()
        .any(|&(a, b)| segment_intersection_point(start, end, a, b).is_some())
}

/// True if segment start→end crosses any of `lines`.
pub fn crosses_any_line<'a, I>(start: Point, end: Point, lines: I) -> bool
where
    I: IntoIterator<Item = &'a CollisionLine>,
{
    lines
        .into_iter()
        .any(|line| segments_intersect(start, end, line.start, line.end))
}
