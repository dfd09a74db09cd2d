//! Clipping routed paths against node and cluster shapes.
//!
//! Curves are clipped on the Bezier parameter by bisection; polylines on the
//! segment. Paths not touching the shape come back unchanged, paths wholly
//! inside come back empty.

use crate::geom::{Bezier, Point, Rect};
use crate::model::NodeShape;

const BISECTIONS: usize = 32;

/// Clips the start of the curve out of `shape` placed at `rect`.
pub(crate) fn clip_spline_start(
    mut curve: Vec<Bezier>,
    shape: &dyn NodeShape,
    rect: Rect,
) -> Vec<Bezier> {
    let inside = |p: Point| shape.contains(rect, p);
    if curve.first().is_none_or(|s| !inside(s.eval(0.0))) {
        return curve;
    }
    // Drop whole segments still inside, then bisect within the first one
    // that exits.
    while let Some(first) = curve.first() {
        if inside(first.eval(1.0)) {
            curve.remove(0);
        } else {
            break;
        }
    }
    let Some(first) = curve.first().copied() else {
        return curve; // fully inside
    };
    let t = exit_parameter(&first, &inside);
    let (_, outer) = first.split(t);
    curve[0] = outer;
    curve
}

pub(crate) fn clip_spline_end(
    curve: Vec<Bezier>,
    shape: &dyn NodeShape,
    rect: Rect,
) -> Vec<Bezier> {
    let mut reversed: Vec<Bezier> = curve.into_iter().rev().map(reverse_bezier).collect();
    reversed = clip_spline_start(reversed, shape, rect);
    reversed.into_iter().rev().map(reverse_bezier).collect()
}

/// Shortens the end of the curve by `dist`, making room for an arrowhead.
pub(crate) fn reserve_at_end(mut curve: Vec<Bezier>, dist: f64) -> Vec<Bezier> {
    if dist <= 0.0 {
        return curve;
    }
    let Some(end) = curve.last().map(|s| s.eval(1.0)) else {
        return curve;
    };
    while let Some(last) = curve.last() {
        if last.eval(0.0).distance(end) <= dist {
            curve.pop();
        } else {
            break;
        }
    }
    let Some(last) = curve.last().copied() else {
        return curve; // curve shorter than the reservation: drop the spline
    };
    let inside = |p: Point| p.distance(end) <= dist;
    let rev = reverse_bezier(last);
    let t = exit_parameter(&rev, &inside);
    let (_, outer) = rev.split(t);
    *curve.last_mut().expect("non-empty") = reverse_bezier(outer);
    curve
}

/// Parameter at which a curve starting inside the predicate first leaves it,
/// assuming `eval(1.0)` is outside.
fn exit_parameter(seg: &Bezier, inside: &dyn Fn(Point) -> bool) -> f64 {
    let (mut lo, mut hi) = (0.0f64, 1.0f64);
    for _ in 0..BISECTIONS {
        let mid = (lo + hi) / 2.0;
        if inside(seg.eval(mid)) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

fn reverse_bezier(b: Bezier) -> Bezier {
    Bezier {
        p0: b.p3,
        p1: b.p2,
        p2: b.p1,
        p3: b.p0,
    }
}

/// Polyline counterpart, clipping the start out of `rect`.
pub(crate) fn clip_polyline_start(points: &[Point], rect: &Rect) -> Vec<Point> {
    let Some(&first) = points.first() else {
        return Vec::new();
    };
    if !rect.contains(first) {
        return points.to_vec();
    }
    for i in 1..points.len() {
        if !rect.contains(points[i]) {
            let crossing = boundary_crossing(points[i - 1], points[i], rect);
            let mut out = vec![crossing];
            out.extend_from_slice(&points[i..]);
            return out;
        }
    }
    Vec::new() // fully inside
}

pub(crate) fn clip_polyline_end(points: &[Point], rect: &Rect) -> Vec<Point> {
    let mut rev: Vec<Point> = points.iter().rev().copied().collect();
    rev = clip_polyline_start(&rev, rect);
    rev.reverse();
    rev
}

/// Point where segment a(inside) -> b(outside) crosses the rectangle border,
/// found by the same bisection used for curves.
fn boundary_crossing(a: Point, b: Point, rect: &Rect) -> Point {
    let seg = Bezier::line(a, b);
    let inside = |p: Point| rect.contains(p);
    seg.eval(exit_parameter(&seg, &inside))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RectShape;

    #[test]
    fn disjoint_path_is_unchanged() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let pts = vec![Point::new(20.0, 0.0), Point::new(30.0, 0.0)];
        assert_eq!(clip_polyline_start(&pts, &rect), pts);

        let curve = vec![Bezier::line(Point::new(20.0, 0.0), Point::new(30.0, 0.0))];
        let clipped = clip_spline_start(curve.clone(), &RectShape, rect);
        assert_eq!(clipped.len(), 1);
        assert_eq!(clipped[0].p0, curve[0].p0);
    }

    #[test]
    fn contained_path_clips_to_nothing() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let pts = vec![Point::new(-10.0, 0.0), Point::new(10.0, 0.0)];
        assert!(clip_polyline_start(&pts, &rect).is_empty());

        let curve = vec![Bezier::line(Point::new(-10.0, 0.0), Point::new(10.0, 0.0))];
        assert!(clip_spline_start(curve, &RectShape, rect).is_empty());
    }

    #[test]
    fn start_lands_on_the_border() {
        let rect = Rect::new(0.0, 0.0, 20.0, 20.0);
        let pts = vec![Point::new(0.0, 0.0), Point::new(50.0, 0.0)];
        let out = clip_polyline_start(&pts, &rect);
        assert_eq!(out.len(), 2);
        assert!((out[0].x - 10.0).abs() < 1e-6, "got {}", out[0].x);
    }

    #[test]
    fn arrow_reservation_shortens_the_curve() {
        let curve = vec![Bezier::line(Point::new(0.0, 0.0), Point::new(100.0, 0.0))];
        let out = reserve_at_end(curve, 10.0);
        let end = out.last().unwrap().eval(1.0);
        assert!((end.x - 90.0).abs() < 1e-3, "got {}", end.x);
    }
}
