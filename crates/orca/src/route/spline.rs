//! Curve fitting inside a router-box chain.
//!
//! Through points become a piecewise cubic with Catmull-Rom tangents. The
//! verify-and-repair loop then samples each piece; where the curve escapes
//! the chain it binary-searches the first exit parameter, splits there, and
//! straightens the offending piece. Straight segments between through points
//! lie in the chain by construction, so the loop terminates.

use super::boxes::{RouterBox, contains};
use crate::geom::{Bezier, Point};

const SAMPLES: usize = 9;
const BISECTIONS: usize = 24;
const REPAIR_ROUNDS: usize = 8;
const TOL: f64 = 1e-3;

pub(crate) fn fit(points: &[Point]) -> Vec<Bezier> {
    match points.len() {
        0 | 1 => Vec::new(),
        2 => vec![Bezier::line(points[0], points[1])],
        n => {
            let tangent = |i: usize| -> Point {
                let prev = points[i.saturating_sub(1)];
                let next = points[(i + 1).min(n - 1)];
                Point::new((next.x - prev.x) / 2.0, (next.y - prev.y) / 2.0)
            };
            (0..n - 1)
                .map(|i| {
                    let (a, b) = (points[i], points[i + 1]);
                    let (ta, tb) = (tangent(i), tangent(i + 1));
                    Bezier {
                        p0: a,
                        p1: Point::new(a.x + ta.x / 3.0, a.y + ta.y / 3.0),
                        p2: Point::new(b.x - tb.x / 3.0, b.y - tb.y / 3.0),
                        p3: b,
                    }
                })
                .collect()
        }
    }
}

/// Fits through `points` and repairs until every sampled curve point lies in
/// the chain. Gives back a straight polyline through the points if the
/// repair budget runs out.
pub(crate) fn fit_in_chain(points: &[Point], chain: &[RouterBox]) -> Vec<Bezier> {
    let mut curve = fit(points);
    for _ in 0..REPAIR_ROUNDS {
        match first_escape(&curve, chain) {
            None => return curve,
            Some((seg, t)) => repair(&mut curve, seg, t),
        }
    }
    points
        .windows(2)
        .map(|w| Bezier::line(w[0], w[1]))
        .collect()
}

/// First (segment, parameter) at which the curve leaves the chain, refined
/// by bisection between the last inside sample and the first outside one.
fn first_escape(curve: &[Bezier], chain: &[RouterBox]) -> Option<(usize, f64)> {
    for (i, seg) in curve.iter().enumerate() {
        let mut last_inside = 0.0;
        for s in 1..=SAMPLES {
            let t = s as f64 / SAMPLES as f64;
            if contains(chain, seg.eval(t), TOL) {
                last_inside = t;
                continue;
            }
            let (mut lo, mut hi) = (last_inside, t);
            for _ in 0..BISECTIONS {
                let mid = (lo + hi) / 2.0;
                if contains(chain, seg.eval(mid), TOL) {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            return Some((i, lo));
        }
    }
    None
}

/// Splits the escaping segment at the exit parameter and replaces both
/// halves with straight lines; neighbors keep their shape.
fn repair(curve: &mut Vec<Bezier>, seg: usize, t: f64) {
    let old = curve[seg];
    if t <= TOL || t >= 1.0 - TOL {
        curve[seg] = Bezier::line(old.p0, old.p3);
        return;
    }
    let (a, b) = old.split(t);
    curve[seg] = Bezier::line(a.p0, a.p3);
    curve.insert(seg + 1, Bezier::line(b.p0, b.p3));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Rect;

    #[test]
    fn two_points_fit_a_line() {
        let curve = fit(&[Point::new(0.0, 0.0), Point::new(10.0, 10.0)]);
        assert_eq!(curve.len(), 1);
        assert_eq!(curve[0].eval(0.0), Point::new(0.0, 0.0));
        assert_eq!(curve[0].eval(1.0), Point::new(10.0, 10.0));
    }

    #[test]
    fn curve_interpolates_through_points() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 30.0),
            Point::new(0.0, 60.0),
        ];
        let curve = fit(&pts);
        assert_eq!(curve.len(), 2);
        assert!(curve[0].eval(1.0).distance(pts[1]) < 1e-9);
        assert!(curve[1].eval(0.0).distance(pts[1]) < 1e-9);
    }

    #[test]
    fn repair_keeps_curve_inside_a_tight_chain() {
        // A narrow vertical corridor that the free-form fit would overshoot.
        let chain = [RouterBox {
            rect: Rect::from_bounds(-2.0, 0.0, 2.0, 100.0),
        }];
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(1.9, 50.0),
            Point::new(0.0, 100.0),
        ];
        let curve = fit_in_chain(&pts, &chain);
        for seg in &curve {
            for s in 0..=16 {
                let p = seg.eval(s as f64 / 16.0);
                assert!(contains(&chain, p, 1e-2), "{p:?} escaped");
            }
        }
    }
}
