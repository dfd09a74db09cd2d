//! Router-box chains.
//!
//! A routed edge is guided by an ordered chain of boxes: one hugging each
//! endpoint (split down to the port side when the edge is port-anchored),
//! one per waypoint rank band, and one per inter-rank channel in between.
//! The fitted curve must stay inside the union of its chain.

use crate::geom::{Point, Rect, segment_at_y};
use crate::model::{Port, PortSide};
use crate::ranks::RankSequence;

#[derive(Debug, Clone, Copy)]
pub(crate) struct RouterBox {
    pub rect: Rect,
}

/// Horizontal slack given to waypoint boxes.
const WAYPOINT_HALF_WIDTH: f64 = 16.0;

pub(crate) fn endpoint_box(rect: Rect, port: Option<Port>) -> RouterBox {
    let rect = match port.and_then(|p| p.side) {
        Some(PortSide::East) => {
            Rect::from_bounds(rect.x, rect.top(), rect.right(), rect.bottom())
        }
        Some(PortSide::West) => Rect::from_bounds(rect.left(), rect.top(), rect.x, rect.bottom()),
        Some(PortSide::North) => Rect::from_bounds(rect.left(), rect.top(), rect.right(), rect.y),
        Some(PortSide::South) => {
            Rect::from_bounds(rect.left(), rect.y, rect.right(), rect.bottom())
        }
        None => rect,
    };
    RouterBox { rect }
}

/// Builds the chain for one edge routed top to bottom through `waypoints`
/// (chain-node centers, possibly empty).
pub(crate) fn build_chain(
    seq: &RankSequence,
    tail: RouterBox,
    head: RouterBox,
    waypoints: &[Point],
) -> Vec<RouterBox> {
    let mut chain: Vec<RouterBox> = Vec::with_capacity(waypoints.len() * 2 + 3);
    chain.push(tail);
    for &p in waypoints {
        let (top, bottom) = band_at(seq, p.y).unwrap_or((p.y - 10.0, p.y + 10.0));
        chain.push(RouterBox {
            rect: Rect::from_bounds(
                p.x - WAYPOINT_HALF_WIDTH,
                top,
                p.x + WAYPOINT_HALF_WIDTH,
                bottom,
            ),
        });
    }
    chain.push(head);

    // Channel boxes bridging every consecutive pair.
    let mut full: Vec<RouterBox> = Vec::with_capacity(chain.len() * 2 - 1);
    for i in 0..chain.len() {
        full.push(chain[i]);
        if i + 1 < chain.len() {
            let a = chain[i].rect;
            let b = chain[i + 1].rect;
            let top = a.bottom().min(b.bottom());
            let bottom = a.top().max(b.top());
            if bottom > top {
                full.push(RouterBox {
                    rect: Rect::from_bounds(
                        a.left().min(b.left()),
                        top,
                        a.right().max(b.right()),
                        bottom,
                    ),
                });
            }
        }
    }
    full
}

/// Vertical band of the rank whose extent contains `y`.
fn band_at(seq: &RankSequence, y: f64) -> Option<(f64, f64)> {
    for rid in seq.iter() {
        let r = seq.get(rid);
        if y >= r.y_top && y <= r.y_bottom {
            return Some((r.y_top, r.y_bottom));
        }
    }
    None
}

/// Anchor points the curve must pass through: one on each shared boundary of
/// consecutive boxes, pulled toward the straight line between the
/// surrounding guide points and clamped into the boundary overlap. A guide
/// segment that would leave the chain is effectively subdivided at the
/// clamped crossing.
pub(crate) fn through_points(chain: &[RouterBox], from: Point, to: Point) -> Vec<Point> {
    let mut pts = vec![from];
    for pair in chain.windows(2) {
        let a = pair[0].rect;
        let b = pair[1].rect;
        // Boundary between a and b: the horizontal line where they meet.
        let y = if b.top() >= a.bottom() - 1e-9 {
            (a.bottom() + b.top()) / 2.0
        } else if a.top() >= b.bottom() - 1e-9 {
            (a.top() + b.bottom()) / 2.0
        } else {
            continue; // vertically overlapping (endpoint/channel pair)
        };
        let lo = a.left().max(b.left());
        let hi = a.right().min(b.right());
        if hi < lo {
            continue;
        }
        let last = *pts.last().expect("seeded with the start point");
        let x = segment_at_y(last, to, y).map(|p| p.x).unwrap_or(last.x);
        pts.push(Point::new(x.clamp(lo, hi), y));
    }
    pts.push(to);
    pts.dedup_by(|a, b| a.distance(*b) < 1e-9);
    pts
}

pub(crate) fn contains(chain: &[RouterBox], p: Point, tol: f64) -> bool {
    chain.iter().any(|b| b.rect.contains_with_tolerance(p, tol))
}
