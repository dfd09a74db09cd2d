//! Edge routing.
//!
//! One strategy per [`RouteMode`], all writing the same output geometry:
//! an ordered point list, optional piecewise cubics, and arrowheads. The
//! box-guided family (line, polyline, spline) shares the chain construction;
//! the orthogonal router works on the visibility grid instead. Per-edge
//! failures degrade to straight segments and never abort the layout.

mod boxes;
mod clip;
mod ortho;
mod self_loops;
mod spline;

pub(crate) use self_loops::expand_margins;

use crate::geom::{Bezier, Point};
use crate::model::{
    Arrow, GraphConfig, LayoutGraph, RouteMode, ShapeRegistry, edge_ends_oriented,
};
use crate::ranks::RankSequence;
use orca_graphlib::EdgeId;
use tracing::debug;

pub fn run(
    g: &mut LayoutGraph,
    seq: &RankSequence,
    cfg: &GraphConfig,
    shapes: &dyn ShapeRegistry,
) {
    match cfg.route_mode {
        RouteMode::Ortho => {
            ortho::run(g, cfg);
            clip_ortho_paths(g);
        }
        RouteMode::Line | RouteMode::Polyline | RouteMode::Spline => {
            let targets: Vec<EdgeId> = g
                .edge_ids()
                .into_iter()
                .filter(|&e| {
                    g.edge(e).is_some_and(|l| {
                        !l.self_loop && l.merged_into.is_none() && l.segment_of.is_none()
                    })
                })
                .collect();
            for e in targets {
                route_boxed(g, seq, cfg, shapes, e);
            }
        }
    }
    self_loops::route(g, cfg);
    attach_arrows(g);
    debug!(mode = ?cfg.route_mode, "routing done");
}

fn route_boxed(
    g: &mut LayoutGraph,
    seq: &RankSequence,
    cfg: &GraphConfig,
    shapes: &dyn ShapeRegistry,
    e: EdgeId,
) {
    let Some((u, w)) = edge_ends_oriented(g, e) else {
        return;
    };
    let (Some(ur), Some(wr)) = (
        g.node(u).and_then(|n| n.rect()),
        g.node(w).and_then(|n| n.rect()),
    ) else {
        return;
    };
    let label = g.edge(e).cloned().unwrap_or_default();
    let (tail_port, head_port) = if label.reversed {
        (label.head_port, label.tail_port)
    } else {
        (label.tail_port, label.head_port)
    };

    let from = Point::new(ur.x + tail_port.map(|p| p.dx).unwrap_or(0.0), ur.y);
    let to = Point::new(wr.x + head_port.map(|p| p.dx).unwrap_or(0.0), wr.y);

    let rank_u = g.node(u).and_then(|n| n.rank);
    if rank_u.is_some() && rank_u == g.node(w).and_then(|n| n.rank) {
        // Same-rank edge: when other nodes sit between the endpoints, a
        // straight segment would cut through them. Dip into the band below
        // the rank instead.
        let adjacent = g
            .node(u)
            .and_then(|n| n.order)
            .zip(g.node(w).and_then(|n| n.order))
            .is_some_and(|(ou, ow)| ou.abs_diff(ow) <= 1);
        if !adjacent && cfg.route_mode != RouteMode::Line {
            let band_y = seq
                .iter()
                .map(|rid| seq.get(rid))
                .find(|r| r.nodes.contains(&u))
                .map(|r| r.y_bottom + r.sep_after / 2.0)
                .unwrap_or_else(|| ur.bottom().max(wr.bottom()) + cfg.ranksep / 2.0);
            let pts = [
                from,
                Point::new(from.x, band_y),
                Point::new(to.x, band_y),
                to,
            ];
            let curve: Vec<Bezier> = match cfg.route_mode {
                RouteMode::Polyline => {
                    pts.windows(2).map(|w| Bezier::line(w[0], w[1])).collect()
                }
                _ => spline::fit(&pts),
            };
            let curve = clip::clip_spline_start(curve, shapes.shape_of(u), ur);
            let curve = clip::clip_spline_end(curve, shapes.shape_of(w), wr);
            let curve = clip::reserve_at_end(curve, cfg.arrow_size);
            if let Some(lbl) = g.edge_mut(e) {
                lbl.points = control_polygon(&curve);
                lbl.splines = curve;
            }
            return;
        }
    }

    let tail = boxes::endpoint_box(ur, tail_port);
    let head = boxes::endpoint_box(wr, head_port);
    // Chain waypoints survived normalization undo as the raw point list.
    let chain = boxes::build_chain(seq, tail, head, &label.points);
    let pts = boxes::through_points(&chain, from, to);

    let curve: Vec<Bezier> = match cfg.route_mode {
        RouteMode::Line => vec![Bezier::line(from, to)],
        RouteMode::Polyline => pts.windows(2).map(|w| Bezier::line(w[0], w[1])).collect(),
        _ => spline::fit_in_chain(&pts, &chain),
    };

    let curve = clip::clip_spline_start(curve, shapes.shape_of(u), ur);
    let curve = clip::clip_spline_end(curve, shapes.shape_of(w), wr);
    let curve = clip::reserve_at_end(curve, cfg.arrow_size);

    if let Some(lbl) = g.edge_mut(e) {
        lbl.points = control_polygon(&curve);
        lbl.splines = curve;
    }
}

/// Flattened control-point list of a piecewise cubic, start point first.
fn control_polygon(curve: &[Bezier]) -> Vec<Point> {
    let mut out = Vec::with_capacity(curve.len() * 3 + 1);
    if let Some(first) = curve.first() {
        out.push(first.p0);
    }
    for seg in curve {
        out.push(seg.p1);
        out.push(seg.p2);
        out.push(seg.p3);
    }
    out
}

fn clip_ortho_paths(g: &mut LayoutGraph) {
    let targets: Vec<EdgeId> = g
        .edge_ids()
        .into_iter()
        .filter(|&e| g.edge(e).is_some_and(|l| !l.self_loop && !l.points.is_empty()))
        .collect();
    for e in targets {
        let Some((u, w)) = g.edge_ends(e) else { continue };
        let (Some(ur), Some(wr)) = (
            g.node(u).and_then(|n| n.rect()),
            g.node(w).and_then(|n| n.rect()),
        ) else {
            continue;
        };
        let pts = g.edge(e).map(|l| l.points.clone()).unwrap_or_default();
        let pts = clip::clip_polyline_start(&pts, &ur);
        let pts = clip::clip_polyline_end(&pts, &wr);
        if let Some(lbl) = g.edge_mut(e) {
            lbl.points = pts;
        }
    }
}

/// One arrowhead at the head end of every routed edge. Degenerate
/// (zero-length) directions drop the arrow rather than emitting garbage.
fn attach_arrows(g: &mut LayoutGraph) {
    for e in g.edge_ids() {
        let Some(lbl) = g.edge(e) else { continue };
        if lbl.merged_into.is_some() || lbl.segment_of.is_some() {
            continue;
        }
        let arrow = if let Some(last) = lbl.splines.last() {
            direction(last.derivative(1.0)).map(|dir| Arrow {
                anchor: last.eval(1.0),
                dir,
            })
        } else if lbl.points.len() >= 2 {
            let a = lbl.points[lbl.points.len() - 2];
            let b = lbl.points[lbl.points.len() - 1];
            direction(Point::new(b.x - a.x, b.y - a.y)).map(|dir| Arrow { anchor: b, dir })
        } else {
            None
        };
        if let Some(lbl) = g.edge_mut(e) {
            lbl.arrows = arrow.into_iter().collect();
        }
    }
}

fn direction(v: Point) -> Option<Point> {
    let len = (v.x * v.x + v.y * v.y).sqrt();
    if len < 1e-9 {
        return None;
    }
    Some(Point::new(v.x / len, v.y / len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeLabel, NodeLabel, RectShapes, new_layout_graph};

    #[test]
    fn spline_route_starts_and_ends_outside_the_nodes() {
        let mut g = new_layout_graph();
        let mut na = NodeLabel::named("a", 40.0, 20.0);
        na.x = Some(0.0);
        na.y = Some(0.0);
        na.rank = Some(0);
        let mut nb = NodeLabel::named("b", 40.0, 20.0);
        nb.x = Some(10.0);
        nb.y = Some(100.0);
        nb.rank = Some(1);
        let a = g.add_node(na);
        let b = g.add_node(nb);
        let e = g.add_edge(a, b, EdgeLabel::default());

        let cfg = GraphConfig::default();
        let seq = RankSequence::from_graph(&g, cfg.ranksep);
        run(&mut g, &seq, &cfg, &RectShapes);

        let lbl = g.edge(e).unwrap();
        assert!(!lbl.splines.is_empty());
        let start = lbl.splines.first().unwrap().eval(0.0);
        let end = lbl.splines.last().unwrap().eval(1.0);
        let ra = g.node(a).unwrap().rect().unwrap();
        let rb = g.node(b).unwrap().rect().unwrap();
        assert!(!ra.contains_with_tolerance(start, -1e-6));
        assert!(!rb.contains_with_tolerance(end, -1e-6));
        assert_eq!(lbl.arrows.len(), 1);
        assert!(lbl.arrows[0].dir.y > 0.0, "arrow points down the edge");
    }

    #[test]
    fn non_adjacent_flat_edge_detours_around_the_rank() {
        let mut g = new_layout_graph();
        let mut placed = |name: &str, x: f64, order: usize| {
            let mut n = NodeLabel::named(name, 40.0, 20.0);
            n.x = Some(x);
            n.y = Some(0.0);
            n.rank = Some(0);
            n.order = Some(order);
            g.add_node(n)
        };
        let a = placed("a", 0.0, 0);
        let b = placed("b", 100.0, 1);
        let c = placed("c", 200.0, 2);
        let e = g.add_edge(a, c, EdgeLabel::default());

        let cfg = GraphConfig::default();
        let seq = RankSequence::from_graph(&g, cfg.ranksep);
        run(&mut g, &seq, &cfg, &RectShapes);

        let lbl = g.edge(e).unwrap();
        assert!(!lbl.splines.is_empty());
        let rb = g.node(b).unwrap().rect().unwrap();
        let mut max_y: f64 = f64::MIN;
        for seg in &lbl.splines {
            for i in 0..=16 {
                let p = seg.eval(i as f64 / 16.0);
                assert!(
                    !rb.contains_with_tolerance(p, -1e-6),
                    "path cuts through the node between the endpoints at {p:?}"
                );
                max_y = max_y.max(p.y);
            }
        }
        assert!(max_y > rb.bottom(), "path must dip below the rank");
    }
}
