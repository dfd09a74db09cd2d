//! Layout pipeline.
//!
//! Hosts the public entrypoints and the output fixups (parallel-edge
//! un-merge, translation to the origin) so `lib.rs` stays a list of
//! exports. One call runs every stage to completion on one graph; budgets
//! are iteration counts, never timeouts.

use crate::error::{Error, Result};
use crate::geom::{Point, Rect};
use crate::model::{GraphConfig, LayoutGraph, RectShapes, ShapeRegistry, is_cluster};
use crate::{acyclic, normalize, order, position, rank, route};
use orca_graphlib::EdgeId;
use tracing::debug;

/// Lays out `g` in place with rectangular node shapes.
pub fn layout(g: &mut LayoutGraph, cfg: &GraphConfig) -> Result<()> {
    layout_with_shapes(g, cfg, &RectShapes)
}

pub fn layout_with_shapes(
    g: &mut LayoutGraph,
    cfg: &GraphConfig,
    shapes: &dyn ShapeRegistry,
) -> Result<()> {
    validate(g)?;

    acyclic::run(g);
    normalize::merge_parallel_edges(g);
    rank::rank(g, cfg)?;
    let mut seq = normalize::run(g, cfg);
    order::run(g, &mut seq, cfg);
    route::expand_margins(g, cfg);
    position::run(g, &mut seq, cfg)?;
    normalize::undo(g);
    route::run(g, &seq, cfg, shapes);
    acyclic::undo(g);
    unmerge_parallel(g, cfg);
    translate_to_origin(g);

    debug!(
        nodes = g.node_count(),
        edges = g.edge_count(),
        ranks = seq.len(),
        "layout complete"
    );
    Ok(())
}

/// Fatal input checks. Everything that can degrade per-edge is handled
/// downstream instead.
fn validate(g: &LayoutGraph) -> Result<()> {
    if g.node_count() == 0 {
        return Err(Error::EmptyGraph);
    }
    for e in g.edge_ids() {
        let Some((u, w)) = g.edge_ends(e) else {
            return Err(Error::DanglingEdge {
                edge: e.to_string(),
            });
        };
        let Some(lbl) = g.edge(e) else { continue };
        for (port, v, side) in [(lbl.tail_port, u, "tail"), (lbl.head_port, w, "head")] {
            let Some(port) = port else { continue };
            let half = g.node(v).map(|n| n.width / 2.0).unwrap_or(0.0);
            if port.dx.abs() > half {
                return Err(Error::MalformedPort {
                    edge: e.to_string(),
                    message: format!(
                        "{side} port offset {} exceeds the node half-width {half}",
                        port.dx
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Gives every edge merged into a carrier its own copy of the carrier's
/// geometry, fanned out sideways so parallels stay distinguishable.
fn unmerge_parallel(g: &mut LayoutGraph, cfg: &GraphConfig) {
    let carriers: Vec<EdgeId> = g
        .edge_ids()
        .into_iter()
        .filter(|&e| g.edge(e).is_some_and(|l| !l.parallel.is_empty()))
        .collect();
    for c in carriers {
        let Some(carrier) = g.edge(c).cloned() else {
            continue;
        };
        let carrier_source = g.source(c);
        for (i, &e) in carrier.parallel.iter().enumerate() {
            let offset = (i + 1) as f64 * cfg.edgesep;
            let mut points = carrier.points.clone();
            let mut splines = carrier.splines.clone();
            // Interior points shift; endpoints stay on the nodes.
            for p in points.iter_mut().skip(1).rev().skip(1) {
                p.x += offset;
            }
            for (si, s) in splines.iter_mut().enumerate() {
                if si > 0 {
                    s.p0.x += offset;
                }
                s.p1.x += offset;
                s.p2.x += offset;
                if si + 1 < carrier.splines.len() {
                    s.p3.x += offset;
                }
            }
            let flipped = g.source(e) != carrier_source;
            if let Some(lbl) = g.edge_mut(e) {
                if flipped {
                    points.reverse();
                    splines.reverse();
                    for s in splines.iter_mut() {
                        std::mem::swap(&mut s.p0, &mut s.p3);
                        std::mem::swap(&mut s.p1, &mut s.p2);
                    }
                }
                lbl.points = points;
                lbl.splines = splines;
                lbl.arrows = carrier.arrows.clone();
                lbl.merged_into = None;
            }
        }
        if let Some(lbl) = g.edge_mut(c) {
            lbl.parallel.clear();
        }
    }
}

/// Shifts the whole drawing so its bounding box starts at (0, 0).
fn translate_to_origin(g: &mut LayoutGraph) {
    let mut bounds: Option<Rect> = None;
    let mut extend = |r: Rect| {
        bounds = Some(match bounds {
            Some(b) => b.union(&r),
            None => r,
        });
    };
    for v in g.node_ids() {
        let Some(n) = g.node(v) else { continue };
        if let Some(b) = n.bounds {
            extend(b);
        } else if let Some(r) = n.rect() {
            extend(r);
        }
    }
    for e in g.edge_ids() {
        let Some(lbl) = g.edge(e) else { continue };
        for p in &lbl.points {
            extend(Rect::new(p.x, p.y, 0.0, 0.0));
        }
    }
    let Some(bounds) = bounds else { return };
    let (dx, dy) = (-bounds.left(), -bounds.top());
    if dx == 0.0 && dy == 0.0 {
        return;
    }

    let shift = |p: &mut Point| {
        p.x += dx;
        p.y += dy;
    };
    for v in g.node_ids() {
        let Some(n) = g.node_mut(v) else { continue };
        if let Some(x) = n.x.as_mut() {
            *x += dx;
        }
        if let Some(y) = n.y.as_mut() {
            *y += dy;
        }
        if let Some(b) = n.bounds.as_mut() {
            b.x += dx;
            b.y += dy;
        }
    }
    for e in g.edge_ids() {
        let Some(lbl) = g.edge_mut(e) else { continue };
        for p in lbl.points.iter_mut() {
            shift(p);
        }
        for s in lbl.splines.iter_mut() {
            shift(&mut s.p0);
            shift(&mut s.p1);
            shift(&mut s.p2);
            shift(&mut s.p3);
        }
        if let Some(p) = lbl.label_pos.as_mut() {
            shift(p);
        }
        for a in lbl.arrows.iter_mut() {
            shift(&mut a.anchor);
        }
    }
}

/// Total extent of the finished drawing (nodes, clusters and edge geometry).
pub fn drawing_bounds(g: &LayoutGraph) -> Option<Rect> {
    let mut bounds: Option<Rect> = None;
    let mut extend = |r: Rect| {
        bounds = Some(match bounds {
            Some(b) => b.union(&r),
            None => r,
        });
    };
    for v in g.node_ids() {
        let r = match g.node(v) {
            Some(n) if is_cluster(g, v) => n.bounds,
            Some(n) => n.rect(),
            None => None,
        };
        if let Some(r) = r {
            extend(r);
        }
    }
    for e in g.edge_ids() {
        let Some(lbl) = g.edge(e) else { continue };
        for p in &lbl.points {
            extend(Rect::new(p.x, p.y, 0.0, 0.0));
        }
        for s in &lbl.splines {
            for p in [s.p0, s.p1, s.p2, s.p3] {
                extend(Rect::new(p.x, p.y, 0.0, 0.0));
            }
        }
    }
    bounds
}
