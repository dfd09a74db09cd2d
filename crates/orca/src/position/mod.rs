//! Coordinate assignment.
//!
//! X comes from a second network-simplex run over an auxiliary graph whose
//! "ranks" are pixel positions: a weighted 3-node star per cross-rank edge
//! pulls endpoints together, zero-weight chains along each rank keep
//! neighbors separated, and cluster border columns carry the margins. Y is
//! direct accumulation of rank heights.

mod borders;

use crate::error::Result;
use crate::geom::Rect;
use crate::model::{
    DummyKind, GraphConfig, LayoutGraph, active_edges, clusters_postorder, edge_ends_oriented,
};
use crate::rank::{SimplexEdge, solve};
use crate::ranks::RankSequence;
use orca_graphlib::NodeId;
use rustc_hash::FxHashMap;
use tracing::debug;

pub fn run(g: &mut LayoutGraph, seq: &mut RankSequence, cfg: &GraphConfig) -> Result<()> {
    borders::insert_border_nodes(g, seq);
    assign_x(g, seq, cfg)?;
    assign_y(g, seq, cfg);
    cluster_bounds(g, cfg);
    borders::remove_border_nodes(g, seq);
    Ok(())
}

/// Bend penalty for an edge by endpoint kind: bends through virtual chain
/// nodes cost more, so long edges come out straight.
fn omega(g: &LayoutGraph, u: NodeId, w: NodeId) -> f64 {
    let vu = g.node(u).is_some_and(|n| n.is_virtual());
    let vw = g.node(w).is_some_and(|n| n.is_virtual());
    match (vu, vw) {
        (true, true) => 8.0,
        (false, false) => 1.0,
        _ => 2.0,
    }
}

fn assign_x(g: &mut LayoutGraph, seq: &RankSequence, cfg: &GraphConfig) -> Result<()> {
    let mut idx: FxHashMap<NodeId, usize> = FxHashMap::default();
    for rid in seq.iter() {
        for &v in &seq.get(rid).nodes {
            let next = idx.len();
            idx.insert(v, next);
        }
    }
    let mut count = idx.len();
    if count == 0 {
        return Ok(());
    }
    let mut edges: Vec<SimplexEdge> = Vec::new();

    // Pull stars per cross-rank edge, plus one-sided port limits.
    for e in active_edges(g) {
        let Some((u, w)) = edge_ends_oriented(g, e) else {
            continue;
        };
        let (Some(ru), Some(rw)) = (
            g.node(u).and_then(|n| n.rank),
            g.node(w).and_then(|n| n.rank),
        ) else {
            continue;
        };
        if (rw - ru).abs() != 1 {
            continue;
        }
        let (Some(&iu), Some(&iw)) = (idx.get(&u), idx.get(&w)) else {
            continue;
        };
        let label = g.edge(e).cloned().unwrap_or_default();
        let weight = label.effective_weight(g) * omega(g, u, w);

        let aux = count;
        count += 1;
        edges.push(SimplexEdge::new(aux, iu, weight, 0));
        edges.push(SimplexEdge::new(aux, iw, weight, 0));

        let (top, bot) = if label.reversed {
            (label.head_port, label.tail_port)
        } else {
            (label.tail_port, label.head_port)
        };
        let top_dx = top.map(|p| p.dx).unwrap_or(0.0);
        let bot_dx = bot.map(|p| p.dx).unwrap_or(0.0);
        let d = top_dx - bot_dx;
        if d > 0.5 {
            edges.push(SimplexEdge::new(iu, iw, 0.0, d.round() as i32));
        } else if d < -0.5 {
            edges.push(SimplexEdge::new(iw, iu, 0.0, (-d).round() as i32));
        }
    }

    // Flat edges with a fixed minlen widen the gap between their endpoints;
    // `live_limit` edges instead track the pair separation, which already
    // follows the endpoints' current widths.
    let mut flat_limit: FxHashMap<(NodeId, NodeId), f64> = FxHashMap::default();
    for e in active_edges(g) {
        let Some((u, w)) = g.edge_ends(e) else { continue };
        let same_rank = g.node(u).and_then(|n| n.rank) == g.node(w).and_then(|n| n.rank);
        let Some(lbl) = g.edge(e) else { continue };
        if same_rank && !lbl.live_limit && lbl.minlen > 1 {
            let key = if u < w { (u, w) } else { (w, u) };
            let px = lbl.minlen as f64;
            let slot = flat_limit.entry(key).or_insert(px);
            *slot = slot.max(px);
        }
    }

    // Separation chains along each rank.
    for rid in seq.iter() {
        let nodes = &seq.get(rid).nodes;
        for pair in nodes.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let mut sep = pair_sep(g, cfg, a, b);
            let key = if a < b { (a, b) } else { (b, a) };
            if let Some(&px) = flat_limit.get(&key) {
                sep = sep.max(px);
            }
            edges.push(SimplexEdge::new(idx[&a], idx[&b], 0.0, sep.ceil() as i32));
        }
    }

    // Keep each border column straight: heavy stars between consecutive
    // cells, same shape as a virtual-virtual edge.
    for c in clusters_postorder(g) {
        let Some(n) = g.node(c) else { continue };
        for col in [n.border_left.clone(), n.border_right.clone()] {
            for pair in col.windows(2) {
                let (Some(&ia), Some(&ib)) = (idx.get(&pair[0]), idx.get(&pair[1])) else {
                    continue;
                };
                let aux = count;
                count += 1;
                edges.push(SimplexEdge::new(aux, ia, 8.0, 0));
                edges.push(SimplexEdge::new(aux, ib, 8.0, 0));
            }
        }
    }

    let nslimit = cfg.nslimit.unwrap_or(4 * count);
    let xs = solve(count, &edges, nslimit)?;
    for (v, i) in idx {
        if let Some(n) = g.node_mut(v) {
            n.x = Some(xs[i] as f64);
        }
    }
    balance(g, seq, cfg);
    debug!(aux_nodes = count, aux_edges = edges.len(), "x assignment done");
    Ok(())
}

/// Centers each node on the weighted mean of its adjacent-rank neighbors
/// within the slack its rank row allows. The simplex solution is optimal but
/// not unique; this picks the symmetric representative, so a node below two
/// siblings lands at their midpoint.
fn balance(g: &mut LayoutGraph, seq: &RankSequence, cfg: &GraphConfig) {
    for _ in 0..2 {
        for rid in seq.iter().collect::<Vec<_>>() {
            let nodes = seq.get(rid).nodes.clone();
            for (i, &v) in nodes.iter().enumerate() {
                let mut sum = 0.0;
                let mut total = 0.0;
                for e in g.node_edges(v) {
                    if !g.edge(e).is_some_and(|l| l.is_active()) {
                        continue;
                    }
                    let Some((a, b)) = edge_ends_oriented(g, e) else {
                        continue;
                    };
                    let other = if a == v { b } else { a };
                    let (Some(rv), Some(ro)) = (
                        g.node(v).and_then(|n| n.rank),
                        g.node(other).and_then(|n| n.rank),
                    ) else {
                        continue;
                    };
                    if (rv - ro).abs() != 1 {
                        continue;
                    }
                    let Some(x) = g.node(other).and_then(|n| n.x) else {
                        continue;
                    };
                    let w = g.edge(e).map(|l| l.effective_weight(g)).unwrap_or(1.0)
                        * omega(g, a, b);
                    sum += x * w;
                    total += w;
                }
                if total == 0.0 {
                    continue;
                }
                let mut desired = sum / total;
                if i > 0 {
                    let left = nodes[i - 1];
                    if let Some(xl) = g.node(left).and_then(|n| n.x) {
                        desired = desired.max(xl + pair_sep(g, cfg, left, v));
                    }
                }
                if i + 1 < nodes.len() {
                    let right = nodes[i + 1];
                    if let Some(xr) = g.node(right).and_then(|n| n.x) {
                        desired = desired.min(xr - pair_sep(g, cfg, v, right));
                    }
                }
                if let Some(n) = g.node_mut(v) {
                    n.x = Some(desired);
                }
            }
        }
    }
}

/// Minimum center-to-center gap between horizontal neighbors `a` then `b`.
fn pair_sep(g: &LayoutGraph, cfg: &GraphConfig, a: NodeId, b: NodeId) -> f64 {
    let (Some(na), Some(nb)) = (g.node(a), g.node(b)) else {
        return cfg.nodesep;
    };
    let mut gap = if na.is_virtual() || nb.is_virtual() {
        cfg.edgesep
    } else {
        cfg.nodesep
    };
    gap += na.margin + nb.margin;
    for n in [na, nb] {
        if matches!(
            n.dummy,
            Some(DummyKind::BorderLeft) | Some(DummyKind::BorderRight)
        ) {
            gap += cfg.cluster_margin;
        }
    }
    na.half_width_right() + nb.half_width_left() + gap
}

fn assign_y(g: &mut LayoutGraph, seq: &mut RankSequence, cfg: &GraphConfig) {
    // Space reserved above a cluster's first rank (label + margin) and below
    // its last (margin).
    let mut extra_top: FxHashMap<i32, f64> = FxHashMap::default();
    let mut extra_bottom: FxHashMap<i32, f64> = FxHashMap::default();
    for c in clusters_postorder(g) {
        let Some(n) = g.node(c) else { continue };
        let (Some(lo), Some(hi)) = (n.min_rank, n.max_rank) else {
            continue;
        };
        let label_h = n.label_size.map(|l| l.height).unwrap_or(0.0);
        let top = cfg.cluster_margin + label_h;
        let bot = cfg.cluster_margin;
        let t = extra_top.entry(lo).or_insert(0.0);
        *t = t.max(top);
        let b = extra_bottom.entry(hi).or_insert(0.0);
        *b = b.max(bot);
    }

    let mut cursor = 0.0;
    let rank_ids: Vec<_> = seq.iter().collect();
    for (value, rid) in rank_ids.into_iter().enumerate() {
        let value = value as i32;
        let nodes = seq.get(rid).nodes.clone();
        let mut above: f64 = 0.0;
        let mut below: f64 = 0.0;
        for &v in &nodes {
            if let Some(n) = g.node(v) {
                above = above.max(n.height / 2.0 + n.self_margins.top);
                below = below.max(n.height / 2.0 + n.self_margins.bottom);
            }
        }
        let top_pad = extra_top.get(&value).copied().unwrap_or(0.0);
        let bot_pad = extra_bottom.get(&value).copied().unwrap_or(0.0);

        let center = cursor + top_pad + above;
        for &v in &nodes {
            if let Some(n) = g.node_mut(v) {
                n.y = Some(center);
            }
        }
        let rank = seq.get_mut(rid);
        rank.y_top = cursor;
        rank.y_bottom = center + below + bot_pad;
        cursor = rank.y_bottom + rank.sep_after;
    }
}

/// Bounding border per cluster, innermost first so outer unions see the
/// inner bounds.
fn cluster_bounds(g: &mut LayoutGraph, cfg: &GraphConfig) {
    for c in clusters_postorder(g) {
        let mut acc: Option<Rect> = None;
        for &child in &g.children(c).to_vec() {
            let r = g.node(child).and_then(|n| n.bounds.or_else(|| n.rect()));
            if let Some(r) = r {
                acc = Some(match acc {
                    Some(a) => a.union(&r),
                    None => r,
                });
            }
        }
        let Some(mut bounds) = acc else { continue };
        bounds = bounds.expand(cfg.cluster_margin);
        let label_h = g.node(c).and_then(|n| n.label_size).map(|l| l.height);
        if let Some(h) = label_h {
            bounds = Rect::from_bounds(
                bounds.left(),
                bounds.top() - h,
                bounds.right(),
                bounds.bottom(),
            );
        }
        if let Some(n) = g.node_mut(c) {
            n.bounds = Some(bounds);
            n.x = Some(bounds.x);
            n.y = Some(bounds.y);
            n.width = bounds.width;
            n.height = bounds.height;
        }
    }
}
