//! Rank normalization.
//!
//! Three order-sensitive steps: cut multi-rank edges into virtual-node
//! chains, splice in label ranks for one-rank labelled edges (and flat-label
//! carriers), then compact rank numbering. Afterwards every edge either
//! connects adjacent ranks or is flat.

use crate::geom::Point;
use crate::model::{
    DummyKind, EdgeLabel, GraphConfig, LayoutGraph, NodeLabel, edge_ends_oriented,
};
use crate::ranks::{RankId, RankSequence};
use orca_graphlib::{EdgeId, NodeId};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Collapses parallel edges between the same oriented endpoint pair into one
/// carrier edge; the carrier aggregates weight (sum) and minlen (max) through
/// `EdgeLabel::effective_*`. Runs before ranking so the aggregate constrains
/// rank assignment.
pub fn merge_parallel_edges(g: &mut LayoutGraph) {
    let mut carrier: FxHashMap<(NodeId, NodeId), EdgeId> = FxHashMap::default();
    let mut merges: Vec<(EdgeId, EdgeId)> = Vec::new();
    for e in crate::model::active_edges(g) {
        let Some(ends) = edge_ends_oriented(g, e) else {
            continue;
        };
        match carrier.get(&ends) {
            Some(&c) => merges.push((e, c)),
            None => {
                carrier.insert(ends, e);
            }
        }
    }
    for (e, c) in merges {
        if let Some(lbl) = g.edge_mut(e) {
            lbl.merged_into = Some(c);
        }
        if let Some(lbl) = g.edge_mut(c) {
            lbl.parallel.push(e);
        }
    }
}

pub fn run(g: &mut LayoutGraph, cfg: &GraphConfig) -> RankSequence {
    let mut seq = RankSequence::from_graph(g, cfg.ranksep);

    // Slot per original rank value, captured before any splicing.
    let mut slot_of: FxHashMap<i32, RankId> = FxHashMap::default();
    for id in seq.iter().collect::<Vec<_>>() {
        if let Some(value) = seq
            .get(id)
            .nodes
            .first()
            .and_then(|&v| g.node(v))
            .and_then(|n| n.rank)
        {
            slot_of.insert(value, id);
        }
    }

    // Rank values may be sparse (minlen > 1 leaves gaps); chain nodes need a
    // slot for every intermediate value.
    let mut values: Vec<i32> = slot_of.keys().copied().collect();
    values.sort_unstable();
    for win in values.windows(2) {
        let (lo, hi) = (win[0], win[1]);
        let mut after = slot_of[&lo];
        for v in (lo + 1)..hi {
            let id = seq.insert_after(after, false);
            slot_of.insert(v, id);
            after = id;
        }
    }

    cut_long_edges(g, &mut seq, &slot_of);
    insert_label_ranks(g, &mut seq, &slot_of);
    place_flat_labels(g, &mut seq, &slot_of);

    seq.compact(g);
    debug!(ranks = seq.len(), "normalized ranks");
    seq
}

fn add_virtual(
    g: &mut LayoutGraph,
    kind: DummyKind,
    edge: EdgeId,
    rank: Option<i32>,
    container: Option<NodeId>,
) -> NodeId {
    let v = g.add_node(NodeLabel {
        rank,
        dummy: Some(kind),
        edge: Some(edge),
        ..Default::default()
    });
    if let Some(c) = container {
        g.set_parent(v, c);
    }
    v
}

/// Container for a chain node: the innermost cluster containing both
/// endpoints, so virtual nodes never leak outside the clusters the edge
/// stays within.
fn common_container(g: &LayoutGraph, u: NodeId, w: NodeId) -> Option<NodeId> {
    let u_chain = g.ancestors(u);
    let w_chain: Vec<NodeId> = g.ancestors(w);
    u_chain.into_iter().find(|a| w_chain.contains(a))
}

fn segment(g: &mut LayoutGraph, of: EdgeId, v: NodeId, w: NodeId, weight: f64) -> EdgeId {
    g.add_edge(
        v,
        w,
        EdgeLabel {
            weight,
            minlen: 1,
            segment_of: Some(of),
            ..Default::default()
        },
    )
}

fn cut_long_edges(g: &mut LayoutGraph, seq: &mut RankSequence, slot_of: &FxHashMap<i32, RankId>) {
    for e in crate::model::active_edges(g) {
        let Some((u, w)) = edge_ends_oriented(g, e) else {
            continue;
        };
        let (Some(ru), Some(rw)) = (
            g.node(u).and_then(|n| n.rank),
            g.node(w).and_then(|n| n.rank),
        ) else {
            continue;
        };
        if rw - ru <= 1 {
            continue;
        }

        let label = g.edge(e).cloned().expect("active edge has a label");
        let weight = label.effective_weight(g);
        let label_rank = label.label.map(|_| (ru + rw) / 2);
        let container = common_container(g, u, w);

        let mut chain: Vec<NodeId> = Vec::new();
        let mut prev = u;
        for r in (ru + 1)..rw {
            let kind = if label_rank == Some(r) {
                DummyKind::EdgeLabel
            } else {
                DummyKind::Edge
            };
            let d = add_virtual(g, kind, e, Some(r), container);
            if kind == DummyKind::EdgeLabel {
                if let (Some(size), Some(n)) = (label.label, g.node_mut(d)) {
                    n.width = size.width;
                    n.height = size.height;
                }
            }
            if let Some(&slot) = slot_of.get(&r) {
                seq.get_mut(slot).nodes.push(d);
            }
            segment(g, e, prev, d, weight);
            prev = d;
            chain.push(d);
        }
        segment(g, e, prev, w, weight);

        if let Some(lbl) = g.edge_mut(e) {
            lbl.chained = true;
            lbl.chain = chain;
        }
    }
}

/// Edges with a label spanning exactly one rank get a brand-new rank spliced
/// between their endpoints; every other edge crossing that gap is re-cut
/// through the new rank so the adjacency invariant holds.
fn insert_label_ranks(
    g: &mut LayoutGraph,
    seq: &mut RankSequence,
    slot_of: &FxHashMap<i32, RankId>,
) {
    // Group label insertions per gap (tail rank value).
    let mut by_gap: FxHashMap<i32, Vec<EdgeId>> = FxHashMap::default();
    for e in crate::model::active_edges(g) {
        let Some(lbl) = g.edge(e) else { continue };
        if lbl.label.is_none() || lbl.segment_of.is_some() {
            continue;
        }
        let Some((u, w)) = edge_ends_oriented(g, e) else {
            continue;
        };
        let (Some(ru), Some(rw)) = (
            g.node(u).and_then(|n| n.rank),
            g.node(w).and_then(|n| n.rank),
        ) else {
            continue;
        };
        if rw - ru == 1 {
            by_gap.entry(ru).or_default().push(e);
        }
    }

    let mut gaps: Vec<i32> = by_gap.keys().copied().collect();
    gaps.sort_unstable();

    for gap in gaps {
        let Some(&above) = slot_of.get(&gap) else {
            continue;
        };
        let new_rank = seq.insert_after(above, true);

        // Re-cut everything else crossing this gap first.
        for e in crate::model::active_edges(g) {
            let Some((u, w)) = edge_ends_oriented(g, e) else {
                continue;
            };
            let (Some(ru), Some(rw)) = (
                g.node(u).and_then(|n| n.rank),
                g.node(w).and_then(|n| n.rank),
            ) else {
                continue;
            };
            if ru != gap || rw != gap + 1 || by_gap[&gap].contains(&e) {
                continue;
            }
            let owner = g.edge(e).and_then(|l| l.segment_of).unwrap_or(e);
            let weight = g.edge(e).map(|l| l.weight).unwrap_or(1.0);
            let container = common_container(g, u, w);
            let d = add_virtual(g, DummyKind::Edge, owner, None, container);
            seq.get_mut(new_rank).nodes.push(d);
            reroute_through(g, e, owner, u, d, w, weight);
            if let Some(lbl) = g.edge_mut(owner) {
                // Keep the chain ordered top to bottom.
                match lbl.chain.iter().position(|&c| c == w) {
                    Some(pos) => lbl.chain.insert(pos, d),
                    None => lbl.chain.push(d),
                }
            }
        }

        for &e in &by_gap[&gap] {
            let Some((u, w)) = edge_ends_oriented(g, e) else {
                continue;
            };
            let label = g.edge(e).cloned().expect("labelled edge has a label");
            let container = common_container(g, u, w);
            let d = add_virtual(g, DummyKind::EdgeLabel, e, None, container);
            if let (Some(size), Some(n)) = (label.label, g.node_mut(d)) {
                n.width = size.width;
                n.height = size.height;
            }
            seq.get_mut(new_rank).nodes.push(d);
            let weight = label.effective_weight(g);
            segment(g, e, u, d, weight);
            segment(g, e, d, w, weight);
            if let Some(lbl) = g.edge_mut(e) {
                lbl.chained = true;
                lbl.chain = vec![d];
            }
        }
    }
}

/// Replaces one adjacent segment `from -> to` of `owner` with two segments
/// through `mid`.
fn reroute_through(
    g: &mut LayoutGraph,
    seg: EdgeId,
    owner: EdgeId,
    from: NodeId,
    mid: NodeId,
    to: NodeId,
    weight: f64,
) {
    if g.edge(seg).is_some_and(|l| l.segment_of.is_some()) {
        g.remove_edge(seg);
    } else if let Some(lbl) = g.edge_mut(seg) {
        // A direct edge becomes a chained edge with a one-node chain; the
        // caller records `mid` in the chain.
        lbl.chained = true;
    }
    segment(g, owner, from, mid, weight);
    segment(g, owner, mid, to, weight);
}

/// Flat (same-rank) labelled edges: merge per endpoint pair, then park one
/// label carrier per merged edge below the endpoints' rank — reusing the next
/// rank when only virtual nodes live there, splicing a new rank otherwise.
fn place_flat_labels(
    g: &mut LayoutGraph,
    seq: &mut RankSequence,
    slot_of: &FxHashMap<i32, RankId>,
) {
    let mut seen: FxHashMap<(NodeId, NodeId), EdgeId> = FxHashMap::default();
    let mut labelled: Vec<(EdgeId, NodeId, NodeId, i32)> = Vec::new();

    for e in crate::model::active_edges(g) {
        let Some(lbl) = g.edge(e) else { continue };
        if lbl.segment_of.is_some() {
            continue;
        }
        let Some((u, w)) = edge_ends_oriented(g, e) else {
            continue;
        };
        let (Some(ru), Some(rw)) = (
            g.node(u).and_then(|n| n.rank),
            g.node(w).and_then(|n| n.rank),
        ) else {
            continue;
        };
        if ru != rw {
            continue;
        }
        let key = if u < w { (u, w) } else { (w, u) };
        match seen.get(&key) {
            Some(&c) => {
                // Merge duplicate flat edges into the first carrier.
                if let Some(lbl) = g.edge_mut(e) {
                    lbl.merged_into = Some(c);
                }
                if let Some(lbl) = g.edge_mut(c) {
                    lbl.parallel.push(e);
                }
            }
            None => {
                seen.insert(key, e);
                if g.edge(e).is_some_and(|l| l.label.is_some()) {
                    labelled.push((e, u, w, ru));
                }
            }
        }
    }

    let mut label_rank_for: FxHashMap<i32, RankId> = FxHashMap::default();
    for (e, u, w, r) in labelled {
        let slot = match label_rank_for.get(&r) {
            Some(&s) => s,
            None => {
                let Some(&here) = slot_of.get(&r) else {
                    continue;
                };
                let next_is_virtual = seq.next(here).is_some_and(|n| {
                    !seq.get(n).nodes.is_empty()
                        && seq
                            .get(n)
                            .nodes
                            .iter()
                            .all(|&v| g.node(v).is_some_and(|n| n.is_virtual()))
                });
                let s = if next_is_virtual {
                    seq.next(here).expect("checked above")
                } else {
                    seq.insert_after(here, true)
                };
                label_rank_for.insert(r, s);
                s
            }
        };

        let size = g.edge(e).and_then(|l| l.label).unwrap_or_default();
        let container = common_container(g, u, w);
        let d = add_virtual(g, DummyKind::FlatLabel, e, None, container);
        if let Some(n) = g.node_mut(d) {
            n.width = size.width;
            n.height = size.height;
        }
        seq.get_mut(slot).nodes.push(d);
        // Weak pulls keep the label under its endpoints without bending
        // anything real.
        segment(g, e, u, d, 1.0);
        segment(g, e, w, d, 1.0);
        if let Some(lbl) = g.edge_mut(e) {
            lbl.chain = vec![d];
            // The endpoint gap now depends on the carrier and the endpoints'
            // widths, not on the caller's minlen.
            lbl.live_limit = true;
        }
    }
}

/// Folds chains back into their owner edges: point lists for edges the
/// routers left as polylines, label centers from the label carriers, then
/// removes every virtual node and synthetic segment.
pub fn undo(g: &mut LayoutGraph) {
    let mut owners: Vec<EdgeId> = Vec::new();
    for e in g.edge_ids() {
        let Some(lbl) = g.edge(e) else { continue };
        if !lbl.chain.is_empty() {
            owners.push(e);
        }
    }

    for e in owners {
        let chain = g.edge(e).map(|l| l.chain.clone()).unwrap_or_default();
        let had_points = g.edge(e).is_some_and(|l| !l.points.is_empty());
        let mut label_pos: Option<Point> = None;
        let mut chain_points: Vec<Point> = Vec::new();

        for &d in &chain {
            let Some(n) = g.node(d) else { continue };
            if let (Some(x), Some(y)) = (n.x, n.y) {
                chain_points.push(Point::new(x, y));
                if matches!(
                    n.dummy,
                    Some(DummyKind::EdgeLabel) | Some(DummyKind::FlatLabel)
                ) {
                    label_pos = Some(Point::new(x, y));
                }
            }
        }

        if let Some(lbl) = g.edge_mut(e) {
            if !had_points {
                lbl.points = chain_points;
            }
            if lbl.label_pos.is_none() {
                lbl.label_pos = label_pos;
            }
            lbl.chained = false;
            lbl.chain.clear();
        }
        for d in chain {
            g.remove_node(d);
        }
    }

    // Any stray synthetic segments (their chain nodes are gone already).
    for e in g.edge_ids() {
        if g.edge(e).is_some_and(|l| l.segment_of.is_some()) {
            g.remove_edge(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GraphConfig, LabelSize, new_layout_graph};

    fn ranked_node(g: &mut LayoutGraph, name: &str, rank: i32) -> NodeId {
        let mut n = NodeLabel::named(name, 20.0, 20.0);
        n.rank = Some(rank);
        g.add_node(n)
    }

    #[test]
    fn long_edge_becomes_adjacent_chain() {
        let mut g = new_layout_graph();
        let a = ranked_node(&mut g, "a", 0);
        let b = ranked_node(&mut g, "b", 3);
        let e = g.add_edge(a, b, EdgeLabel::default());

        let _seq = run(&mut g, &GraphConfig::default());

        assert!(g.edge(e).unwrap().chained);
        assert_eq!(g.edge(e).unwrap().chain.len(), 2);
        for seg in crate::model::active_edges(&g) {
            let (u, w) = g.edge_ends(seg).unwrap();
            let ru = g.node(u).unwrap().rank.unwrap();
            let rw = g.node(w).unwrap().rank.unwrap();
            assert_eq!(rw - ru, 1, "segment must connect adjacent ranks");
        }
    }

    #[test]
    fn one_rank_label_gets_its_own_rank() {
        let mut g = new_layout_graph();
        let a = ranked_node(&mut g, "a", 0);
        let b = ranked_node(&mut g, "b", 1);
        let c = ranked_node(&mut g, "c", 0);
        let d = ranked_node(&mut g, "d", 1);
        let labelled = g.add_edge(
            a,
            b,
            EdgeLabel {
                label: Some(LabelSize {
                    width: 30.0,
                    height: 12.0,
                }),
                ..Default::default()
            },
        );
        let plain = g.add_edge(c, d, EdgeLabel::default());

        let _seq = run(&mut g, &GraphConfig::default());

        // Both edges now cross an intermediate label rank.
        assert!(g.edge(labelled).unwrap().chained);
        assert!(g.edge(plain).unwrap().chained);
        assert_eq!(g.node(b).unwrap().rank, Some(2));
        let mid = g.edge(labelled).unwrap().chain[0];
        assert_eq!(g.node(mid).unwrap().rank, Some(1));
        assert_eq!(g.node(mid).unwrap().dummy, Some(DummyKind::EdgeLabel));
        assert_eq!(g.node(mid).unwrap().width, 30.0);
    }

    #[test]
    fn undo_removes_every_virtual_node() {
        let mut g = new_layout_graph();
        let a = ranked_node(&mut g, "a", 0);
        let b = ranked_node(&mut g, "b", 3);
        g.add_edge(a, b, EdgeLabel::default());

        run(&mut g, &GraphConfig::default());
        for v in g.node_ids() {
            if let Some(n) = g.node_mut(v) {
                n.x = Some(1.0);
                n.y = Some(2.0);
            }
        }
        undo(&mut g);

        assert_eq!(g.node_count(), 2);
        assert!(g.node_ids().iter().all(|&v| !g.node(v).unwrap().is_virtual()));
    }
}
