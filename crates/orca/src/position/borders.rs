//! Cluster border columns.
//!
//! Before X assignment each cluster gets one zero-width virtual node at each
//! horizontal edge of every rank it occupies. The columns take part in the
//! separation chains (keeping outside nodes a margin away) and are read back
//! as the cluster's left/right bounds afterwards.

use crate::model::{DummyKind, LayoutGraph, NodeLabel, clusters_postorder};
use crate::ranks::RankSequence;
use orca_graphlib::NodeId;

pub(crate) fn insert_border_nodes(g: &mut LayoutGraph, seq: &mut RankSequence) {
    // Innermost first, so outer borders land outside inner ones.
    for c in clusters_postorder(g) {
        let (Some(lo), Some(hi)) = (
            g.node(c).and_then(|n| n.min_rank),
            g.node(c).and_then(|n| n.max_rank),
        ) else {
            continue;
        };
        let mut left_col: Vec<NodeId> = Vec::new();
        let mut right_col: Vec<NodeId> = Vec::new();
        for r in lo..=hi {
            let Some(rid) = seq.find_by_value(g, r) else {
                continue;
            };
            let nodes = seq.get(rid).nodes.clone();
            let mut first: Option<usize> = None;
            let mut last: Option<usize> = None;
            for (i, &v) in nodes.iter().enumerate() {
                if has_ancestor(g, v, c) {
                    if first.is_none() {
                        first = Some(i);
                    }
                    last = Some(i);
                }
            }
            let (Some(first), Some(last)) = (first, last) else {
                continue;
            };

            let bl = border(g, c, DummyKind::BorderLeft, r);
            let br = border(g, c, DummyKind::BorderRight, r);
            let rank = seq.get_mut(rid);
            rank.nodes.insert(last + 1, br);
            rank.nodes.insert(first, bl);
            left_col.push(bl);
            right_col.push(br);
        }
        if let Some(n) = g.node_mut(c) {
            n.border_left = left_col;
            n.border_right = right_col;
        }
    }
    renumber(g, seq);
}

/// Drops the border columns once cluster bounds are recorded, restoring the
/// rank lists the routers see.
pub(crate) fn remove_border_nodes(g: &mut LayoutGraph, seq: &mut RankSequence) {
    let mut doomed: Vec<NodeId> = Vec::new();
    for c in clusters_postorder(g) {
        if let Some(n) = g.node_mut(c) {
            doomed.extend(n.border_left.drain(..));
            doomed.extend(n.border_right.drain(..));
        }
    }
    for rid in seq.iter().collect::<Vec<_>>() {
        seq.get_mut(rid).nodes.retain(|v| !doomed.contains(v));
    }
    for v in doomed {
        g.remove_node(v);
    }
    renumber(g, seq);
}

fn border(g: &mut LayoutGraph, cluster: NodeId, kind: DummyKind, rank: i32) -> NodeId {
    let v = g.add_node(NodeLabel {
        dummy: Some(kind),
        rank: Some(rank),
        ..Default::default()
    });
    g.set_parent(v, cluster);
    v
}

fn renumber(g: &mut LayoutGraph, seq: &mut RankSequence) {
    for rid in seq.iter().collect::<Vec<_>>() {
        let nodes = seq.get(rid).nodes.clone();
        for (i, v) in nodes.into_iter().enumerate() {
            if let Some(n) = g.node_mut(v) {
                n.order = Some(i);
            }
        }
    }
}

pub(crate) fn has_ancestor(g: &LayoutGraph, v: NodeId, ancestor: NodeId) -> bool {
    let mut cur = g.parent(v);
    while let Some(a) = cur {
        if a == ancestor {
            return true;
        }
        cur = g.parent(a);
    }
    false
}
