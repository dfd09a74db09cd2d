//! Cycle breaking.
//!
//! Self-loops are taken out of play first (the loop router picks them up at
//! the end), then depth-first passes reverse every edge that closes a cycle
//! until a pass finds none. DFS runs on an explicit frame stack so deep
//! graphs cannot overflow the call stack.

use crate::model::{LayoutGraph, is_cluster};
use orca_graphlib::{EdgeId, NodeId};

#[derive(Debug, Clone, Copy)]
struct Frame {
    v: NodeId,
    next_edge: usize,
}

pub fn run(g: &mut LayoutGraph) {
    for e in g.edge_ids() {
        let Some((v, w)) = g.edge_ends(e) else {
            continue;
        };
        if v == w {
            if let Some(lbl) = g.edge_mut(e) {
                lbl.self_loop = true;
            }
        }
    }

    // Reversing one pass's back edges can close a new cycle through a cross
    // edge, so repeat until a pass comes back clean.
    loop {
        let back = find_back_edges(g);
        if back.is_empty() {
            break;
        }
        for e in back {
            if let Some(lbl) = g.edge_mut(e) {
                lbl.reversed = !lbl.reversed;
            }
        }
    }
}

fn find_back_edges(g: &LayoutGraph) -> Vec<EdgeId> {
    let cap = g
        .node_ids()
        .last()
        .map(|v| v.index() + 1)
        .unwrap_or_default();
    let mut visited = vec![false; cap];
    let mut on_stack = vec![false; cap];
    let mut back: Vec<EdgeId> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for root in g.node_ids() {
        if visited[root.index()] || is_cluster(g, root) {
            continue;
        }
        visited[root.index()] = true;
        on_stack[root.index()] = true;
        stack.push(Frame {
            v: root,
            next_edge: 0,
        });

        // Oriented adjacency is collected per frame push; the edge list of a
        // node does not change during the search.
        let mut adj: Vec<Vec<(EdgeId, NodeId)>> = vec![Vec::new()];
        adj[0] = oriented_out(g, root);

        while let Some(depth) = stack.len().checked_sub(1) {
            let frame = stack[depth];
            let Some(&(e, w)) = adj[depth].get(frame.next_edge) else {
                on_stack[frame.v.index()] = false;
                stack.pop();
                adj.pop();
                continue;
            };
            stack[depth].next_edge += 1;

            if on_stack[w.index()] {
                back.push(e);
            } else if !visited[w.index()] {
                visited[w.index()] = true;
                on_stack[w.index()] = true;
                stack.push(Frame { v: w, next_edge: 0 });
                adj.push(oriented_out(g, w));
            }
        }
    }

    back
}

fn oriented_out(g: &LayoutGraph, v: NodeId) -> Vec<(EdgeId, NodeId)> {
    let mut out = Vec::new();
    crate::model::for_each_out_oriented(g, v, |e, w| out.push((e, w)));
    out
}

/// Restores caller-facing orientation on the finished geometry: reversed
/// edges get their point lists, splines, and arrows flipped back.
pub fn undo(g: &mut LayoutGraph) {
    for e in g.edge_ids() {
        let Some(lbl) = g.edge_mut(e) else { continue };
        if !lbl.reversed {
            continue;
        }
        lbl.reversed = false;
        lbl.points.reverse();
        lbl.splines.reverse();
        for b in &mut lbl.splines {
            std::mem::swap(&mut b.p0, &mut b.p3);
            std::mem::swap(&mut b.p1, &mut b.p2);
        }
        lbl.arrows.reverse();
    }
}

/// Layout-oriented graph must be acyclic after `run`; debug helper used by
/// tests.
pub fn is_acyclic(g: &LayoutGraph) -> bool {
    let cap = g
        .node_ids()
        .last()
        .map(|v| v.index() + 1)
        .unwrap_or_default();
    let mut indegree = vec![0usize; cap];
    let mut live = 0usize;
    for v in g.node_ids() {
        if is_cluster(g, v) {
            continue;
        }
        live += 1;
        crate::model::for_each_in_oriented(g, v, |_e, _u| indegree[v.index()] += 1);
    }
    let mut queue: Vec<NodeId> = g
        .node_ids()
        .into_iter()
        .filter(|&v| !is_cluster(g, v) && indegree[v.index()] == 0)
        .collect();
    let mut seen = 0usize;
    while let Some(v) = queue.pop() {
        seen += 1;
        crate::model::for_each_out_oriented(g, v, |_e, w| {
            indegree[w.index()] -= 1;
            if indegree[w.index()] == 0 {
                queue.push(w);
            }
        });
    }
    seen == live
}
