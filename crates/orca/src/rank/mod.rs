//! Rank assignment.
//!
//! Clusters are solved innermost-first: each cluster becomes a single proxy
//! node in its parent's constraint graph, with member offsets folded into the
//! mapped edges' minlens so the proxy carries the cluster's full rank span.
//! Final ranks are pushed back down the container tree.

pub mod network_simplex;

pub use network_simplex::{SimplexEdge, solve};

use crate::error::Result;
use crate::model::{GraphConfig, LayoutGraph, clusters_postorder, edge_ends_oriented};
use orca_graphlib::NodeId;
use rustc_hash::FxHashMap;
use tracing::debug;

#[derive(Debug, Default)]
struct ClusterSolution {
    /// Offset of each direct member (leaf or child cluster) from the cluster
    /// top.
    rel: FxHashMap<NodeId, i32>,
    /// Number of ranks the cluster occupies.
    span: i32,
}

pub fn rank(g: &mut LayoutGraph, cfg: &GraphConfig) -> Result<()> {
    let nslimit = cfg.nslimit.unwrap_or_else(|| 4 * g.node_count().max(1));

    let clusters = clusters_postorder(g);
    let mut solutions: FxHashMap<NodeId, ClusterSolution> = FxHashMap::default();

    for &c in &clusters {
        let sol = solve_level(g, Some(c), &solutions, nslimit)?;
        debug!(cluster = %c, span = sol.span, "ranked cluster");
        solutions.insert(c, sol);
    }

    let root = solve_level(g, None, &solutions, nslimit)?;

    // Push container-relative offsets down to absolute ranks.
    let mut stack: Vec<(NodeId, i32)> = Vec::new();
    for (&m, &off) in &root.rel {
        stack.push((m, off));
    }
    while let Some((v, top)) = stack.pop() {
        if let Some(sol) = solutions.get(&v) {
            if let Some(label) = g.node_mut(v) {
                label.min_rank = Some(top);
                label.max_rank = Some(top + sol.span - 1);
            }
            for (&m, &off) in &sol.rel {
                stack.push((m, top + off));
            }
        } else if let Some(label) = g.node_mut(v) {
            label.rank = Some(top);
        }
    }

    Ok(())
}

/// Solves one container level: the direct members of `container` (the root
/// when `None`), with child clusters collapsed to proxies.
fn solve_level(
    g: &LayoutGraph,
    container: Option<NodeId>,
    solutions: &FxHashMap<NodeId, ClusterSolution>,
    nslimit: usize,
) -> Result<ClusterSolution> {
    let members: Vec<NodeId> = match container {
        Some(c) => g.children(c).to_vec(),
        None => g.children_root(),
    };
    if members.is_empty() {
        return Ok(ClusterSolution {
            rel: FxHashMap::default(),
            span: 1,
        });
    }

    let ix_of: FxHashMap<NodeId, usize> =
        members.iter().enumerate().map(|(i, &m)| (m, i)).collect();

    let mut edges: Vec<SimplexEdge> = Vec::new();
    for e in crate::model::active_edges(g) {
        let Some((u, w)) = edge_ends_oriented(g, e) else {
            continue;
        };
        let Some((rep_u, off_u)) = representative(g, u, container, solutions) else {
            continue;
        };
        let Some((rep_w, off_w)) = representative(g, w, container, solutions) else {
            continue;
        };
        if rep_u == rep_w {
            continue;
        }
        let label = g.edge(e).expect("active edge has a label");
        edges.push(SimplexEdge::new(
            ix_of[&rep_u],
            ix_of[&rep_w],
            label.effective_weight(g),
            label.effective_minlen(g) + off_u - off_w,
        ));
    }

    break_proxy_cycles(members.len(), &mut edges);

    let ranks = solve(members.len(), &edges, nslimit)?;

    let mut rel: FxHashMap<NodeId, i32> = FxHashMap::default();
    let mut span: i32 = 1;
    for (i, &m) in members.iter().enumerate() {
        rel.insert(m, ranks[i]);
        let m_span = solutions.get(&m).map(|s| s.span).unwrap_or(1);
        span = span.max(ranks[i] + m_span);
    }
    Ok(ClusterSolution { rel, span })
}

/// Maps `v` to its representative among `container`'s direct members, along
/// with `v`'s rank offset inside that representative. `None` when `v` does
/// not live (transitively) in `container`.
fn representative(
    g: &LayoutGraph,
    v: NodeId,
    container: Option<NodeId>,
    solutions: &FxHashMap<NodeId, ClusterSolution>,
) -> Option<(NodeId, i32)> {
    let mut chain: Vec<NodeId> = vec![v];
    let mut cur = v;
    loop {
        let parent = g.parent(cur);
        if parent == container {
            break;
        }
        cur = parent?;
        chain.push(cur);
    }

    // `chain` runs from v up to the representative; accumulate the offsets of
    // each hop inside its direct container.
    let rep = *chain.last().expect("chain contains v");
    let mut offset = 0;
    for pair in chain.windows(2).rev() {
        let (inner, outer) = (pair[0], pair[1]);
        offset += solutions
            .get(&outer)
            .and_then(|s| s.rel.get(&inner))
            .copied()
            .unwrap_or(0);
    }
    Some((rep, offset))
}

/// Collapsing clusters can close cycles between proxies even though the leaf
/// graph is acyclic; reverse the back edges found by one DFS sweep at a time
/// until the level graph is a DAG.
fn break_proxy_cycles(node_count: usize, edges: &mut [SimplexEdge]) {
    loop {
        let mut out_adj: Vec<Vec<usize>> = vec![Vec::new(); node_count];
        for (ix, e) in edges.iter().enumerate() {
            out_adj[e.v].push(ix);
        }

        let mut visited = vec![false; node_count];
        let mut on_stack = vec![false; node_count];
        let mut back: Vec<usize> = Vec::new();
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for root in 0..node_count {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            on_stack[root] = true;
            stack.push((root, 0));
            while let Some(&mut (v, ref mut next)) = stack.last_mut() {
                let Some(&eix) = out_adj[v].get(*next) else {
                    on_stack[v] = false;
                    stack.pop();
                    continue;
                };
                *next += 1;
                let w = edges[eix].w;
                if on_stack[w] {
                    back.push(eix);
                } else if !visited[w] {
                    visited[w] = true;
                    on_stack[w] = true;
                    stack.push((w, 0));
                }
            }
        }

        if back.is_empty() {
            return;
        }
        for eix in back {
            let e = edges[eix];
            edges[eix] = SimplexEdge::new(e.w, e.v, e.weight, e.minlen.max(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeLabel, NodeLabel, new_layout_graph};

    fn node(g: &mut LayoutGraph, name: &str) -> NodeId {
        g.add_node(NodeLabel::named(name, 20.0, 20.0))
    }

    #[test]
    fn diamond_ranks() {
        let mut g = new_layout_graph();
        let a = node(&mut g, "a");
        let b = node(&mut g, "b");
        let c = node(&mut g, "c");
        let d = node(&mut g, "d");
        for (v, w) in [(a, b), (a, c), (b, d), (c, d)] {
            g.add_edge(v, w, EdgeLabel::default());
        }
        rank(&mut g, &GraphConfig::default()).unwrap();
        assert_eq!(g.node(a).unwrap().rank, Some(0));
        assert_eq!(g.node(b).unwrap().rank, Some(1));
        assert_eq!(g.node(c).unwrap().rank, Some(1));
        assert_eq!(g.node(d).unwrap().rank, Some(2));
    }

    #[test]
    fn cluster_occupies_contiguous_ranks() {
        let mut g = new_layout_graph();
        let a = node(&mut g, "a");
        let x = node(&mut g, "x");
        let y = node(&mut g, "y");
        let z = node(&mut g, "z");
        let tail = node(&mut g, "tail");
        let cluster = g.add_node(NodeLabel::named("cluster", 0.0, 0.0));
        for v in [x, y, z] {
            g.set_parent(v, cluster);
        }
        g.add_edge(a, x, EdgeLabel::default());
        g.add_edge(x, y, EdgeLabel::default());
        g.add_edge(y, z, EdgeLabel::default());
        g.add_edge(z, tail, EdgeLabel::default());

        rank(&mut g, &GraphConfig::default()).unwrap();
        let top = g.node(cluster).unwrap().min_rank.unwrap();
        let bottom = g.node(cluster).unwrap().max_rank.unwrap();
        assert_eq!(bottom - top, 2);
        assert_eq!(g.node(x).unwrap().rank, Some(top));
        assert_eq!(g.node(z).unwrap().rank, Some(bottom));
        assert_eq!(g.node(a).unwrap().rank, Some(top - 1));
        assert_eq!(g.node(tail).unwrap().rank, Some(bottom + 1));
    }
}
