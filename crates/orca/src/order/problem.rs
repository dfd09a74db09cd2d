//! Materialized ordering problem for one container level.
//!
//! Each cluster gets its own independent problem over its direct children;
//! clusters appearing among those children are collapsed to a proxy occupying
//! one slot per rank they span. Edges crossing out of the container are
//! dropped here and surface in the enclosing problem instead.

use crate::model::{LayoutGraph, active_edges, edge_ends_oriented};
use crate::order::cross_count::two_layer_cross_count;
use orca_graphlib::NodeId;
use rustc_hash::{FxHashMap, FxHashSet};

/// Pull between consecutive rank cells of one cluster proxy, so the proxy
/// column stays roughly vertical through the sweeps.
const PROXY_CHAIN_WEIGHT: f64 = 2.0;

#[derive(Debug, Clone, Copy)]
pub(crate) struct ProblemEdge {
    /// Member index on the upper layer.
    pub up: usize,
    /// Member index on the layer below.
    pub down: usize,
    pub weight: f64,
}

#[derive(Debug)]
pub(crate) struct Problem {
    pub container: Option<NodeId>,
    pub min_rank: i32,
    /// Direct children of the container that carry a rank span.
    pub members: Vec<NodeId>,
    /// One permutation of member indices per rank in the span.
    pub layers: Vec<Vec<usize>>,
    /// Cross-rank adjacency, indexed by the upper layer.
    edges_by_layer: Vec<Vec<ProblemEdge>>,
    /// Same-rank pairs that must not be reordered, normalized (lo, hi).
    flat_pairs: Vec<FxHashSet<(usize, usize)>>,
    /// Same-rank pairs in left-to-right intent order, for seeding.
    flat_oriented: Vec<Vec<(usize, usize)>>,
}

impl Problem {
    /// Builds the problem for `container` (None = top level). `spans` maps
    /// every ranked node, clusters included, to its inclusive rank span.
    pub fn build(
        g: &LayoutGraph,
        container: Option<NodeId>,
        spans: &FxHashMap<NodeId, (i32, i32)>,
    ) -> Option<Problem> {
        let candidates: Vec<NodeId> = match container {
            Some(c) => g.children(c).to_vec(),
            None => g.children_root(),
        };
        let mut members: Vec<NodeId> = Vec::new();
        let mut span_of: Vec<(i32, i32)> = Vec::new();
        for v in candidates {
            if let Some(&s) = spans.get(&v) {
                members.push(v);
                span_of.push(s);
            }
        }
        if members.is_empty() {
            return None;
        }

        let min_rank = span_of.iter().map(|s| s.0).min().unwrap_or(0);
        let max_rank = span_of.iter().map(|s| s.1).max().unwrap_or(0);
        let layer_count = (max_rank - min_rank + 1) as usize;

        let mut layers: Vec<Vec<usize>> = vec![Vec::new(); layer_count];
        for (m, &(lo, hi)) in span_of.iter().enumerate() {
            for r in lo..=hi {
                layers[(r - min_rank) as usize].push(m);
            }
        }

        let index_of: FxHashMap<NodeId, usize> =
            members.iter().enumerate().map(|(i, &v)| (v, i)).collect();

        let mut edges_by_layer: Vec<Vec<ProblemEdge>> = vec![Vec::new(); layer_count];
        let mut flat_pairs: Vec<FxHashSet<(usize, usize)>> =
            vec![FxHashSet::default(); layer_count];
        let mut flat_oriented: Vec<Vec<(usize, usize)>> = vec![Vec::new(); layer_count];

        for e in active_edges(g) {
            let Some((u, w)) = edge_ends_oriented(g, e) else {
                continue;
            };
            let Some(mu) = representative(g, u, &index_of) else {
                continue;
            };
            let Some(mw) = representative(g, w, &index_of) else {
                continue;
            };
            if mu == mw {
                continue;
            }
            let (Some(ru), Some(rw)) = (
                g.node(u).and_then(|n| n.rank),
                g.node(w).and_then(|n| n.rank),
            ) else {
                continue;
            };
            // Attach each end at the proxy cell nearest the other endpoint.
            let cu = ru.clamp(span_of[mu].0, span_of[mu].1);
            let cw = rw.clamp(span_of[mw].0, span_of[mw].1);
            let weight = g.edge(e).map(|l| l.effective_weight(g)).unwrap_or(1.0);

            match cw - cu {
                0 => {
                    let layer = (cu - min_rank) as usize;
                    let key = (mu.min(mw), mu.max(mw));
                    if flat_pairs[layer].insert(key) {
                        flat_oriented[layer].push((mu, mw));
                    }
                }
                1 => edges_by_layer[(cu - min_rank) as usize].push(ProblemEdge {
                    up: mu,
                    down: mw,
                    weight,
                }),
                -1 => edges_by_layer[(cw - min_rank) as usize].push(ProblemEdge {
                    up: mw,
                    down: mu,
                    weight,
                }),
                _ => {}
            }
        }

        // Vertical chain through each multi-rank proxy.
        for (m, &(lo, hi)) in span_of.iter().enumerate() {
            for r in lo..hi {
                edges_by_layer[(r - min_rank) as usize].push(ProblemEdge {
                    up: m,
                    down: m,
                    weight: PROXY_CHAIN_WEIGHT,
                });
            }
        }

        Some(Problem {
            container,
            min_rank,
            members,
            layers,
            edges_by_layer,
            flat_pairs,
            flat_oriented,
        })
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Member index -> position within `layer`.
    pub fn positions(&self, layer: usize) -> FxHashMap<usize, usize> {
        self.layers[layer]
            .iter()
            .enumerate()
            .map(|(i, &m)| (m, i))
            .collect()
    }

    /// Edges linking `layer` to the one above, keyed by this layer's member,
    /// valued with (position above, weight) lists.
    pub fn adj_above(&self, layer: usize) -> FxHashMap<usize, Vec<(usize, f64)>> {
        let mut out: FxHashMap<usize, Vec<(usize, f64)>> = FxHashMap::default();
        if layer == 0 {
            return out;
        }
        let above = self.positions(layer - 1);
        for e in &self.edges_by_layer[layer - 1] {
            if let Some(&p) = above.get(&e.up) {
                out.entry(e.down).or_default().push((p, e.weight));
            }
        }
        out
    }

    pub fn adj_below(&self, layer: usize) -> FxHashMap<usize, Vec<(usize, f64)>> {
        let mut out: FxHashMap<usize, Vec<(usize, f64)>> = FxHashMap::default();
        if layer + 1 >= self.layers.len() {
            return out;
        }
        let below = self.positions(layer + 1);
        for e in &self.edges_by_layer[layer] {
            if let Some(&p) = below.get(&e.down) {
                out.entry(e.up).or_default().push((p, e.weight));
            }
        }
        out
    }

    /// Member-level digraph over cross-rank edges, proxy chains excluded.
    pub fn member_adjacency(&self) -> (Vec<Vec<usize>>, Vec<Vec<usize>>) {
        let n = self.members.len();
        let mut out = vec![Vec::new(); n];
        let mut inn = vec![Vec::new(); n];
        for layer in &self.edges_by_layer {
            for e in layer {
                if e.up != e.down {
                    out[e.up].push(e.down);
                    inn[e.down].push(e.up);
                }
            }
        }
        (out, inn)
    }

    pub fn flat_blocks(&self, layer: usize, a: usize, b: usize) -> bool {
        self.flat_pairs[layer].contains(&(a.min(b), a.max(b)))
    }

    /// Reorders each layer so flat-edge tails come before their heads, as far
    /// as a stable topological pass allows. Cyclic remainders keep their
    /// current relative order.
    pub fn seed_flat_order(&mut self) {
        for layer in 0..self.layers.len() {
            if self.flat_oriented[layer].is_empty() {
                continue;
            }
            let current = self.layers[layer].clone();
            let pos: FxHashMap<usize, usize> =
                current.iter().enumerate().map(|(i, &m)| (m, i)).collect();
            let mut succ: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
            let mut indeg: FxHashMap<usize, usize> = current.iter().map(|&m| (m, 0)).collect();
            for &(a, b) in &self.flat_oriented[layer] {
                succ.entry(a).or_default().push(b);
                *indeg.entry(b).or_default() += 1;
            }
            let mut ready: Vec<usize> = current
                .iter()
                .copied()
                .filter(|m| indeg[m] == 0)
                .collect();
            let mut sorted: Vec<usize> = Vec::with_capacity(current.len());
            while let Some(&m) = ready.first() {
                ready.remove(0);
                sorted.push(m);
                for &s in succ.get(&m).map(Vec::as_slice).unwrap_or(&[]) {
                    let d = indeg.get_mut(&s).expect("flat successor is in layer");
                    *d -= 1;
                    if *d == 0 {
                        ready.push(s);
                        ready.sort_by_key(|m| pos[m]);
                    }
                }
            }
            // Flat cycle: append leftovers untouched.
            for &m in &current {
                if !sorted.contains(&m) {
                    sorted.push(m);
                }
            }
            self.layers[layer] = sorted;
        }
    }

    pub fn crossings(&self) -> f64 {
        let mut cc = 0.0;
        for layer in 0..self.layers.len().saturating_sub(1) {
            let up_pos = self.positions(layer);
            let down_pos = self.positions(layer + 1);
            let mut entries: Vec<(usize, usize, f64)> = self.edges_by_layer[layer]
                .iter()
                .filter_map(|e| Some((*up_pos.get(&e.up)?, *down_pos.get(&e.down)?, e.weight)))
                .collect();
            entries.sort_by_key(|&(u, d, _)| (u, d));
            let flat: Vec<(usize, f64)> = entries.iter().map(|&(_, d, w)| (d, w)).collect();
            cc += two_layer_cross_count(&flat, self.layers[layer + 1].len());
        }
        cc
    }

    pub fn snapshot(&self) -> Vec<Vec<usize>> {
        self.layers.clone()
    }

    pub fn restore(&mut self, layers: Vec<Vec<usize>>) {
        self.layers = layers;
    }
}

/// Climbs from `v` toward the root until hitting a direct member of the
/// problem's container. None when `v` lives outside that container.
fn representative(
    g: &LayoutGraph,
    v: NodeId,
    index_of: &FxHashMap<NodeId, usize>,
) -> Option<usize> {
    let mut cur = Some(v);
    while let Some(node) = cur {
        if let Some(&m) = index_of.get(&node) {
            return Some(m);
        }
        cur = g.parent(node);
    }
    None
}
