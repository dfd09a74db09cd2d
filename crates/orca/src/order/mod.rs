//! Crossing minimization.
//!
//! Every container level (top level, each cluster) is minimized as its own
//! problem; a cluster is one proxy column inside its parent's problem. After
//! all problems converge, the per-rank permutations are expanded innermost
//! cluster last and written back into the master rank sequence.

mod cross_count;
mod init_order;
mod median;
mod problem;
mod transpose;

use crate::model::{GraphConfig, LayoutGraph, clusters_postorder, is_cluster};
use crate::ranks::RankSequence;
use init_order::init_order;
use median::wmedian;
use orca_graphlib::NodeId;
use problem::Problem;
use rustc_hash::FxHashMap;
use tracing::debug;
use transpose::transpose;

pub fn run(g: &mut LayoutGraph, seq: &mut RankSequence, cfg: &GraphConfig) {
    let spans = rank_spans(g);

    // Refresh cluster spans; rank compaction renumbered everything.
    for c in clusters_postorder(g) {
        if let (Some(&(lo, hi)), Some(n)) = (spans.get(&c), g.node_mut(c)) {
            n.min_rank = Some(lo);
            n.max_rank = Some(hi);
        }
    }

    let mut problems: Vec<Problem> = Vec::new();
    let mut by_cluster: FxHashMap<NodeId, usize> = FxHashMap::default();
    for c in clusters_postorder(g) {
        if let Some(p) = Problem::build(g, Some(c), &spans) {
            by_cluster.insert(c, problems.len());
            problems.push(p);
        }
    }
    let Some(root) = Problem::build(g, None, &spans) else {
        return;
    };
    let root_idx = problems.len();
    problems.push(root);

    let mut total = 0.0;
    for p in &mut problems {
        total += sweep(p, cfg.order_iterations);
    }
    debug!(crossings = total, problems = problems.len(), "ordering converged");

    let rank_ids: Vec<_> = seq.iter().collect();
    for (value, rid) in rank_ids.into_iter().enumerate() {
        let mut nodes: Vec<NodeId> = Vec::new();
        expand(&problems, &by_cluster, root_idx, value as i32, &mut nodes);
        for (i, &v) in nodes.iter().enumerate() {
            if let Some(n) = g.node_mut(v) {
                n.order = Some(i);
            }
        }
        seq.get_mut(rid).nodes = nodes;
    }
}

/// Median/transpose iteration with best-ordering tracking. Stops on zero
/// crossings, four sweeps without improvement, or the iteration cap.
fn sweep(p: &mut Problem, max_iterations: usize) -> f64 {
    init_order(p);
    p.seed_flat_order();
    transpose(p, false);

    let mut best_cc = p.crossings();
    let mut best = p.snapshot();

    let mut i = 0usize;
    let mut last_best = 0usize;
    while last_best < 4 && best_cc > 0.0 && i < max_iterations {
        wmedian(p, i % 2 == 0);
        transpose(p, i % 4 >= 2);
        let cc = p.crossings();
        if cc < best_cc {
            best_cc = cc;
            best = p.snapshot();
            last_best = 0;
        } else {
            last_best += 1;
        }
        i += 1;
    }

    p.restore(best);
    best_cc
}

/// Inclusive rank span per ranked node; a cluster spans all its descendant
/// leaves.
fn rank_spans(g: &LayoutGraph) -> FxHashMap<NodeId, (i32, i32)> {
    let mut spans: FxHashMap<NodeId, (i32, i32)> = FxHashMap::default();
    for v in g.node_ids() {
        if is_cluster(g, v) {
            continue;
        }
        let Some(r) = g.node(v).and_then(|n| n.rank) else {
            continue;
        };
        let mut cur = Some(v);
        while let Some(node) = cur {
            spans
                .entry(node)
                .and_modify(|s| {
                    s.0 = s.0.min(r);
                    s.1 = s.1.max(r);
                })
                .or_insert((r, r));
            cur = g.parent(node);
        }
    }
    spans
}

fn expand(
    problems: &[Problem],
    by_cluster: &FxHashMap<NodeId, usize>,
    idx: usize,
    rank: i32,
    out: &mut Vec<NodeId>,
) {
    let p = &problems[idx];
    let layer = rank - p.min_rank;
    if layer < 0 || layer as usize >= p.layer_count() {
        return;
    }
    for &m in &p.layers[layer as usize] {
        let v = p.members[m];
        match by_cluster.get(&v) {
            Some(&child) => expand(problems, by_cluster, child, rank, out),
            None => out.push(v),
        }
    }
}
