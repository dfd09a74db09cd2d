//! Weighted-median pass: each node adopts a target position computed from
//! its neighbors on the fixed adjacent rank, then every rank re-sorts by
//! target. Nodes with no neighbors keep their slot.

use super::problem::Problem;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;

pub(crate) fn wmedian(p: &mut Problem, top_down: bool) {
    let n = p.layer_count();
    if top_down {
        for layer in 1..n {
            let adj = p.adj_above(layer);
            sort_layer(p, layer, &adj);
        }
    } else {
        for layer in (0..n.saturating_sub(1)).rev() {
            let adj = p.adj_below(layer);
            sort_layer(p, layer, &adj);
        }
    }
}

fn sort_layer(p: &mut Problem, layer: usize, adj: &FxHashMap<usize, Vec<(usize, f64)>>) {
    let medians: Vec<f64> = p.layers[layer]
        .iter()
        .map(|m| {
            let mut positions: Vec<usize> = adj
                .get(m)
                .map(|v| v.iter().map(|&(pos, _)| pos).collect())
                .unwrap_or_default();
            positions.sort_unstable();
            median_value(&positions)
        })
        .collect();

    // Anchored nodes (median < 0) keep their slots; the rest share out the
    // remaining slots in median order, original order breaking ties.
    let mut movable: Vec<(usize, f64)> = p.layers[layer]
        .iter()
        .copied()
        .zip(medians.iter().copied())
        .filter(|&(_, med)| med >= 0.0)
        .collect();
    movable.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let mut next = movable.into_iter().map(|(m, _)| m);
    for slot in 0..p.layers[layer].len() {
        if medians[slot] >= 0.0 {
            if let Some(m) = next.next() {
                p.layers[layer][slot] = m;
            }
        }
    }
}

/// Median of sorted neighbor positions. Two middles get interpolated,
/// weighted toward the side with the tighter neighbor spread.
fn median_value(positions: &[usize]) -> f64 {
    let n = positions.len();
    let m = n / 2;
    match n {
        0 => -1.0,
        1 => positions[0] as f64,
        2 => (positions[0] + positions[1]) as f64 / 2.0,
        _ if n % 2 == 1 => positions[m] as f64,
        _ => {
            let left = (positions[m - 1] - positions[0]) as f64;
            let right = (positions[n - 1] - positions[m]) as f64;
            if left + right == 0.0 {
                (positions[m - 1] + positions[m]) as f64 / 2.0
            } else {
                (positions[m - 1] as f64 * right + positions[m] as f64 * left) / (left + right)
            }
        }
    }
}
