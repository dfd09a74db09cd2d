//! Adjacent-exchange refinement: swap neighboring same-rank pairs whenever
//! the swap lowers the local crossing count, to a fixed point. In the
//! tie-reversing mode equal-cost swaps are also taken (without counting as
//! progress), which shakes the ordering out of plateaus.

use super::problem::Problem;
use rustc_hash::FxHashMap;

pub(crate) fn transpose(p: &mut Problem, reverse_ties: bool) {
    let mut improved = true;
    while improved {
        improved = false;
        for layer in 0..p.layer_count() {
            let above = p.adj_above(layer);
            let below = p.adj_below(layer);
            let len = p.layers[layer].len();
            for i in 0..len.saturating_sub(1) {
                let v = p.layers[layer][i];
                let w = p.layers[layer][i + 1];
                if p.flat_blocks(layer, v, w) {
                    continue;
                }
                let (now, swapped) = pair_cost(&above, &below, v, w);
                if swapped < now {
                    p.layers[layer].swap(i, i + 1);
                    improved = true;
                } else if reverse_ties && swapped == now && now > 0.0 {
                    p.layers[layer].swap(i, i + 1);
                }
            }
        }
    }
}

/// Crossings among edges incident to just `v` and `w`, for the current
/// (v left of w) and the swapped arrangement.
fn pair_cost(
    above: &FxHashMap<usize, Vec<(usize, f64)>>,
    below: &FxHashMap<usize, Vec<(usize, f64)>>,
    v: usize,
    w: usize,
) -> (f64, f64) {
    let mut now = 0.0;
    let mut swapped = 0.0;
    for adj in [above, below] {
        let av = adj.get(&v).map(Vec::as_slice).unwrap_or(&[]);
        let aw = adj.get(&w).map(Vec::as_slice).unwrap_or(&[]);
        for &(pv, wv) in av {
            for &(pw, ww) in aw {
                if pv > pw {
                    now += wv * ww;
                } else if pv < pw {
                    swapped += wv * ww;
                }
            }
        }
    }
    (now, swapped)
}
