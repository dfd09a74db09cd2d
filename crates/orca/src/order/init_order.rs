//! Initial orderings: one depth-first pass from the top, one from the
//! bottom, keeping whichever starts with fewer crossings.

use super::problem::Problem;

pub(crate) fn init_order(p: &mut Problem) {
    let (out_adj, in_adj) = p.member_adjacency();

    let top_down = dfs_discovery(p.members.len(), &out_adj, &in_adj);
    apply(p, &top_down);
    let top_cc = p.crossings();
    let top_layers = p.snapshot();

    let bottom_up = dfs_discovery(p.members.len(), &in_adj, &out_adj);
    apply(p, &bottom_up);
    let bottom_cc = p.crossings();

    if top_cc <= bottom_cc {
        p.restore(top_layers);
    }
}

/// Discovery index per member from an iterative DFS rooted at the members
/// with no incoming adjacency, member-index order breaking ties.
fn dfs_discovery(n: usize, out_adj: &[Vec<usize>], in_adj: &[Vec<usize>]) -> Vec<usize> {
    let mut disc: Vec<usize> = vec![usize::MAX; n];
    let mut next = 0usize;
    let mut stack: Vec<usize> = Vec::new();

    let mut roots: Vec<usize> = (0..n).filter(|&m| in_adj[m].is_empty()).collect();
    roots.extend(0..n); // fallback seeds for cyclic leftovers
    for root in roots {
        if disc[root] != usize::MAX {
            continue;
        }
        stack.push(root);
        while let Some(m) = stack.pop() {
            if disc[m] != usize::MAX {
                continue;
            }
            disc[m] = next;
            next += 1;
            // Reverse push keeps low-index successors visited first.
            for &s in out_adj[m].iter().rev() {
                if disc[s] == usize::MAX {
                    stack.push(s);
                }
            }
        }
    }
    disc
}

fn apply(p: &mut Problem, disc: &[usize]) {
    for layer in &mut p.layers {
        layer.sort_by_key(|&m| disc[m]);
    }
}
