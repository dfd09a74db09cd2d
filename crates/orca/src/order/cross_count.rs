/// Weighted bilayer crossing count via an accumulator tree.
///
/// `entries` are (south position, weight) pairs listed in north order, ties
/// broken by south position. Runs in O(|E| log |south|).
pub(crate) fn two_layer_cross_count(entries: &[(usize, f64)], south_len: usize) -> f64 {
    if south_len == 0 || entries.is_empty() {
        return 0.0;
    }

    let mut first_index: usize = 1;
    while first_index < south_len {
        first_index <<= 1;
    }
    let tree_size = 2 * first_index - 1;
    first_index -= 1;
    let mut tree: Vec<f64> = vec![0.0; tree_size];

    let mut cc: f64 = 0.0;
    for &(pos, weight) in entries {
        let mut index = pos + first_index;
        tree[index] += weight;
        let mut weight_sum: f64 = 0.0;
        while index > 0 {
            if index % 2 == 1 {
                weight_sum += tree[index + 1];
            }
            index = (index - 1) >> 1;
            tree[index] += weight;
        }
        cc += weight * weight_sum;
    }
    cc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_edges_do_not_cross() {
        // n0->s0, n1->s1
        assert_eq!(two_layer_cross_count(&[(0, 1.0), (1, 1.0)], 2), 0.0);
    }

    #[test]
    fn one_crossing() {
        // n0->s1, n1->s0
        assert_eq!(two_layer_cross_count(&[(1, 1.0), (0, 1.0)], 2), 1.0);
    }

    #[test]
    fn weights_multiply() {
        assert_eq!(two_layer_cross_count(&[(1, 2.0), (0, 3.0)], 2), 6.0);
    }

    #[test]
    fn complete_bipartite_k22_reversed() {
        // n0->{s0,s1}, n1->{s0,s1}: exactly one crossing.
        let entries = [(0, 1.0), (1, 1.0), (0, 1.0), (1, 1.0)];
        assert_eq!(two_layer_cross_count(&entries, 2), 1.0);
    }
}
