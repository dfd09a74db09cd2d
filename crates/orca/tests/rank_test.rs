use orca::graphlib::NodeId;
use orca::model::{active_edges, edge_ends_oriented};
use orca::{EdgeLabel, Error, GraphConfig, LayoutGraph, NodeLabel, acyclic, new_layout_graph, rank};

fn node(g: &mut LayoutGraph, name: &str) -> NodeId {
    g.add_node(NodeLabel::named(name, 30.0, 30.0))
}

fn edge(g: &mut LayoutGraph, u: NodeId, w: NodeId, minlen: i32) {
    g.add_edge(
        u,
        w,
        EdgeLabel {
            minlen,
            ..Default::default()
        },
    );
}

fn gansner_graph() -> (LayoutGraph, Vec<NodeId>) {
    let mut g = new_layout_graph();
    let ids: Vec<NodeId> = ["a", "b", "c", "d", "e", "f", "g", "h"]
        .iter()
        .map(|n| node(&mut g, n))
        .collect();
    let [a, b, c, d, e, f, gg, h] = ids[..] else {
        unreachable!()
    };
    for (u, w) in [
        (a, b),
        (b, c),
        (c, d),
        (d, h),
        (a, e),
        (e, gg),
        (gg, h),
        (a, f),
        (f, gg),
    ] {
        edge(&mut g, u, w, 1);
    }
    (g, ids)
}

fn assert_respects_minlen(g: &LayoutGraph) {
    for e in active_edges(g) {
        let (u, w) = edge_ends_oriented(g, e).unwrap();
        let ru = g.node(u).unwrap().rank.unwrap();
        let rw = g.node(w).unwrap().rank.unwrap();
        let minlen = g.edge(e).unwrap().minlen;
        assert!(
            rw - ru >= minlen,
            "edge {u} -> {w} violates minlen {minlen}: ranks {ru} -> {rw}"
        );
    }
}

#[test]
fn rank_respects_minlen() {
    let (mut g, _) = gansner_graph();
    rank::rank(&mut g, &GraphConfig::default()).unwrap();
    assert_respects_minlen(&g);
}

#[test]
fn rank_respects_minlen_greater_than_one() {
    let mut g = new_layout_graph();
    let a = node(&mut g, "a");
    let b = node(&mut g, "b");
    let c = node(&mut g, "c");
    edge(&mut g, a, b, 3);
    edge(&mut g, b, c, 1);
    edge(&mut g, a, c, 1);
    rank::rank(&mut g, &GraphConfig::default()).unwrap();
    assert_respects_minlen(&g);
    let ra = g.node(a).unwrap().rank.unwrap();
    let rb = g.node(b).unwrap().rank.unwrap();
    assert!(rb - ra >= 3);
}

#[test]
fn merged_parallel_edges_keep_the_strictest_minlen() {
    let mut g = new_layout_graph();
    let a = node(&mut g, "a");
    let b = node(&mut g, "b");
    edge(&mut g, a, b, 1);
    edge(&mut g, a, b, 4);
    orca::normalize::merge_parallel_edges(&mut g);
    rank::rank(&mut g, &GraphConfig::default()).unwrap();

    let ra = g.node(a).unwrap().rank.unwrap();
    let rb = g.node(b).unwrap().rank.unwrap();
    assert!(
        rb - ra >= 4,
        "carrier must enforce the merged minlen: ranks {ra} -> {rb}"
    );
}

#[test]
fn rank_minimizes_total_weighted_length() {
    // a -> {b, c} -> d: both middles share one rank in the optimum.
    let (mut g, ids) = gansner_graph();
    rank::rank(&mut g, &GraphConfig::default()).unwrap();
    let rank_of = |v: NodeId| g.node(v).unwrap().rank.unwrap();
    let cost: i32 = active_edges(&g)
        .into_iter()
        .map(|e| {
            let (u, w) = edge_ends_oriented(&g, e).unwrap();
            rank_of(w) - rank_of(u)
        })
        .sum();
    // Known optimum for the Gansner example is 10.
    assert!(cost <= 10, "total edge length {cost} is not minimal");
    assert_eq!(rank_of(ids[0]), 0);
}

#[test]
fn cyclic_constraints_are_rejected_without_preprocessing() {
    let mut g = new_layout_graph();
    let a = node(&mut g, "a");
    let b = node(&mut g, "b");
    edge(&mut g, a, b, 1);
    edge(&mut g, b, a, 1);
    let err = rank::rank(&mut g, &GraphConfig::default()).unwrap_err();
    assert!(matches!(err, Error::InfeasibleRanking { .. }));
}

#[test]
fn acyclic_pass_makes_cyclic_input_rankable() {
    let mut g = new_layout_graph();
    let a = node(&mut g, "a");
    let b = node(&mut g, "b");
    let c = node(&mut g, "c");
    edge(&mut g, a, b, 1);
    edge(&mut g, b, c, 1);
    edge(&mut g, c, a, 1);
    acyclic::run(&mut g);
    rank::rank(&mut g, &GraphConfig::default()).unwrap();
    assert_respects_minlen(&g);
}

#[test]
fn cluster_occupies_contiguous_ranks() {
    let mut g = new_layout_graph();
    let a = node(&mut g, "a");
    let x = node(&mut g, "x");
    let y = node(&mut g, "y");
    let z = node(&mut g, "z");
    let tail = node(&mut g, "tail");
    let cluster = g.add_node(NodeLabel::default());
    for v in [x, y, z] {
        g.set_parent(v, cluster);
    }
    edge(&mut g, a, x, 1);
    edge(&mut g, x, y, 1);
    edge(&mut g, y, z, 1);
    edge(&mut g, z, tail, 1);

    rank::rank(&mut g, &GraphConfig::default()).unwrap();
    let lo = g.node(cluster).unwrap().min_rank.unwrap();
    let hi = g.node(cluster).unwrap().max_rank.unwrap();
    for v in [x, y, z] {
        let r = g.node(v).unwrap().rank.unwrap();
        assert!(r >= lo && r <= hi, "member escapes the cluster span");
    }
    assert!(g.node(a).unwrap().rank.unwrap() < lo);
    assert!(g.node(tail).unwrap().rank.unwrap() > hi);
}
