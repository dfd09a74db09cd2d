use orca::graphlib::NodeId;
use orca::model::{DummyKind, GraphConfig, active_edges, edge_ends_oriented};
use orca::{EdgeLabel, LabelSize, LayoutGraph, NodeLabel, new_layout_graph, normalize, rank};

fn node(g: &mut LayoutGraph, name: &str) -> NodeId {
    g.add_node(NodeLabel::named(name, 30.0, 30.0))
}

fn assert_unit_spans(g: &LayoutGraph) {
    for e in active_edges(g) {
        let (u, w) = edge_ends_oriented(g, e).unwrap();
        let ru = g.node(u).unwrap().rank.unwrap();
        let rw = g.node(w).unwrap().rank.unwrap();
        assert!(
            (rw - ru).abs() <= 1,
            "edge {u} -> {w} spans {ru}..{rw} after normalization"
        );
    }
}

#[test]
fn every_edge_spans_one_rank_after_normalization() {
    let mut g = new_layout_graph();
    let a = node(&mut g, "a");
    let b = node(&mut g, "b");
    let c = node(&mut g, "c");
    let d = node(&mut g, "d");
    g.add_edge(a, b, EdgeLabel::default());
    g.add_edge(b, c, EdgeLabel::default());
    g.add_edge(c, d, EdgeLabel::default());
    // Skips two ranks and three ranks respectively.
    g.add_edge(b, d, EdgeLabel::default());
    g.add_edge(a, d, EdgeLabel::default());

    let cfg = GraphConfig::default();
    rank::rank(&mut g, &cfg).unwrap();
    normalize::run(&mut g, &cfg);
    assert_unit_spans(&g);
}

#[test]
fn rank_values_are_contiguous_after_compaction() {
    let mut g = new_layout_graph();
    let a = node(&mut g, "a");
    let b = node(&mut g, "b");
    g.add_edge(
        a,
        b,
        EdgeLabel {
            minlen: 5,
            ..Default::default()
        },
    );

    let cfg = GraphConfig::default();
    rank::rank(&mut g, &cfg).unwrap();
    let seq = normalize::run(&mut g, &cfg);

    let mut seen: Vec<i32> = g
        .node_ids()
        .into_iter()
        .filter_map(|v| g.node(v).and_then(|n| n.rank))
        .collect();
    seen.sort_unstable();
    seen.dedup();
    let expected: Vec<i32> = (0..seq.len() as i32).collect();
    assert_eq!(seen, expected, "rank values must be dense from zero");
}

#[test]
fn labelled_long_edge_reserves_its_midpoint_rank() {
    let mut g = new_layout_graph();
    let a = node(&mut g, "a");
    let b = node(&mut g, "b");
    g.add_edge(
        a,
        b,
        EdgeLabel {
            minlen: 2,
            label: Some(LabelSize {
                width: 50.0,
                height: 12.0,
            }),
            ..Default::default()
        },
    );

    let cfg = GraphConfig::default();
    rank::rank(&mut g, &cfg).unwrap();
    normalize::run(&mut g, &cfg);

    let e = g
        .edge_ids()
        .into_iter()
        .find(|&e| g.edge(e).unwrap().chained)
        .expect("carrier is chained");
    let chain = &g.edge(e).unwrap().chain;
    assert_eq!(chain.len(), 1);
    let mid = g.node(chain[0]).unwrap();
    assert_eq!(mid.width, 50.0, "label size lands on the chain node");
    assert_eq!(mid.rank, Some(1));
}

#[test]
fn flat_labelled_edge_parks_a_carrier_below_its_rank() {
    let mut g = new_layout_graph();
    let a = node(&mut g, "a");
    let b = node(&mut g, "b");
    let c = node(&mut g, "c");
    // minlen 0 lets a and b share a rank; c anchors the rank below.
    let flat = g.add_edge(
        a,
        b,
        EdgeLabel {
            minlen: 0,
            label: Some(LabelSize {
                width: 40.0,
                height: 12.0,
            }),
            ..Default::default()
        },
    );
    g.add_edge(a, c, EdgeLabel::default());
    g.add_edge(b, c, EdgeLabel::default());

    let cfg = GraphConfig::default();
    rank::rank(&mut g, &cfg).unwrap();
    assert_eq!(g.node(a).unwrap().rank, g.node(b).unwrap().rank);
    normalize::run(&mut g, &cfg);

    let lbl = g.edge(flat).unwrap();
    assert!(lbl.live_limit, "flat carrier gap must track live widths");
    assert_eq!(lbl.chain.len(), 1);
    let carrier = g.node(lbl.chain[0]).unwrap();
    assert_eq!(carrier.dummy, Some(DummyKind::FlatLabel));
    assert_eq!(carrier.width, 40.0);
    // The rank below holds a real node, so the carrier gets a spliced rank.
    assert_eq!(carrier.rank, Some(g.node(a).unwrap().rank.unwrap() + 1));
    assert_eq!(
        g.node(c).unwrap().rank,
        Some(g.node(a).unwrap().rank.unwrap() + 2)
    );
}

#[test]
fn undo_restores_the_original_topology() {
    let mut g = new_layout_graph();
    let a = node(&mut g, "a");
    let b = node(&mut g, "b");
    let c = node(&mut g, "c");
    g.add_edge(a, b, EdgeLabel::default());
    g.add_edge(b, c, EdgeLabel::default());
    g.add_edge(a, c, EdgeLabel::default());

    let cfg = GraphConfig::default();
    rank::rank(&mut g, &cfg).unwrap();
    normalize::run(&mut g, &cfg);
    normalize::undo(&mut g);

    assert_eq!(g.node_count(), 3);
    assert_eq!(g.edge_count(), 3);
    for e in g.edge_ids() {
        assert!(!g.edge(e).unwrap().chained);
        assert!(g.edge(e).unwrap().segment_of.is_none());
    }
}
