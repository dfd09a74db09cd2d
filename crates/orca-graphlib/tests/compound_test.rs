use orca_graphlib::{Graph, GraphOptions, NodeId};

fn compound() -> Graph<&'static str, i32> {
    Graph::new(GraphOptions {
        multigraph: true,
        compound: true,
    })
}

#[test]
fn adjacency_tracks_edge_removal() {
    let mut g = compound();
    let a = g.add_node("a");
    let b = g.add_node("b");
    let c = g.add_node("c");
    let ab = g.add_edge(a, b, 1);
    g.add_edge(a, c, 2);
    g.add_edge(b, c, 3);

    assert_eq!(g.successors(a), vec![b, c]);
    assert_eq!(g.predecessors(c), vec![a, b]);

    g.remove_edge(ab);
    assert_eq!(g.successors(a), vec![c]);
    assert_eq!(g.in_edges(b), Vec::new());
    assert_eq!(g.edge_count(), 2);
}

#[test]
fn removing_a_cluster_releases_its_children() {
    let mut g = compound();
    let cluster = g.add_node("cluster");
    let x = g.add_node("x");
    let y = g.add_node("y");
    g.set_parent(x, cluster);
    g.set_parent(y, cluster);
    assert_eq!(g.ancestors(x), vec![cluster]);

    g.remove_node(cluster);
    assert_eq!(g.parent(x), None);
    assert_eq!(g.parent(y), None);
    assert_eq!(g.children_root(), vec![x, y]);
}

#[test]
fn nested_ancestor_chain_is_root_last() {
    let mut g = compound();
    let outer = g.add_node("outer");
    let inner = g.add_node("inner");
    let leaf = g.add_node("leaf");
    g.set_parent(inner, outer);
    g.set_parent(leaf, inner);
    assert_eq!(g.ancestors(leaf), vec![inner, outer]);
    assert_eq!(g.children(outer), &[inner]);
}

#[test]
fn self_loops_are_listed_once() {
    let mut g = compound();
    let a = g.add_node("a");
    let e = g.add_edge(a, a, 0);
    assert_eq!(g.node_edges(a), vec![e]);
    assert_eq!(g.neighbors(a), Vec::<NodeId>::new());
}

#[test]
fn sources_ignore_dead_edges() {
    let mut g = compound();
    let a = g.add_node("a");
    let b = g.add_node("b");
    let e = g.add_edge(a, b, 0);
    assert_eq!(g.sources(), vec![a]);
    g.remove_edge(e);
    assert_eq!(g.sources(), vec![a, b]);
}
