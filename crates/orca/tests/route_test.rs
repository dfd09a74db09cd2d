use orca::graphlib::NodeId;
use orca::{
    EdgeLabel, GraphConfig, LayoutGraph, NodeLabel, Point, RouteMode, layout, new_layout_graph,
};

fn node(g: &mut LayoutGraph, name: &str) -> NodeId {
    g.add_node(NodeLabel::named(name, 40.0, 20.0))
}

fn edge(g: &mut LayoutGraph, u: NodeId, w: NodeId) {
    g.add_edge(u, w, EdgeLabel::default());
}

fn ortho_config() -> GraphConfig {
    GraphConfig {
        route_mode: RouteMode::Ortho,
        ..GraphConfig::default()
    }
}

fn assert_axis_aligned(points: &[Point]) {
    for pair in points.windows(2) {
        let dx = (pair[1].x - pair[0].x).abs();
        let dy = (pair[1].y - pair[0].y).abs();
        assert!(
            dx < 1e-6 || dy < 1e-6,
            "segment ({}, {}) -> ({}, {}) is not axis aligned",
            pair[0].x,
            pair[0].y,
            pair[1].x,
            pair[1].y
        );
    }
}

#[test]
fn ortho_routes_are_axis_aligned() {
    let mut g = new_layout_graph();
    let a = node(&mut g, "a");
    let b = node(&mut g, "b");
    let c = node(&mut g, "c");
    let d = node(&mut g, "d");
    edge(&mut g, a, b);
    edge(&mut g, a, c);
    edge(&mut g, b, d);
    edge(&mut g, c, d);
    layout(&mut g, &ortho_config()).unwrap();

    for e in g.edge_ids() {
        let lbl = g.edge(e).unwrap();
        assert!(lbl.points.len() >= 2, "ortho edge has no path");
        assert!(lbl.splines.is_empty(), "ortho edges carry no curves");
        assert_axis_aligned(&lbl.points);
    }
}

#[test]
fn ortho_path_avoids_unrelated_nodes() {
    // A skip edge a -> c has to get past b, which the ranker puts between
    // them.
    let mut g = new_layout_graph();
    let a = node(&mut g, "a");
    let b = node(&mut g, "b");
    let c = node(&mut g, "c");
    edge(&mut g, a, b);
    edge(&mut g, b, c);
    edge(&mut g, a, c);
    layout(&mut g, &ortho_config()).unwrap();

    let obstacle = g.node(b).unwrap().rect().unwrap();
    let skip = g
        .edge_ids()
        .into_iter()
        .find(|&e| g.source(e) == Some(a) && g.target(e) == Some(c))
        .unwrap();
    let points = &g.edge(skip).unwrap().points;
    assert_axis_aligned(points);
    for pair in points.windows(2) {
        let mid = pair[0].midpoint(pair[1]);
        assert!(
            !obstacle.contains_with_tolerance(mid, -1e-6),
            "path cuts through node b at ({}, {})",
            mid.x,
            mid.y
        );
    }
}

#[test]
fn spline_endpoints_touch_the_node_borders() {
    let mut g = new_layout_graph();
    let a = node(&mut g, "a");
    let b = node(&mut g, "b");
    edge(&mut g, a, b);
    let cfg = GraphConfig::default();
    layout(&mut g, &cfg).unwrap();

    let e = g.edge_ids()[0];
    let lbl = g.edge(e).unwrap();
    let first = lbl.splines.first().unwrap().p0;
    let last = lbl.splines.last().unwrap().p3;

    let src = g.node(a).unwrap().rect().unwrap();
    let dst = g.node(b).unwrap().rect().unwrap();
    assert!(
        (first.y - src.bottom()).abs() < 1.0,
        "spline should start on the source border, got y = {}",
        first.y
    );
    // The head end is pulled back by the arrowhead.
    let gap = dst.top() - last.y;
    assert!(
        gap >= -1.0 && gap <= cfg.arrow_size + 1.0,
        "spline should stop an arrowhead short of the target, gap = {gap}"
    );
    assert!(lbl.arrows.len() == 1, "one arrowhead at the target");
}

#[test]
fn long_edge_spline_follows_the_chain_corridor() {
    // a -> e crosses three intermediate ranks; the spline must stay inside
    // the drawing and pass through each intermediate band.
    let mut g = new_layout_graph();
    let a = node(&mut g, "a");
    let b = node(&mut g, "b");
    let c = node(&mut g, "c");
    let d = node(&mut g, "d");
    let e = node(&mut g, "e");
    edge(&mut g, a, b);
    edge(&mut g, b, c);
    edge(&mut g, c, d);
    edge(&mut g, d, e);
    edge(&mut g, a, e);
    layout(&mut g, &GraphConfig::default()).unwrap();

    let long = g
        .edge_ids()
        .into_iter()
        .find(|&x| g.source(x) == Some(a) && g.target(x) == Some(e))
        .unwrap();
    let lbl = g.edge(long).unwrap();
    assert!(!lbl.splines.is_empty());

    let bounds = orca::drawing_bounds(&g).unwrap();
    for bez in &lbl.splines {
        for i in 0..=8 {
            let p = bez.eval(i as f64 / 8.0);
            assert!(
                bounds.contains_with_tolerance(p, 1.0),
                "spline leaves the drawing at ({}, {})",
                p.x,
                p.y
            );
        }
    }

    // Monotone in y: the route never doubles back through a rank band.
    let mut last_y = lbl.splines[0].p0.y;
    for bez in &lbl.splines {
        for i in 1..=4 {
            let y = bez.eval(i as f64 / 4.0).y;
            assert!(y >= last_y - 1.0, "spline doubles back vertically");
            last_y = last_y.max(y);
        }
    }
}

#[test]
fn polyline_mode_emits_straight_segments() {
    let mut g = new_layout_graph();
    let a = node(&mut g, "a");
    let b = node(&mut g, "b");
    let c = node(&mut g, "c");
    edge(&mut g, a, b);
    edge(&mut g, b, c);
    edge(&mut g, a, c);
    let cfg = GraphConfig {
        route_mode: RouteMode::Polyline,
        ..GraphConfig::default()
    };
    layout(&mut g, &cfg).unwrap();

    for e in g.edge_ids() {
        let lbl = g.edge(e).unwrap();
        assert!(lbl.points.len() >= 2);
        for bez in &lbl.splines {
            // Each piece is a degenerate cubic on a straight segment.
            let cross = |a: Point, b: Point, c: Point| {
                (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
            };
            assert!(cross(bez.p0, bez.p3, bez.p1).abs() < 1e-6);
            assert!(cross(bez.p0, bez.p3, bez.p2).abs() < 1e-6);
        }
    }
}
