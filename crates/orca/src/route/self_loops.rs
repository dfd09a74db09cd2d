//! Self-loop routing.
//!
//! Loops never enter the general routers. Before coordinate assignment each
//! node reserves enough right-side margin for its loop arcs (and their
//! labels); after placement the arcs are emitted directly.

use super::spline;
use crate::geom::Point;
use crate::model::{GraphConfig, LayoutGraph, PortSide};
use orca_graphlib::{EdgeId, NodeId};

/// Per-loop horizontal footprint, label excluded.
fn arc_width(cfg: &GraphConfig) -> f64 {
    cfg.edgesep * 2.0
}

fn loops_of(g: &LayoutGraph, v: NodeId) -> Vec<EdgeId> {
    g.out_edges(v)
        .into_iter()
        .filter(|&e| {
            g.edge(e).is_some_and(|l| l.self_loop) && g.edge_ends(e) == Some((v, v))
        })
        .collect()
}

/// Side the edge is pinned to at `v`, if any. Ports are stored in caller
/// orientation, matching the stored edge ends.
fn pinned_side(g: &LayoutGraph, e: EdgeId, v: NodeId) -> Option<PortSide> {
    let (u, w) = g.edge_ends(e)?;
    let lbl = g.edge(e)?;
    let port = if u == v {
        lbl.tail_port
    } else if w == v {
        lbl.head_port
    } else {
        None
    };
    port.and_then(|p| p.side)
}

/// Widens `self_margins` so loop arcs and side-pinned edge fans have room.
/// Runs before coordinate assignment; the separation chains then account for
/// the space.
pub(crate) fn expand_margins(g: &mut LayoutGraph, cfg: &GraphConfig) {
    for v in g.node_ids() {
        let loops = loops_of(g, v);
        let mut loop_extent = 0.0;
        for e in &loops {
            loop_extent += arc_width(cfg);
            if let Some(l) = g.edge(*e).and_then(|l| l.label) {
                loop_extent += l.width;
            }
        }

        // Several edges pinned to one side fan out along it; every lane past
        // the first needs its own slot.
        let mut fan = [0usize; 4];
        for e in g.node_edges(v) {
            if g.edge(e).is_none_or(|l| l.self_loop) {
                continue;
            }
            if let Some(side) = pinned_side(g, e, v) {
                let slot = match side {
                    PortSide::North => 0,
                    PortSide::South => 1,
                    PortSide::East => 2,
                    PortSide::West => 3,
                };
                fan[slot] += 1;
            }
        }
        let lane = |count: usize| count.saturating_sub(1) as f64 * cfg.edgesep;

        if loop_extent == 0.0 && fan.iter().all(|&c| c < 2) {
            continue;
        }
        if let Some(n) = g.node_mut(v) {
            n.self_margins.right += loop_extent + lane(fan[2]);
            n.self_margins.left += lane(fan[3]);
            n.self_margins.top += lane(fan[0]);
            n.self_margins.bottom += lane(fan[1]);
        }
    }
}

/// Emits the arc geometry once the node has its final position.
pub(crate) fn route(g: &mut LayoutGraph, cfg: &GraphConfig) {
    for v in g.node_ids() {
        let loops = loops_of(g, v);
        if loops.is_empty() {
            continue;
        }
        let Some(rect) = g.node(v).and_then(|n| n.rect()) else {
            continue;
        };
        let mut offset = 0.0;
        for e in loops {
            let label = g.edge(e).and_then(|l| l.label);
            offset += arc_width(cfg) + label.map(|l| l.width).unwrap_or(0.0);
            let far = rect.right() + offset;
            let top = Point::new(rect.right(), rect.y - rect.height / 4.0);
            let bottom = Point::new(rect.right(), rect.y + rect.height / 4.0);
            let pts = [
                top,
                Point::new(far, top.y),
                Point::new(far, bottom.y),
                bottom,
            ];
            if let Some(lbl) = g.edge_mut(e) {
                lbl.points = pts.to_vec();
                lbl.splines = spline::fit(&pts);
                if label.is_some() {
                    lbl.label_pos = Some(Point::new(far, rect.y));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeLabel, NodeLabel, Port, SideMargins, new_layout_graph};

    #[test]
    fn margins_and_arcs_for_two_loops() {
        let mut g = new_layout_graph();
        let mut n = NodeLabel::named("a", 40.0, 20.0);
        n.x = Some(0.0);
        n.y = Some(0.0);
        let a = g.add_node(n);
        let e1 = g.add_edge(
            a,
            a,
            EdgeLabel {
                self_loop: true,
                ..Default::default()
            },
        );
        let e2 = g.add_edge(
            a,
            a,
            EdgeLabel {
                self_loop: true,
                ..Default::default()
            },
        );

        let cfg = GraphConfig::default();
        expand_margins(&mut g, &cfg);
        assert_eq!(g.node(a).unwrap().self_margins.right, 4.0 * cfg.edgesep);

        route(&mut g, &cfg);
        let p1 = &g.edge(e1).unwrap().points;
        let p2 = &g.edge(e2).unwrap().points;
        assert_eq!(p1.len(), 4);
        assert!(p2[1].x > p1[1].x, "second arc sits outside the first");
        assert!(p1.iter().all(|p| p.x >= 20.0), "arcs stay right of the node");
    }

    #[test]
    fn side_pinned_fan_reserves_extra_lanes() {
        let mut g = new_layout_graph();
        let a = g.add_node(NodeLabel::named("a", 40.0, 20.0));
        for i in 0..3 {
            let k = g.add_node(NodeLabel::named(&format!("k{i}"), 20.0, 20.0));
            g.add_edge(
                a,
                k,
                EdgeLabel {
                    tail_port: Some(Port {
                        dx: 0.0,
                        side: Some(PortSide::East),
                    }),
                    ..Default::default()
                },
            );
        }

        let cfg = GraphConfig::default();
        expand_margins(&mut g, &cfg);

        // Three edges share the east side: two lanes beyond the first.
        let m = g.node(a).unwrap().self_margins;
        assert_eq!(m.right, 2.0 * cfg.edgesep);
        assert_eq!(m.left, 0.0);
        assert_eq!(m.top, 0.0);
    }

    #[test]
    fn single_pinned_edge_needs_no_margin() {
        let mut g = new_layout_graph();
        let a = g.add_node(NodeLabel::named("a", 40.0, 20.0));
        let b = g.add_node(NodeLabel::named("b", 20.0, 20.0));
        g.add_edge(
            a,
            b,
            EdgeLabel {
                head_port: Some(Port {
                    dx: 0.0,
                    side: Some(PortSide::West),
                }),
                ..Default::default()
            },
        );

        expand_margins(&mut g, &GraphConfig::default());
        assert_eq!(g.node(b).unwrap().self_margins, SideMargins::default());
    }
}
