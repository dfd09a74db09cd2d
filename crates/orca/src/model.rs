//! Layout attributes carried on the working graph.
//!
//! The pipeline works on one mutable `Graph<NodeLabel, EdgeLabel>` (compound,
//! multigraph). Real nodes come from the caller; virtual nodes are created by
//! normalization and routing and removed again before the result is read.

use crate::geom::{Point, Rect};
use orca_graphlib::{EdgeId, Graph, GraphOptions, NodeId};
use serde::Serialize;
use std::collections::BTreeMap;

pub type LayoutGraph = Graph<NodeLabel, EdgeLabel>;

/// Fresh working graph with the options every pipeline stage expects.
pub fn new_layout_graph() -> LayoutGraph {
    Graph::new(GraphOptions {
        multigraph: true,
        compound: true,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DummyKind {
    /// Segment of a multi-rank edge chain.
    Edge,
    /// Chain segment that also carries the edge label.
    EdgeLabel,
    /// Carrier for a flat (same-rank) edge label.
    FlatLabel,
    /// Cluster border column, one node per occupied rank.
    BorderLeft,
    BorderRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LabelSize {
    pub width: f64,
    pub height: f64,
}

/// Extra space reserved on each side of a node by the self-loop / port
/// expansion step, before the general routers run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SideMargins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PortSide {
    North,
    South,
    East,
    West,
}

/// Attachment point of an edge end, relative to the node center.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Port {
    /// Horizontal offset from the node center.
    pub dx: f64,
    /// Side the edge must leave/enter through, when constrained.
    pub side: Option<PortSide>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeLabel {
    /// Caller-facing name; virtual nodes have none.
    pub name: Option<String>,
    pub width: f64,
    pub height: f64,
    /// Extra separation this node demands on top of the global `nodesep`.
    pub margin: f64,

    pub rank: Option<i32>,
    pub order: Option<usize>,
    pub x: Option<f64>,
    pub y: Option<f64>,

    pub dummy: Option<DummyKind>,
    /// Owning edge for chain/label virtual nodes.
    #[serde(skip)]
    pub edge: Option<EdgeId>,

    /// Reserved by the self-loop/port expansion step.
    pub self_margins: SideMargins,

    // Cluster-only fields (a node is a cluster when it has children).
    pub min_rank: Option<i32>,
    pub max_rank: Option<i32>,
    pub label_size: Option<LabelSize>,
    #[serde(skip)]
    pub border_left: Vec<NodeId>,
    #[serde(skip)]
    pub border_right: Vec<NodeId>,
    /// Final bounding border, written at the end of the pipeline.
    pub bounds: Option<Rect>,

    /// Caller-attached metadata, passed through untouched.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl NodeLabel {
    pub fn named(name: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            name: Some(name.into()),
            width,
            height,
            ..Default::default()
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.dummy.is_some()
    }

    /// Half extent along X, including the self-loop margin on that side.
    pub fn half_width_left(&self) -> f64 {
        self.width / 2.0 + self.self_margins.left
    }

    pub fn half_width_right(&self) -> f64 {
        self.width / 2.0 + self.self_margins.right
    }

    pub fn rect(&self) -> Option<Rect> {
        Some(Rect::new(self.x?, self.y?, self.width, self.height))
    }
}

/// Anchor and direction for one arrowhead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Arrow {
    pub anchor: Point,
    pub dir: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeLabel {
    pub weight: f64,
    /// Minimum rank span ("limit").
    pub minlen: i32,
    pub label: Option<LabelSize>,

    pub tail_port: Option<Port>,
    pub head_port: Option<Port>,

    /// Orientation was flipped by acyclic preprocessing; geometry is written
    /// back in the original direction.
    pub reversed: bool,
    /// Self-loop, handled by the dedicated loop router.
    pub self_loop: bool,
    /// Folded into a parallel carrier; skipped by every stage until output.
    #[serde(skip)]
    pub merged_into: Option<EdgeId>,
    /// Edges merged into this carrier.
    #[serde(skip)]
    pub parallel: Vec<EdgeId>,
    /// Replaced by a chain of virtual nodes; skipped until the chain is
    /// folded back.
    pub chained: bool,
    /// Chain of virtual nodes standing in for this edge, top to bottom.
    #[serde(skip)]
    pub chain: Vec<NodeId>,
    /// Synthetic one-rank segment belonging to a chained edge.
    #[serde(skip)]
    pub segment_of: Option<EdgeId>,
    /// Flat edge whose required span tracks the two endpoints' live widths.
    pub live_limit: bool,

    // Output geometry.
    pub points: Vec<Point>,
    #[serde(skip)]
    pub splines: Vec<crate::geom::Bezier>,
    pub label_pos: Option<Point>,
    pub arrows: Vec<Arrow>,

    /// Caller-attached metadata, passed through untouched.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl Default for EdgeLabel {
    fn default() -> Self {
        Self {
            weight: 1.0,
            minlen: 1,
            label: None,
            tail_port: None,
            head_port: None,
            reversed: false,
            self_loop: false,
            merged_into: None,
            parallel: Vec::new(),
            chained: false,
            chain: Vec::new(),
            segment_of: None,
            live_limit: false,
            points: Vec::new(),
            splines: Vec::new(),
            label_pos: None,
            arrows: Vec::new(),
            extras: BTreeMap::new(),
        }
    }
}

impl EdgeLabel {
    /// Whether any stage between preprocessing and output should look at this
    /// edge at all.
    pub fn is_active(&self) -> bool {
        !self.self_loop && self.merged_into.is_none() && !self.chained
    }

    /// Aggregate weight over this carrier's parallel set (sum).
    pub fn effective_weight(&self, g: &LayoutGraph) -> f64 {
        let mut w = self.weight;
        for &e in &self.parallel {
            if let Some(lbl) = g.edge(e) {
                w += lbl.weight;
            }
        }
        w
    }

    /// Aggregate minlen over this carrier's parallel set (max).
    pub fn effective_minlen(&self, g: &LayoutGraph) -> i32 {
        let mut m = self.minlen;
        for &e in &self.parallel {
            if let Some(lbl) = g.edge(e) {
                m = m.max(lbl.minlen);
            }
        }
        m
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RouteMode {
    /// Single straight segment per edge.
    Line,
    /// Corner-to-corner segments through the box chain.
    Polyline,
    #[default]
    Spline,
    /// Orthogonal maze routing over the visibility grid.
    Ortho,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphConfig {
    /// Minimum horizontal gap between adjacent nodes on a rank.
    pub nodesep: f64,
    /// Vertical gap between consecutive ranks.
    pub ranksep: f64,
    /// Gap between parallel edges and around self-loops.
    pub edgesep: f64,
    /// Padding between a cluster border and its members.
    pub cluster_margin: f64,
    /// Network-simplex pivot budget; `None` derives one from the node count.
    pub nslimit: Option<usize>,
    /// Hard cap on crossing-minimization sweeps.
    pub order_iterations: usize,
    pub route_mode: RouteMode,
    /// Arrowhead length reserved at the head end of routed edges.
    pub arrow_size: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            nodesep: 50.0,
            ranksep: 50.0,
            edgesep: 10.0,
            cluster_margin: 8.0,
            nslimit: None,
            order_iterations: 24,
            route_mode: RouteMode::default(),
            arrow_size: 9.0,
        }
    }
}

/// Shape-specific predicates supplied by the caller; the engine only ever
/// sees shapes through this capability.
pub trait NodeShape {
    /// Point-in-shape test within the node's placed rectangle.
    fn contains(&self, rect: Rect, p: Point) -> bool;

    /// Smallest outer extent that fits the given inner box.
    fn minimum_size(&self, inner: (f64, f64)) -> (f64, f64) {
        inner
    }
}

/// Default shape: the node's full rectangle.
#[derive(Debug, Clone, Copy, Default)]
pub struct RectShape;

impl NodeShape for RectShape {
    fn contains(&self, rect: Rect, p: Point) -> bool {
        rect.contains(p)
    }
}

/// Source of per-node shapes for clipping.
pub trait ShapeRegistry {
    fn shape_of(&self, v: NodeId) -> &dyn NodeShape;
}

/// Every node is a rectangle.
#[derive(Debug, Clone, Copy, Default)]
pub struct RectShapes;

impl ShapeRegistry for RectShapes {
    fn shape_of(&self, _v: NodeId) -> &dyn NodeShape {
        &RectShape
    }
}

/// Endpoints of an edge in layout orientation: reversed edges point the way
/// the acyclic pass turned them, not the way the caller drew them.
pub fn edge_ends_oriented(g: &LayoutGraph, e: EdgeId) -> Option<(NodeId, NodeId)> {
    let (v, w) = g.edge_ends(e)?;
    if g.edge(e).is_some_and(|lbl| lbl.reversed) {
        Some((w, v))
    } else {
        Some((v, w))
    }
}

/// Visits every active edge leaving `v` in layout orientation.
pub fn for_each_out_oriented<F>(g: &LayoutGraph, v: NodeId, mut f: F)
where
    F: FnMut(EdgeId, NodeId),
{
    for e in g.out_edges(v) {
        let Some(lbl) = g.edge(e) else { continue };
        if !lbl.is_active() || lbl.reversed {
            continue;
        }
        if let Some(w) = g.target(e) {
            f(e, w);
        }
    }
    for e in g.in_edges(v) {
        let Some(lbl) = g.edge(e) else { continue };
        if !lbl.is_active() || !lbl.reversed {
            continue;
        }
        if let Some(u) = g.source(e) {
            f(e, u);
        }
    }
}

/// Visits every active edge entering `v` in layout orientation.
pub fn for_each_in_oriented<F>(g: &LayoutGraph, v: NodeId, mut f: F)
where
    F: FnMut(EdgeId, NodeId),
{
    for e in g.in_edges(v) {
        let Some(lbl) = g.edge(e) else { continue };
        if !lbl.is_active() || lbl.reversed {
            continue;
        }
        if let Some(u) = g.source(e) {
            f(e, u);
        }
    }
    for e in g.out_edges(v) {
        let Some(lbl) = g.edge(e) else { continue };
        if !lbl.is_active() || !lbl.reversed {
            continue;
        }
        if let Some(w) = g.target(e) {
            f(e, w);
        }
    }
}

/// All active edge ids, in id order.
pub fn active_edges(g: &LayoutGraph) -> Vec<EdgeId> {
    g.edge_ids()
        .into_iter()
        .filter(|&e| g.edge(e).is_some_and(|lbl| lbl.is_active()))
        .collect()
}

/// True when `v` has children, i.e. acts as a cluster.
pub fn is_cluster(g: &LayoutGraph, v: NodeId) -> bool {
    !g.children(v).is_empty()
}

/// Cluster ids in post-order (innermost first), deterministic in id order.
pub fn clusters_postorder(g: &LayoutGraph) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<(NodeId, bool)> = g
        .children_root()
        .into_iter()
        .rev()
        .filter(|&v| is_cluster(g, v))
        .map(|v| (v, false))
        .collect();
    while let Some((v, expanded)) = stack.pop() {
        if expanded {
            out.push(v);
            continue;
        }
        stack.push((v, true));
        for &c in g.children(v).iter().rev() {
            if is_cluster(g, c) {
                stack.push((c, false));
            }
        }
    }
    out
}
