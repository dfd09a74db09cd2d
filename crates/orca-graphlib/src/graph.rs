use crate::{EdgeId, NodeId};
use rustc_hash::FxBuildHasher;

type HashSet<T> = hashbrown::HashSet<T, FxBuildHasher>;

#[derive(Debug, Clone, Copy, Default)]
pub struct GraphOptions {
    /// Allow several edges between the same node pair.
    pub multigraph: bool,
    /// Track a parent/children hierarchy alongside the edge structure.
    pub compound: bool,
}

#[derive(Debug, Clone)]
struct NodeSlot<N> {
    label: Option<N>,
    out_edges: Vec<EdgeId>,
    in_edges: Vec<EdgeId>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl<N> NodeSlot<N> {
    fn new(label: N) -> Self {
        Self {
            label: Some(label),
            out_edges: Vec::new(),
            in_edges: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct EdgeSlot<E> {
    label: Option<E>,
    source: NodeId,
    target: NodeId,
}

/// Directed multigraph backed by node/edge arenas.
///
/// Removal leaves a tombstone so every id handed out stays valid for the
/// lifetime of the graph; iteration skips tombstones in id order, which keeps
/// traversal deterministic.
#[derive(Debug, Clone)]
pub struct Graph<N, E> {
    options: GraphOptions,
    nodes: Vec<NodeSlot<N>>,
    edges: Vec<EdgeSlot<E>>,
    node_count: usize,
    edge_count: usize,
}

impl<N, E> Default for Graph<N, E> {
    fn default() -> Self {
        Self::new(GraphOptions::default())
    }
}

impl<N, E> Graph<N, E> {
    pub fn new(options: GraphOptions) -> Self {
        Self {
            options,
            nodes: Vec::new(),
            edges: Vec::new(),
            node_count: 0,
            edge_count: 0,
        }
    }

    pub fn with_capacity(options: GraphOptions, nodes: usize, edges: usize) -> Self {
        Self {
            options,
            nodes: Vec::with_capacity(nodes),
            edges: Vec::with_capacity(edges),
            node_count: 0,
            edge_count: 0,
        }
    }

    pub fn options(&self) -> GraphOptions {
        self.options
    }

    pub fn is_compound(&self) -> bool {
        self.options.compound
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn add_node(&mut self, label: N) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeSlot::new(label));
        self.node_count += 1;
        id
    }

    pub fn has_node(&self, v: NodeId) -> bool {
        self.nodes
            .get(v.index())
            .is_some_and(|slot| slot.label.is_some())
    }

    pub fn node(&self, v: NodeId) -> Option<&N> {
        self.nodes.get(v.index()).and_then(|s| s.label.as_ref())
    }

    pub fn node_mut(&mut self, v: NodeId) -> Option<&mut N> {
        self.nodes.get_mut(v.index()).and_then(|s| s.label.as_mut())
    }

    /// All live node ids in creation order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.label.is_some())
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    pub fn for_each_node<F>(&self, mut f: F)
    where
        F: FnMut(NodeId, &N),
    {
        for (i, slot) in self.nodes.iter().enumerate() {
            if let Some(label) = &slot.label {
                f(NodeId(i as u32), label);
            }
        }
    }

    pub fn add_edge(&mut self, v: NodeId, w: NodeId, label: E) -> EdgeId {
        debug_assert!(self.has_node(v) && self.has_node(w), "endpoints must exist");
        if !self.options.multigraph {
            debug_assert!(
                self.edge_between(v, w).is_none(),
                "duplicate edge in a non-multigraph"
            );
        }
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(EdgeSlot {
            label: Some(label),
            source: v,
            target: w,
        });
        self.nodes[v.index()].out_edges.push(id);
        self.nodes[w.index()].in_edges.push(id);
        self.edge_count += 1;
        id
    }

    pub fn has_edge(&self, e: EdgeId) -> bool {
        self.edges
            .get(e.index())
            .is_some_and(|slot| slot.label.is_some())
    }

    pub fn edge(&self, e: EdgeId) -> Option<&E> {
        self.edges.get(e.index()).and_then(|s| s.label.as_ref())
    }

    pub fn edge_mut(&mut self, e: EdgeId) -> Option<&mut E> {
        self.edges.get_mut(e.index()).and_then(|s| s.label.as_mut())
    }

    /// Source and target of a live edge.
    pub fn edge_ends(&self, e: EdgeId) -> Option<(NodeId, NodeId)> {
        let slot = self.edges.get(e.index())?;
        slot.label.as_ref()?;
        Some((slot.source, slot.target))
    }

    pub fn source(&self, e: EdgeId) -> Option<NodeId> {
        self.edge_ends(e).map(|(v, _)| v)
    }

    pub fn target(&self, e: EdgeId) -> Option<NodeId> {
        self.edge_ends(e).map(|(_, w)| w)
    }

    /// First live edge from `v` to `w`, if any.
    pub fn edge_between(&self, v: NodeId, w: NodeId) -> Option<EdgeId> {
        let slot = self.nodes.get(v.index())?;
        slot.out_edges
            .iter()
            .copied()
            .find(|&e| self.has_edge(e) && self.edges[e.index()].target == w)
    }

    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, s)| s.label.is_some())
            .map(|(i, _)| EdgeId(i as u32))
            .collect()
    }

    pub fn for_each_edge<F>(&self, mut f: F)
    where
        F: FnMut(EdgeId, NodeId, NodeId, &E),
    {
        for (i, slot) in self.edges.iter().enumerate() {
            if let Some(label) = &slot.label {
                f(EdgeId(i as u32), slot.source, slot.target, label);
            }
        }
    }

    pub fn out_edges(&self, v: NodeId) -> Vec<EdgeId> {
        let Some(slot) = self.nodes.get(v.index()) else {
            return Vec::new();
        };
        slot.out_edges
            .iter()
            .copied()
            .filter(|&e| self.has_edge(e))
            .collect()
    }

    pub fn in_edges(&self, v: NodeId) -> Vec<EdgeId> {
        let Some(slot) = self.nodes.get(v.index()) else {
            return Vec::new();
        };
        slot.in_edges
            .iter()
            .copied()
            .filter(|&e| self.has_edge(e))
            .collect()
    }

    /// Incident edges in both directions, each listed once even for loops.
    pub fn node_edges(&self, v: NodeId) -> Vec<EdgeId> {
        let mut out = self.out_edges(v);
        for e in self.in_edges(v) {
            if self.edges[e.index()].source != v {
                out.push(e);
            }
        }
        out
    }

    pub fn successors(&self, v: NodeId) -> Vec<NodeId> {
        let mut seen: HashSet<NodeId> = HashSet::default();
        let mut out = Vec::new();
        for e in self.out_edges(v) {
            let w = self.edges[e.index()].target;
            if seen.insert(w) {
                out.push(w);
            }
        }
        out
    }

    pub fn predecessors(&self, v: NodeId) -> Vec<NodeId> {
        let mut seen: HashSet<NodeId> = HashSet::default();
        let mut out = Vec::new();
        for e in self.in_edges(v) {
            let u = self.edges[e.index()].source;
            if seen.insert(u) {
                out.push(u);
            }
        }
        out
    }

    pub fn neighbors(&self, v: NodeId) -> Vec<NodeId> {
        let mut seen: HashSet<NodeId> = HashSet::default();
        let mut out = Vec::new();
        for w in self.successors(v).into_iter().chain(self.predecessors(v)) {
            if w != v && seen.insert(w) {
                out.push(w);
            }
        }
        out
    }

    /// Nodes without live incoming edges.
    pub fn sources(&self) -> Vec<NodeId> {
        self.node_ids()
            .into_iter()
            .filter(|&v| self.in_edges(v).is_empty())
            .collect()
    }

    pub fn remove_edge(&mut self, e: EdgeId) -> Option<E> {
        let slot = self.edges.get_mut(e.index())?;
        let label = slot.label.take()?;
        let (v, w) = (slot.source, slot.target);
        self.nodes[v.index()].out_edges.retain(|&x| x != e);
        self.nodes[w.index()].in_edges.retain(|&x| x != e);
        self.edge_count -= 1;
        Some(label)
    }

    /// Removes a node along with its incident edges and hierarchy links.
    pub fn remove_node(&mut self, v: NodeId) -> Option<N> {
        let label = self.nodes.get_mut(v.index())?.label.take()?;
        for e in self.node_edges(v) {
            self.remove_edge(e);
        }
        if self.options.compound {
            if let Some(parent) = self.nodes[v.index()].parent.take() {
                self.nodes[parent.index()].children.retain(|&c| c != v);
            }
            let children = std::mem::take(&mut self.nodes[v.index()].children);
            for c in children {
                self.nodes[c.index()].parent = None;
            }
        }
        self.node_count -= 1;
        Some(label)
    }

    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) {
        debug_assert!(self.options.compound, "set_parent on a non-compound graph");
        debug_assert!(!self.would_create_parent_cycle(child, parent));
        self.clear_parent(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    pub fn clear_parent(&mut self, child: NodeId) {
        if let Some(prev) = self.nodes[child.index()].parent.take() {
            self.nodes[prev.index()].children.retain(|&c| c != child);
        }
    }

    pub fn parent(&self, child: NodeId) -> Option<NodeId> {
        self.nodes.get(child.index()).and_then(|s| s.parent)
    }

    pub fn children(&self, parent: NodeId) -> &[NodeId] {
        self.nodes
            .get(parent.index())
            .map(|s| s.children.as_slice())
            .unwrap_or(&[])
    }

    /// Live nodes with no parent.
    pub fn children_root(&self) -> Vec<NodeId> {
        self.node_ids()
            .into_iter()
            .filter(|&v| self.parent(v).is_none())
            .collect()
    }

    /// Chain of ancestors from `v`'s parent up to the root.
    pub fn ancestors(&self, v: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.parent(v);
        while let Some(p) = cur {
            out.push(p);
            cur = self.parent(p);
        }
        out
    }

    fn would_create_parent_cycle(&self, child: NodeId, parent: NodeId) -> bool {
        let mut cur = Some(parent);
        while let Some(p) = cur {
            if p == child {
                return true;
            }
            cur = self.parent(p);
        }
        false
    }
}
