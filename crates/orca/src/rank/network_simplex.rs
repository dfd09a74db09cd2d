//! Network simplex over a compact constraint graph.
//!
//! The solver is shared by rank assignment and X-coordinate assignment: both
//! reduce to "give every node an integer value minimizing
//! `sum(weight * (value(w) - value(v)))` subject to
//! `value(w) - value(v) >= minlen` per edge". Nodes and edges are plain
//! indices into flat arrays; callers build the constraint graph and map the
//! solution back onto their own structures.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct SimplexEdge {
    pub v: usize,
    pub w: usize,
    pub weight: f64,
    pub minlen: i32,
}

impl SimplexEdge {
    pub fn new(v: usize, w: usize, weight: f64, minlen: i32) -> Self {
        Self {
            v,
            w,
            weight,
            minlen,
        }
    }
}

#[derive(Debug)]
struct State<'a> {
    edges: &'a [SimplexEdge],
    out_adj: Vec<Vec<usize>>,
    in_adj: Vec<Vec<usize>>,

    rank: Vec<i32>,
    comp: Vec<usize>,

    // Spanning-tree bookkeeping. `tree_edge[v]` is the graph edge linking `v`
    // to `parent[v]`.
    parent: Vec<Option<usize>>,
    tree_edge: Vec<Option<usize>>,
    in_tree_edge: Vec<bool>,
    low: Vec<i32>,
    lim: Vec<i32>,
    cut: Vec<f64>,
    children: Vec<Vec<usize>>,
}

/// Solves the constraint graph, returning one integer value per node.
///
/// The oriented graph must be acyclic; a cycle means the minlen constraints
/// contradict each other and is reported as a fatal error. `nslimit` caps the
/// number of pivots; when exhausted the current feasible solution is returned
/// as-is.
pub fn solve(node_count: usize, edges: &[SimplexEdge], nslimit: usize) -> Result<Vec<i32>> {
    if node_count == 0 {
        return Ok(Vec::new());
    }

    let mut st = State {
        edges,
        out_adj: vec![Vec::new(); node_count],
        in_adj: vec![Vec::new(); node_count],
        rank: vec![0; node_count],
        comp: vec![usize::MAX; node_count],
        parent: vec![None; node_count],
        tree_edge: vec![None; node_count],
        in_tree_edge: vec![false; edges.len()],
        low: vec![0; node_count],
        lim: vec![0; node_count],
        cut: vec![0.0; node_count],
        children: vec![Vec::new(); node_count],
    };
    for (ix, e) in edges.iter().enumerate() {
        st.out_adj[e.v].push(ix);
        st.in_adj[e.w].push(ix);
    }

    st.init_ranks(node_count)?;
    st.assign_components(node_count);

    let comps = st.comp.iter().copied().max().map(|m| m + 1).unwrap_or(0);
    for c in 0..comps {
        let members: Vec<usize> = (0..node_count).filter(|&v| st.comp[v] == c).collect();
        st.feasible_tree(&members)?;
        st.rebuild_tree_meta(&members);

        let mut pivots = 0usize;
        while pivots < nslimit {
            let Some(leave) = st.leave_edge(&members) else {
                break;
            };
            let Some(enter) = st.enter_edge(leave) else {
                // No admissible replacement; the tree is optimal for this cut.
                break;
            };
            st.exchange(&members, leave, enter);
            st.rebuild_tree_meta(&members);
            pivots += 1;
        }

        st.normalize(&members);
    }

    Ok(st.rank)
}

impl<'a> State<'a> {
    fn slack(&self, eix: usize) -> i32 {
        let e = &self.edges[eix];
        self.rank[e.w] - self.rank[e.v] - e.minlen
    }

    /// Longest-path initial ranks via Kahn ordering. A residual cycle at this
    /// point is a genuine constraint contradiction.
    fn init_ranks(&mut self, node_count: usize) -> Result<()> {
        let mut indegree = vec![0usize; node_count];
        for e in self.edges {
            indegree[e.w] += 1;
        }
        let mut queue: Vec<usize> = (0..node_count).filter(|&v| indegree[v] == 0).collect();
        let mut seen = 0usize;
        let mut head = 0usize;
        while head < queue.len() {
            let v = queue[head];
            head += 1;
            seen += 1;
            for &eix in &self.out_adj[v] {
                let e = &self.edges[eix];
                self.rank[e.w] = self.rank[e.w].max(self.rank[v] + e.minlen);
                indegree[e.w] -= 1;
                if indegree[e.w] == 0 {
                    queue.push(e.w);
                }
            }
        }
        if seen != node_count {
            return Err(Error::InfeasibleRanking {
                context: "constraint graph contains a cycle".to_string(),
            });
        }
        Ok(())
    }

    fn assign_components(&mut self, node_count: usize) {
        let mut next = 0usize;
        let mut stack: Vec<usize> = Vec::new();
        for start in 0..node_count {
            if self.comp[start] != usize::MAX {
                continue;
            }
            self.comp[start] = next;
            stack.push(start);
            while let Some(v) = stack.pop() {
                for &eix in self.out_adj[v].iter().chain(self.in_adj[v].iter()) {
                    let e = &self.edges[eix];
                    let other = if e.v == v { e.w } else { e.v };
                    if self.comp[other] == usize::MAX {
                        self.comp[other] = next;
                        stack.push(other);
                    }
                }
            }
            next += 1;
        }
    }

    /// Greedy tight-tree growth: keep absorbing zero-slack edges; when stuck,
    /// shift the tree by the minimum slack of any edge crossing it.
    fn feasible_tree(&mut self, members: &[usize]) -> Result<()> {
        let Some(&start) = members.first() else {
            return Ok(());
        };
        for &v in members {
            self.parent[v] = None;
            self.tree_edge[v] = None;
        }
        let mut in_tree = vec![false; self.rank.len()];
        in_tree[start] = true;
        let mut tree_size = 1usize;

        loop {
            // Absorb all reachable tight edges.
            let mut grew = true;
            while grew {
                grew = false;
                for &v in members {
                    if !in_tree[v] {
                        continue;
                    }
                    for &eix in self.out_adj[v].iter().chain(self.in_adj[v].iter()) {
                        let e = &self.edges[eix];
                        let other = if e.v == v { e.w } else { e.v };
                        if in_tree[other] || self.slack(eix) != 0 {
                            continue;
                        }
                        in_tree[other] = true;
                        self.parent[other] = Some(v);
                        self.tree_edge[other] = Some(eix);
                        tree_size += 1;
                        grew = true;
                    }
                }
            }
            if tree_size >= members.len() {
                break;
            }

            // Minimum-slack edge with exactly one end in the tree.
            let mut best: Option<(i32, usize)> = None;
            for &v in members {
                for &eix in &self.out_adj[v] {
                    let e = &self.edges[eix];
                    if in_tree[e.v] == in_tree[e.w] {
                        continue;
                    }
                    let s = self.slack(eix);
                    match best {
                        Some((bs, _)) if s >= bs => {}
                        _ => best = Some((s, eix)),
                    }
                }
            }
            let Some((slack, eix)) = best else {
                return Err(Error::InfeasibleRanking {
                    context: "could not grow a feasible spanning tree".to_string(),
                });
            };
            let delta = if in_tree[self.edges[eix].v] {
                slack
            } else {
                -slack
            };
            for &v in members {
                if in_tree[v] {
                    self.rank[v] += delta;
                }
            }
        }
        Ok(())
    }

    /// Recomputes low/lim, children lists, and cut values for one component's
    /// tree. Runs after construction and after every exchange.
    fn rebuild_tree_meta(&mut self, members: &[usize]) {
        for &v in members {
            self.children[v].clear();
            self.cut[v] = 0.0;
        }
        for &v in members {
            if let Some(p) = self.parent[v] {
                self.children[p].push(v);
            }
        }
        for flag in self.in_tree_edge.iter_mut() {
            *flag = false;
        }
        for &v in members {
            if let Some(eix) = self.tree_edge[v] {
                self.in_tree_edge[eix] = true;
            }
        }

        let root = members
            .iter()
            .copied()
            .find(|&v| self.parent[v].is_none())
            .unwrap_or(members[0]);

        // Iterative DFS for low/lim and a postorder for cut values.
        let mut next_lim: i32 = 1;
        let mut postorder: Vec<usize> = Vec::with_capacity(members.len());
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        self.low[root] = next_lim;
        while let Some(&mut (v, ref mut child_ix)) = stack.last_mut() {
            if let Some(&c) = self.children[v].get(*child_ix) {
                *child_ix += 1;
                self.low[c] = next_lim;
                stack.push((c, 0));
                continue;
            }
            self.lim[v] = next_lim;
            next_lim += 1;
            postorder.push(v);
            stack.pop();
        }

        for &child in &postorder {
            let Some(eix) = self.tree_edge[child] else {
                continue;
            };
            self.cut[child] = self.calc_cut_value(child, eix);
        }
    }

    /// Cut value of the tree edge above `child`, using the already-computed
    /// cut values of `child`'s own tree children (postorder invariant).
    fn calc_cut_value(&self, child: usize, tree_eix: usize) -> f64 {
        let child_is_tail = self.edges[tree_eix].v == child;
        let mut cut = self.edges[tree_eix].weight;
        let out_sign: f64 = if child_is_tail { 1.0 } else { -1.0 };

        for &eix in &self.out_adj[child] {
            if eix == tree_eix {
                continue;
            }
            let other = self.edges[eix].w;
            cut += out_sign * self.edges[eix].weight;
            if self.parent[other] == Some(child) && self.tree_edge[other] == Some(eix) {
                cut -= out_sign * self.cut[other];
            }
        }
        for &eix in &self.in_adj[child] {
            if eix == tree_eix {
                continue;
            }
            let other = self.edges[eix].v;
            cut -= out_sign * self.edges[eix].weight;
            if self.parent[other] == Some(child) && self.tree_edge[other] == Some(eix) {
                cut += out_sign * self.cut[other];
            }
        }
        cut
    }

    /// First tree edge with a negative cut value, as the child node carrying
    /// it.
    fn leave_edge(&self, members: &[usize]) -> Option<usize> {
        members
            .iter()
            .copied()
            .find(|&v| self.tree_edge[v].is_some() && self.cut[v] < -1e-9)
    }

    fn in_subtree(&self, v: usize, root: usize) -> bool {
        self.low[root] <= self.lim[v] && self.lim[v] <= self.lim[root]
    }

    /// Minimum-slack non-tree edge crossing the cut the opposite way.
    fn enter_edge(&self, leave_child: usize) -> Option<usize> {
        let tree_eix = self.tree_edge[leave_child]?;
        let child_is_tail = self.edges[tree_eix].v == leave_child;

        let mut best: Option<(i32, usize)> = None;
        for (eix, e) in self.edges.iter().enumerate() {
            if self.in_tree_edge[eix] {
                continue;
            }
            if self.comp[e.v] != self.comp[leave_child] {
                continue;
            }
            let v_in = self.in_subtree(e.v, leave_child);
            let w_in = self.in_subtree(e.w, leave_child);
            // If the leaving edge points out of the subtree, the entering one
            // must point into it, and vice versa.
            let crosses_back = if child_is_tail {
                !v_in && w_in
            } else {
                v_in && !w_in
            };
            if !crosses_back {
                continue;
            }
            let s = self.slack(eix);
            match best {
                Some((bs, _)) if s >= bs => {}
                _ => best = Some((s, eix)),
            }
        }
        best.map(|(_, eix)| eix)
    }

    fn exchange(&mut self, members: &[usize], leave_child: usize, enter_eix: usize) {
        let delta = self.slack(enter_eix);
        if delta != 0 {
            let child_is_tail = self.edges[self.tree_edge[leave_child].unwrap()].v == leave_child;
            // The entering edge points into the subtree when the leaving one
            // points out of it; shrink the subtree's ranks until it is tight.
            let shift = if child_is_tail { -delta } else { delta };
            for &v in members {
                if self.in_subtree(v, leave_child) {
                    self.rank[v] += shift;
                }
            }
        }

        // Re-root the subtree path so the entering edge becomes the tree link.
        let e = self.edges[enter_eix];
        let (outside, inside) = if self.in_subtree(e.w, leave_child) {
            (e.v, e.w)
        } else {
            (e.w, e.v)
        };

        let mut prev = outside;
        let mut prev_edge = enter_eix;
        let mut cur = inside;
        loop {
            let old_parent = self.parent[cur];
            let old_edge = self.tree_edge[cur];
            self.parent[cur] = Some(prev);
            self.tree_edge[cur] = Some(prev_edge);
            if cur == leave_child {
                break;
            }
            let (Some(p), Some(pe)) = (old_parent, old_edge) else {
                break;
            };
            prev = cur;
            prev_edge = pe;
            cur = p;
        }
    }

    fn normalize(&mut self, members: &[usize]) {
        let Some(min) = members.iter().map(|&v| self.rank[v]).min() else {
            return;
        };
        for &v in members {
            self.rank[v] -= min;
        }
    }
}
