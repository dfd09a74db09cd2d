//! Orthogonal maze routing.
//!
//! The drawing plane is cut into a rectilinear grid at every node boundary
//! coordinate; cells covered by a node are blocked, the rest form a
//! visibility graph connected in the four cardinal directions. Each edge is
//! routed by best-first search minimizing bends first and length second,
//! with ties going to the path closer to the source centroid. Overlapping
//! vertical runs of different edges are separated per channel afterwards.

use crate::geom::{Point, Rect, intersect_rect};
use crate::model::{GraphConfig, LayoutGraph, is_cluster};
use orca_graphlib::{EdgeId, NodeId};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::warn;

const BEND_PENALTY: f64 = 1000.0;

pub(crate) struct Grid {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// blocked[row][col], row-major over cell interiors.
    blocked: Vec<Vec<bool>>,
}

impl Grid {
    pub fn build(g: &LayoutGraph) -> Grid {
        let mut xs: Vec<f64> = Vec::new();
        let mut ys: Vec<f64> = Vec::new();
        let mut rects: Vec<Rect> = Vec::new();
        for v in g.node_ids() {
            if is_cluster(g, v) {
                continue;
            }
            let Some(rect) = g.node(v).and_then(|n| n.rect()) else {
                continue;
            };
            xs.push(rect.left());
            xs.push(rect.right());
            ys.push(rect.top());
            ys.push(rect.bottom());
            rects.push(rect);
        }
        // Open border around the whole drawing.
        if let Some(total) = rects
            .iter()
            .copied()
            .reduce(|a, b| a.union(&b))
            .map(|r| r.expand(40.0))
        {
            xs.push(total.left());
            xs.push(total.right());
            ys.push(total.top());
            ys.push(total.bottom());
        }
        dedup_sorted(&mut xs);
        dedup_sorted(&mut ys);

        let cols = xs.len().saturating_sub(1);
        let rows = ys.len().saturating_sub(1);
        let mut blocked = vec![vec![false; cols]; rows];
        for (r, row) in blocked.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                let center = Point::new((xs[c] + xs[c + 1]) / 2.0, (ys[r] + ys[r + 1]) / 2.0);
                *cell = rects.iter().any(|n| n.contains(center));
            }
        }
        Grid { xs, ys, blocked }
    }

    fn cols(&self) -> usize {
        self.xs.len().saturating_sub(1)
    }

    fn rows(&self) -> usize {
        self.ys.len().saturating_sub(1)
    }

    fn center(&self, cell: (usize, usize)) -> Point {
        let (r, c) = cell;
        Point::new(
            (self.xs[c] + self.xs[c + 1]) / 2.0,
            (self.ys[r] + self.ys[r + 1]) / 2.0,
        )
    }

    fn cell_at(&self, p: Point) -> Option<(usize, usize)> {
        let c = self.xs.windows(2).position(|w| p.x >= w[0] && p.x <= w[1])?;
        let r = self.ys.windows(2).position(|w| p.y >= w[0] && p.y <= w[1])?;
        Some((r, c))
    }

    fn is_free(&self, cell: (usize, usize)) -> bool {
        !self.blocked[cell.0][cell.1]
    }

    /// Free cells sharing a border with the node's footprint.
    fn boundary_cells(&self, rect: Rect) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for r in 0..self.rows() {
            for c in 0..self.cols() {
                if self.blocked[r][c] {
                    continue;
                }
                let cell = Rect::from_bounds(self.xs[c], self.ys[r], self.xs[c + 1], self.ys[r + 1]);
                let grown = cell.expand(1e-6);
                if grown.intersects(&rect) {
                    out.push((r, c));
                }
            }
        }
        out
    }
}

fn dedup_sorted(vals: &mut Vec<f64>) {
    vals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    vals.dedup_by(|a, b| (*a - *b).abs() < 1e-6);
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum Dir {
    None,
    Horizontal,
    Vertical,
}

struct Frontier {
    cost: f64,
    tie: f64,
    cell: (usize, usize),
    dir: Dir,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.tie == other.tie
    }
}
impl Eq for Frontier {}
impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Frontier {
    // Min-heap on (cost, tie) through reversal.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.tie.partial_cmp(&self.tie).unwrap_or(Ordering::Equal))
    }
}

/// Best-first path over free cells from any source boundary cell to any
/// target boundary cell. Returns cell-center waypoints.
fn search(
    grid: &Grid,
    starts: &[(usize, usize)],
    goals: &[(usize, usize)],
    source_centroid: Point,
) -> Option<Vec<Point>> {
    if starts.is_empty() || goals.is_empty() {
        return None;
    }
    let goal_pts: Vec<Point> = goals.iter().map(|&g| grid.center(g)).collect();
    let heuristic = |cell: (usize, usize), dir: Dir| -> f64 {
        let p = grid.center(cell);
        goal_pts
            .iter()
            .map(|g| {
                let len = (g.x - p.x).abs() + (g.y - p.y).abs();
                let aligned_h = (g.y - p.y).abs() < 1e-9;
                let aligned_v = (g.x - p.x).abs() < 1e-9;
                let bends = if aligned_h && aligned_v {
                    0.0
                } else if aligned_h {
                    if dir == Dir::Vertical { 1.0 } else { 0.0 }
                } else if aligned_v {
                    if dir == Dir::Horizontal { 1.0 } else { 0.0 }
                } else {
                    1.0
                };
                len + bends * BEND_PENALTY
            })
            .fold(f64::INFINITY, f64::min)
    };

    let mut best: FxHashMap<((usize, usize), Dir), f64> = FxHashMap::default();
    let mut came: FxHashMap<((usize, usize), Dir), ((usize, usize), Dir)> = FxHashMap::default();
    let mut heap: BinaryHeap<Frontier> = BinaryHeap::new();
    let goal_set: Vec<(usize, usize)> = goals.to_vec();

    for &s in starts {
        best.insert((s, Dir::None), 0.0);
        heap.push(Frontier {
            cost: heuristic(s, Dir::None),
            tie: grid.center(s).distance(source_centroid),
            cell: s,
            dir: Dir::None,
        });
    }

    while let Some(Frontier { cell, dir, .. }) = heap.pop() {
        let g_here = *best.get(&(cell, dir)).unwrap_or(&f64::INFINITY);
        if goal_set.contains(&cell) {
            return Some(reconstruct(grid, &came, (cell, dir)));
        }
        let (r, c) = cell;
        let steps: [(isize, isize, Dir); 4] = [
            (0, -1, Dir::Horizontal),
            (0, 1, Dir::Horizontal),
            (-1, 0, Dir::Vertical),
            (1, 0, Dir::Vertical),
        ];
        for (dr, dc, ndir) in steps {
            let nr = r as isize + dr;
            let nc = c as isize + dc;
            if nr < 0 || nc < 0 || nr as usize >= grid.rows() || nc as usize >= grid.cols() {
                continue;
            }
            let next = (nr as usize, nc as usize);
            if !grid.is_free(next) {
                continue;
            }
            let step_len = grid.center(cell).distance(grid.center(next));
            let bend = if dir != Dir::None && dir != ndir { 1.0 } else { 0.0 };
            let g_next = g_here + step_len + bend * BEND_PENALTY;
            let slot = best.entry((next, ndir)).or_insert(f64::INFINITY);
            if g_next < *slot {
                *slot = g_next;
                came.insert((next, ndir), (cell, dir));
                heap.push(Frontier {
                    cost: g_next + heuristic(next, ndir),
                    tie: grid.center(next).distance(source_centroid),
                    cell: next,
                    dir: ndir,
                });
            }
        }
    }
    None
}

fn reconstruct(
    grid: &Grid,
    came: &FxHashMap<((usize, usize), Dir), ((usize, usize), Dir)>,
    mut state: ((usize, usize), Dir),
) -> Vec<Point> {
    let mut cells = vec![state.0];
    while let Some(&prev) = came.get(&state) {
        cells.push(prev.0);
        state = prev;
    }
    cells.reverse();
    cells.into_iter().map(|c| grid.center(c)).collect()
}

/// Snaps a cell-center path to alternating horizontal/vertical segments and
/// drops collinear interior points.
fn rectify(points: Vec<Point>) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if let (Some(&a), Some(&b)) = (
            out.len().checked_sub(2).and_then(|i| out.get(i)),
            out.last(),
        ) {
            let collinear = ((a.x - b.x).abs() < 1e-6 && (b.x - p.x).abs() < 1e-6)
                || ((a.y - b.y).abs() < 1e-6 && (b.y - p.y).abs() < 1e-6);
            if collinear {
                *out.last_mut().expect("checked above") = p;
                continue;
            }
        }
        out.push(p);
    }
    out
}

/// Routes one edge; the label guide waypoint, when present, is visited in
/// order by chaining two searches.
pub(crate) fn route_edge(
    grid: &Grid,
    g: &LayoutGraph,
    e: EdgeId,
    u: NodeId,
    w: NodeId,
) -> Option<Vec<Point>> {
    let ur = g.node(u)?.rect()?;
    let wr = g.node(w)?.rect()?;
    let starts = grid.boundary_cells(ur);
    let goals = grid.boundary_cells(wr);
    let centroid = ur.center();

    let guide = g.edge(e).and_then(|l| l.label_pos);
    let mut path = match guide.and_then(|p| grid.cell_at(p)).filter(|&c| grid.is_free(c)) {
        Some(via) => {
            let first = search(grid, &starts, &[via], centroid)?;
            let second = search(grid, &[via], &goals, centroid)?;
            let mut joined = first;
            joined.extend(second.into_iter().skip(1));
            joined
        }
        None => search(grid, &starts, &goals, centroid)?,
    };

    // Orthogonal attachment stubs at both real endpoints.
    let first = *path.first()?;
    let start = ur.center();
    if (first.x - start.x).abs() > 1e-6 && (first.y - start.y).abs() > 1e-6 {
        path.insert(0, Point::new(start.x, first.y));
    }
    path.insert(0, start);
    let last = *path.last()?;
    let end = wr.center();
    if (last.x - end.x).abs() > 1e-6 && (last.y - end.y).abs() > 1e-6 {
        path.push(Point::new(end.x, last.y));
    }
    path.push(end);
    Some(rectify(path))
}

/// Spreads vertical runs of different edges sharing one X channel evenly
/// apart, in first-seen order.
pub(crate) fn separate_channels(paths: &mut [(EdgeId, Vec<Point>)], edgesep: f64) {
    let mut channels: FxHashMap<i64, Vec<(usize, usize)>> = FxHashMap::default();
    for (pi, (_, pts)) in paths.iter().enumerate() {
        for si in 0..pts.len().saturating_sub(1) {
            let (a, b) = (pts[si], pts[si + 1]);
            if (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() > 1e-6 {
                channels
                    .entry((a.x * 16.0).round() as i64)
                    .or_default()
                    .push((pi, si));
            }
        }
    }
    for (_, segs) in channels {
        if segs.len() < 2 {
            continue;
        }
        let k = segs.len() as f64;
        for (slot, (pi, si)) in segs.into_iter().enumerate() {
            let shift = (slot as f64 - (k - 1.0) / 2.0) * edgesep;
            let pts = &mut paths[pi].1;
            pts[si].x += shift;
            pts[si + 1].x += shift;
        }
    }
}

pub(crate) fn run(g: &mut LayoutGraph, cfg: &GraphConfig) {
    let grid = Grid::build(g);
    let mut routed: Vec<(EdgeId, Vec<Point>)> = Vec::new();
    for e in g.edge_ids() {
        let Some(lbl) = g.edge(e) else { continue };
        if lbl.self_loop || lbl.merged_into.is_some() || lbl.segment_of.is_some() {
            continue;
        }
        let Some((u, w)) = g.edge_ends(e) else {
            continue;
        };
        match route_edge(&grid, g, e, u, w) {
            Some(path) => routed.push((e, path)),
            None => {
                warn!(edge = %e, "no orthogonal path, falling back to a straight segment");
                let ends = (
                    g.node(u).and_then(|n| n.rect()),
                    g.node(w).and_then(|n| n.rect()),
                );
                if let (Some(ur), Some(wr)) = ends {
                    // Straight segment clipped to both borders up front.
                    let a = intersect_rect(ur, wr.center()).unwrap_or(ur.center());
                    let b = intersect_rect(wr, ur.center()).unwrap_or(wr.center());
                    routed.push((e, vec![a, b]));
                }
            }
        }
    }
    separate_channels(&mut routed, cfg.edgesep);
    for (e, path) in routed {
        if let Some(lbl) = g.edge_mut(e) {
            lbl.points = path;
            lbl.splines.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeLabel, NodeLabel, new_layout_graph};

    fn node_at(g: &mut LayoutGraph, name: &str, x: f64, y: f64) -> NodeId {
        let mut n = NodeLabel::named(name, 20.0, 20.0);
        n.x = Some(x);
        n.y = Some(y);
        g.add_node(n)
    }

    #[test]
    fn route_avoids_an_obstacle_between_endpoints() {
        let mut g = new_layout_graph();
        let a = node_at(&mut g, "a", 0.0, 0.0);
        let b = node_at(&mut g, "b", 200.0, 0.0);
        let blocker = node_at(&mut g, "x", 100.0, 0.0);
        g.add_edge(a, b, EdgeLabel::default());

        let grid = Grid::build(&g);
        let e = g.edge_ids()[0];
        let path = route_edge(&grid, &g, e, a, b).expect("path exists");

        let obstacle = g.node(blocker).unwrap().rect().unwrap();
        for w in path.windows(2) {
            let mid = w[0].midpoint(w[1]);
            assert!(
                !obstacle.contains_with_tolerance(mid, -1e-6),
                "{mid:?} runs through the obstacle"
            );
            // Segments are axis-aligned.
            assert!(
                (w[0].x - w[1].x).abs() < 1e-6 || (w[0].y - w[1].y).abs() < 1e-6,
                "segment {w:?} is not orthogonal"
            );
        }
    }

    #[test]
    fn channel_separation_spreads_overlapping_runs() {
        let mut paths = vec![
            (
                EdgeId(0),
                vec![
                    Point::new(10.0, 0.0),
                    Point::new(10.0, 50.0),
                ],
            ),
            (
                EdgeId(1),
                vec![
                    Point::new(10.0, 10.0),
                    Point::new(10.0, 60.0),
                ],
            ),
        ];
        separate_channels(&mut paths, 8.0);
        assert!((paths[0].1[0].x - paths[1].1[0].x).abs() >= 8.0 - 1e-9);
    }
}
