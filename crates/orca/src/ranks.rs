//! Rank bookkeeping.
//!
//! Ranks form a doubly linked list over an arena so normalization can splice
//! new label ranks in between neighbors without renumbering everything. The
//! integer rank values on node labels are only rewritten once, by
//! [`RankSequence::compact`].

use crate::model::LayoutGraph;
use orca_graphlib::NodeId;
use rustc_hash::FxHashMap;

/// Handle into the rank arena; stays valid across splices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RankId(pub usize);

#[derive(Debug, Clone, Default)]
pub struct Rank {
    pub nodes: Vec<NodeId>,
    /// Vertical gap between this rank and the next one.
    pub sep_after: f64,
    /// Post-layout vertical extent, filled in by coordinate assignment.
    pub y_top: f64,
    pub y_bottom: f64,
}

#[derive(Debug, Clone)]
struct RankSlot {
    rank: Rank,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct RankSequence {
    slots: Vec<RankSlot>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl RankSequence {
    /// Builds the sequence from already-assigned node ranks. Rank values may
    /// be sparse; one slot is created per distinct value, in value order.
    pub fn from_graph(g: &LayoutGraph, ranksep: f64) -> Self {
        let mut by_value: FxHashMap<i32, Vec<NodeId>> = FxHashMap::default();
        let mut values: Vec<i32> = Vec::new();
        g.for_each_node(|v, label| {
            let Some(r) = label.rank else { return };
            by_value.entry(r).or_insert_with(|| {
                values.push(r);
                Vec::new()
            });
            by_value.get_mut(&r).unwrap().push(v);
        });
        values.sort_unstable();

        let mut seq = RankSequence::default();
        let mut prev: Option<usize> = None;
        for value in values {
            let ix = seq.slots.len();
            seq.slots.push(RankSlot {
                rank: Rank {
                    nodes: by_value.remove(&value).unwrap_or_default(),
                    sep_after: ranksep,
                    y_top: 0.0,
                    y_bottom: 0.0,
                },
                prev,
                next: None,
            });
            match prev {
                Some(p) => seq.slots[p].next = Some(ix),
                None => seq.head = Some(ix),
            }
            prev = Some(ix);
        }
        seq.tail = prev;
        seq
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn first(&self) -> Option<RankId> {
        self.head.map(RankId)
    }

    pub fn next(&self, id: RankId) -> Option<RankId> {
        self.slots[id.0].next.map(RankId)
    }

    pub fn prev(&self, id: RankId) -> Option<RankId> {
        self.slots[id.0].prev.map(RankId)
    }

    pub fn get(&self, id: RankId) -> &Rank {
        &self.slots[id.0].rank
    }

    pub fn get_mut(&mut self, id: RankId) -> &mut Rank {
        &mut self.slots[id.0].rank
    }

    /// Rank ids in top-to-bottom order.
    pub fn iter(&self) -> impl Iterator<Item = RankId> + '_ {
        let mut cur = self.head;
        std::iter::from_fn(move || {
            let ix = cur?;
            cur = self.slots[ix].next;
            Some(RankId(ix))
        })
    }

    /// Slot currently holding the given rank value, resolved through the
    /// node labels (the sequence itself carries no values until `compact`).
    pub fn find_by_value(&self, g: &LayoutGraph, value: i32) -> Option<RankId> {
        self.iter().find(|&id| {
            self.get(id)
                .nodes
                .first()
                .and_then(|&v| g.node(v))
                .and_then(|n| n.rank)
                == Some(value)
        })
    }

    /// Splices a new empty rank after `after`, splitting the separation the
    /// neighbors used to share.
    pub fn insert_after(&mut self, after: RankId, halve_separation: bool) -> RankId {
        let ix = self.slots.len();
        let next = self.slots[after.0].next;
        let sep = if halve_separation {
            let half = self.slots[after.0].rank.sep_after / 2.0;
            self.slots[after.0].rank.sep_after = half;
            half
        } else {
            self.slots[after.0].rank.sep_after
        };
        self.slots.push(RankSlot {
            rank: Rank {
                nodes: Vec::new(),
                sep_after: sep,
                y_top: 0.0,
                y_bottom: 0.0,
            },
            prev: Some(after.0),
            next,
        });
        self.slots[after.0].next = Some(ix);
        match next {
            Some(n) => self.slots[n].prev = Some(ix),
            None => self.tail = Some(ix),
        }
        RankId(ix)
    }

    /// Drops empty ranks and renumbers the rest contiguously from zero,
    /// writing the final value onto every member node.
    pub fn compact(&mut self, g: &mut LayoutGraph) {
        let order: Vec<usize> = self.iter().map(|id| id.0).collect();
        let mut value: i32 = 0;
        let mut prev: Option<usize> = None;
        self.head = None;
        self.tail = None;
        for ix in order {
            if self.slots[ix].rank.nodes.is_empty() {
                // Unlink; its separation folds into the previous rank's gap.
                let sep = self.slots[ix].rank.sep_after;
                if let Some(p) = prev {
                    self.slots[p].rank.sep_after = self.slots[p].rank.sep_after.max(sep);
                }
                self.slots[ix].prev = None;
                self.slots[ix].next = None;
                continue;
            }
            self.slots[ix].prev = prev;
            self.slots[ix].next = None;
            match prev {
                Some(p) => self.slots[p].next = Some(ix),
                None => self.head = Some(ix),
            }
            for &v in &self.slots[ix].rank.nodes {
                if let Some(label) = g.node_mut(v) {
                    label.rank = Some(value);
                }
            }
            prev = Some(ix);
            value += 1;
        }
        self.tail = prev;
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeLabel, new_layout_graph};

    #[test]
    fn splice_and_compact_renumber_contiguously() {
        let mut g = new_layout_graph();
        let a = g.add_node(NodeLabel {
            rank: Some(0),
            ..Default::default()
        });
        let b = g.add_node(NodeLabel {
            rank: Some(2),
            ..Default::default()
        });
        let mut seq = RankSequence::from_graph(&g, 40.0);
        assert_eq!(seq.len(), 2);

        let first = seq.first().unwrap();
        let inserted = seq.insert_after(first, true);
        assert_eq!(seq.get(first).sep_after, 20.0);
        assert_eq!(seq.get(inserted).sep_after, 20.0);

        let mid = g.add_node(NodeLabel::default());
        seq.get_mut(inserted).nodes.push(mid);

        seq.compact(&mut g);
        assert_eq!(g.node(a).unwrap().rank, Some(0));
        assert_eq!(g.node(mid).unwrap().rank, Some(1));
        assert_eq!(g.node(b).unwrap().rank, Some(2));
    }

    #[test]
    fn compact_drops_empty_ranks() {
        let mut g = new_layout_graph();
        let a = g.add_node(NodeLabel {
            rank: Some(0),
            ..Default::default()
        });
        let b = g.add_node(NodeLabel {
            rank: Some(5),
            ..Default::default()
        });
        let mut seq = RankSequence::from_graph(&g, 40.0);
        let first = seq.first().unwrap();
        let extra = seq.insert_after(first, false);
        assert!(seq.get(extra).nodes.is_empty());

        seq.compact(&mut g);
        assert_eq!(seq.len(), 2);
        assert_eq!(g.node(a).unwrap().rank, Some(0));
        assert_eq!(g.node(b).unwrap().rank, Some(1));
    }
}
