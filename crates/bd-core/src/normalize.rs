//! Tree compaction: remove nodes from an interval forest and reattach their
//! children to the nearest surviving ancestor.
//!
//! The forest is held as an arena of nodes with parent indices. Nodes are
//! visited parents-first, so each node's nearest surviving ancestor is
//! resolved in O(1) from its parent's already-resolved answer.

use std::collections::{HashMap, VecDeque};

use crate::types::{Interval, IntervalId};

/// Arena view over one context's intervals.
pub(crate) struct Forest<'a> {
    nodes: &'a [Interval],
    index: HashMap<IntervalId, usize>,
    parent: Vec<Option<usize>>,
    /// Reachable nodes, parents before children.
    order: Vec<usize>,
    reachable: Vec<bool>,
}

impl<'a> Forest<'a> {
    /// Builds the arena. A `parent_id` that names no node in `nodes` makes
    /// its child a forest root; nodes on a parent cycle are unreachable.
    pub(crate) fn build(nodes: &'a [Interval]) -> Self {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            index.entry(node.id).or_insert(i);
        }

        let parent: Vec<Option<usize>> = nodes
            .iter()
            .map(|node| node.parent_id.and_then(|p| index.get(&p).copied()))
            .collect();

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        let mut queue = VecDeque::new();
        for (i, p) in parent.iter().enumerate() {
            match p {
                Some(p) => children[*p].push(i),
                None => queue.push_back(i),
            }
        }

        let mut order = Vec::with_capacity(nodes.len());
        let mut reachable = vec![false; nodes.len()];
        while let Some(i) = queue.pop_front() {
            reachable[i] = true;
            order.push(i);
            queue.extend(children[i].iter().copied());
        }

        Self {
            nodes,
            index,
            parent,
            order,
            reachable,
        }
    }

    pub(crate) fn nodes(&self) -> &'a [Interval] {
        self.nodes
    }

    /// Reachable node indices, parents before children.
    pub(crate) fn order(&self) -> &[usize] {
        &self.order
    }

    pub(crate) fn parent(&self, i: usize) -> Option<usize> {
        self.parent[i]
    }

    pub(crate) fn is_reachable(&self, i: usize) -> bool {
        self.reachable[i]
    }

    /// True when `i` is not the first node carrying its id.
    pub(crate) fn is_duplicate(&self, i: usize) -> bool {
        self.index.get(&self.nodes[i].id) != Some(&i)
    }

    /// Keeps the nodes accepted by `keep`, rewriting `parent_id` to the
    /// nearest kept ancestor and `depth` to the number of kept ancestors.
    ///
    /// Output preserves input order. Unreachable nodes are dropped.
    pub(crate) fn compact(&self, mut keep: impl FnMut(usize, &Interval) -> bool) -> Vec<Interval> {
        let n = self.nodes.len();
        let mut kept = vec![false; n];
        let mut anchor: Vec<Option<usize>> = vec![None; n];
        let mut depth = vec![0u32; n];

        for &i in &self.order {
            kept[i] = keep(i, &self.nodes[i]);
            anchor[i] = self
                .parent(i)
                .and_then(|p| if kept[p] { Some(p) } else { anchor[p] });
            depth[i] = anchor[i].map_or(0, |a| depth[a] + 1);
        }

        self.nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| kept[*i])
            .map(|(i, node)| Interval {
                parent_id: anchor[i].map(|a| self.nodes[a].id),
                depth: depth[i],
                ..node.clone()
            })
            .collect()
    }
}

/// Compacts a forest, keeping only the nodes accepted by `keep`.
///
/// Children of removed nodes are never dropped; they are reattached to the
/// nearest surviving ancestor, or become roots if there is none.
pub fn compact_forest(nodes: &[Interval], keep: impl Fn(&Interval) -> bool) -> Vec<Interval> {
    let forest = Forest::build(nodes);
    let unreachable = nodes.len() - forest.order().len();
    if unreachable > 0 {
        tracing::warn!(unreachable, "dropping intervals on a parent cycle");
    }
    forest.compact(|_, node| keep(node))
}

/// Removes null-labeled intervals and reparents their children.
pub fn normalize(nodes: &[Interval]) -> Vec<Interval> {
    compact_forest(nodes, |node| node.label.is_some())
}
