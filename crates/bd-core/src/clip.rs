//! Clipping of intervals against root windows.
//!
//! # Algorithm
//!
//! Within one context, roots and items are both swept in start order. A
//! root becomes active once its start is at or before the item's start and
//! is retired (via a min-heap on end) once its end is at or before it.
//! Overlapping roots for an item are the active ones plus the roots that
//! start strictly inside the item, which are the next ones in start order.
//! Cost is O((k + m) log(k + m)) plus the size of the output.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use crate::types::{Clipped, Interval, RootSpan, StateInterval, TimeSpan};

/// Items that can be truncated to a narrower time range.
pub trait Clippable: TimeSpan + Sized {
    /// Returns a copy covering `[start, end)`.
    fn clipped(&self, start: i64, end: i64) -> Self;
}

impl Clippable for Interval {
    fn clipped(&self, start: i64, end: i64) -> Self {
        Self {
            start,
            duration: end - start,
            ..self.clone()
        }
    }
}

impl Clippable for StateInterval {
    fn clipped(&self, start: i64, end: i64) -> Self {
        Self {
            start,
            duration: end - start,
            ..self.clone()
        }
    }
}

/// Clips `items` against `roots`, all belonging to one context.
///
/// Each item yields one row per overlapping root, truncated to that root and
/// tagged with its id. Rows whose clipped duration would be zero are not
/// produced.
pub fn clip_to_roots<T: Clippable>(roots: &[RootSpan], items: &[T]) -> Vec<Clipped<T>> {
    let mut roots: Vec<&RootSpan> = roots.iter().filter(|r| r.duration > 0).collect();
    roots.sort_by_key(|r| (r.start, r.id));

    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&i| (items[i].start(), i));

    let mut clipped = Vec::new();
    let mut next_root = 0;
    let mut active: BTreeSet<usize> = BTreeSet::new();
    let mut retiring: BinaryHeap<Reverse<(i64, usize)>> = BinaryHeap::new();

    for i in order {
        let item = &items[i];
        let (start, end) = (item.start(), item.end());
        if end <= start {
            continue;
        }

        while let Some(root) = roots.get(next_root).filter(|r| r.start <= start) {
            active.insert(next_root);
            retiring.push(Reverse((root.end(), next_root)));
            next_root += 1;
        }
        while let Some(&Reverse((root_end, r))) = retiring.peek() {
            if root_end > start {
                break;
            }
            retiring.pop();
            active.remove(&r);
        }

        let starting_inside = roots[next_root..].iter().take_while(|r| r.start < end);
        for root in active.iter().map(|&r| roots[r]).chain(starting_inside.copied()) {
            let clip_start = start.max(root.start);
            let clip_end = end.min(root.end());
            if clip_end > clip_start {
                clipped.push(Clipped {
                    root_id: root.id,
                    item: item.clipped(clip_start, clip_end),
                });
            }
        }
    }

    clipped
}
