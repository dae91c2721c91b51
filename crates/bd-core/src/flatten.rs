//! Flattening of a nested interval stack into its innermost-active sequence.
//!
//! # Algorithm
//!
//! 1. Emit a start and an end event per interval, sorted by time with ends
//!    ordered before starts at equal timestamps.
//! 2. Apply every event sharing a timestamp, keeping the active set ordered
//!    by `(depth, open order)`.
//! 3. The winner is the last entry of the active set: the deepest interval,
//!    and among equal depths the most recently opened one.
//! 4. Whenever the winner changes, close the current flat interval at the
//!    event time and open a new one.
//!
//! Gaps with nothing active become unlabeled flat intervals, so the output
//! always covers the whole root.

use std::collections::BTreeSet;

use crate::types::{ClippedInterval, FlatInterval, RootSpan, TimeSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventKind {
    End,
    Start,
}

/// Active-set key: depth first, then the order in which intervals opened.
type ActiveKey = (u32, usize, usize);

/// Flattens the clipped intervals of `root` into gapless, non-overlapping
/// flat intervals covering `[root.start, root.end)`.
///
/// Intervals owned by a different root, or with no duration, are ignored.
pub fn flatten_stack(root: &RootSpan, intervals: &[ClippedInterval]) -> Vec<FlatInterval> {
    let mut events: Vec<(i64, EventKind, u32, i64, usize)> = Vec::with_capacity(intervals.len() * 2);
    for (i, clipped) in intervals.iter().enumerate() {
        if clipped.root_id != root.id || clipped.duration() <= 0 {
            continue;
        }
        let slice = &clipped.item;
        events.push((clipped.start(), EventKind::Start, slice.depth, slice.id, i));
        events.push((clipped.end(), EventKind::End, slice.depth, slice.id, i));
    }
    events.sort_unstable();

    let mut open: Vec<Option<ActiveKey>> = vec![None; intervals.len()];
    let mut active: BTreeSet<ActiveKey> = BTreeSet::new();
    let mut opened = 0usize;

    let mut flat = Vec::new();
    let mut cursor = root.start;
    let mut current: Option<usize> = None;

    let mut pending = events.as_slice();
    while let Some(&(time, ..)) = pending.first() {
        let batch_len = pending.iter().take_while(|e| e.0 == time).count();
        let (batch, rest) = pending.split_at(batch_len);
        pending = rest;

        for &(_, kind, depth, _, i) in batch {
            match kind {
                EventKind::Start => {
                    let key = (depth, opened, i);
                    opened += 1;
                    active.insert(key);
                    open[i] = Some(key);
                }
                EventKind::End => {
                    if let Some(key) = open[i].take() {
                        active.remove(&key);
                    }
                }
            }
        }

        let winner = active.last().map(|&(_, _, i)| i);
        if winner != current {
            if time > cursor {
                flat.push(flat_interval(root, intervals, cursor, time, current));
                cursor = time;
            }
            current = winner;
        }
    }

    if cursor < root.end() {
        flat.push(flat_interval(root, intervals, cursor, root.end(), current));
    }
    flat
}

fn flat_interval(
    root: &RootSpan,
    intervals: &[ClippedInterval],
    start: i64,
    end: i64,
    winner: Option<usize>,
) -> FlatInterval {
    let slice = winner.map(|i| &intervals[i].item);
    FlatInterval {
        root_id: root.id,
        start,
        duration: end - start,
        slice_id: slice.map(|s| s.id),
        label: slice.and_then(|s| s.label.clone()),
        depth: slice.map(|s| s.depth),
    }
}
