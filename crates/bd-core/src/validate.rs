//! Malformed-input detection.
//!
//! Malformed intervals are dropped and reported; they never abort the run.

use serde::Serialize;
use thiserror::Error;

use crate::input::RecordKind;
use crate::normalize::Forest;
use crate::types::{ContextId, Interval, IntervalId, StateInterval, TimeSpan};

/// Why an input row was dropped.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum MalformedReason {
    #[error("negative duration {duration}")]
    NegativeDuration { duration: i64 },

    #[error("range starting at {start} with duration {duration} ends past the time axis")]
    EndOverflow { start: i64, duration: i64 },

    #[error("root span has non-positive duration {duration}")]
    EmptyRoot { duration: i64 },

    #[error("not contained in ancestor {ancestor_id}")]
    NotContained { ancestor_id: IntervalId },

    #[error("parent chain forms a cycle")]
    ParentCycle,

    #[error("duplicate id within its context")]
    DuplicateId,

    #[error("overlaps thread state {other_id}")]
    Overlaps { other_id: IntervalId },
}

/// A dropped input row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedInterval {
    pub kind: RecordKind,
    pub id: IntervalId,
    pub context: ContextId,
    #[serde(flatten)]
    pub reason: MalformedReason,
}

impl MalformedInterval {
    pub(crate) fn new(
        kind: RecordKind,
        id: IntervalId,
        context: &ContextId,
        reason: MalformedReason,
    ) -> Self {
        tracing::warn!(%kind, id, %context, %reason, "dropping malformed interval");
        Self {
            kind,
            id,
            context: context.clone(),
            reason,
        }
    }
}

/// Reports a span whose end does not fit in an `i64`.
pub(crate) fn end_overflow<T: TimeSpan>(span: &T) -> Option<MalformedReason> {
    span.checked_end().is_none().then(|| MalformedReason::EndOverflow {
        start: span.start(),
        duration: span.duration(),
    })
}

/// Checks one context's slices top-down.
///
/// A slice is dropped when its duration is negative, its end overflows, its
/// id repeats, it sits on a parent cycle, or it escapes the nearest valid
/// ancestor. Descendants
/// of a dropped slice are checked against that same ancestor, and the
/// surviving slices are returned with `parent_id` and `depth` rewritten to
/// skip the dropped ones.
pub fn validate_slices(
    context: &ContextId,
    slices: &[Interval],
) -> (Vec<Interval>, Vec<MalformedInterval>) {
    let forest = Forest::build(slices);
    let nodes = forest.nodes();
    let mut valid = vec![false; nodes.len()];
    let mut anchor: Vec<Option<usize>> = vec![None; nodes.len()];
    let mut malformed = Vec::new();

    for &i in forest.order() {
        let node = &nodes[i];
        anchor[i] = forest
            .parent(i)
            .and_then(|p| if valid[p] { Some(p) } else { anchor[p] });

        let reason = if node.duration < 0 {
            Some(MalformedReason::NegativeDuration {
                duration: node.duration,
            })
        } else if let Some(overflow) = end_overflow(node) {
            Some(overflow)
        } else if forest.is_duplicate(i) {
            Some(MalformedReason::DuplicateId)
        } else {
            anchor[i]
                .filter(|&a| !nodes[a].contains(node))
                .map(|a| MalformedReason::NotContained {
                    ancestor_id: nodes[a].id,
                })
        };

        match reason {
            Some(reason) => {
                malformed.push(MalformedInterval::new(RecordKind::Slice, node.id, context, reason));
            }
            None => valid[i] = true,
        }
    }

    for (i, node) in nodes.iter().enumerate() {
        if !forest.is_reachable(i) {
            malformed.push(MalformedInterval::new(
                RecordKind::Slice,
                node.id,
                context,
                MalformedReason::ParentCycle,
            ));
        }
    }

    (forest.compact(|i, _| valid[i]), malformed)
}

/// Checks one context's thread states, which must be mutually exclusive.
///
/// Returns the surviving states sorted by start. A state overlapping an
/// earlier-starting one is dropped. Zero-width states cover nothing and pass
/// through unchecked.
pub fn validate_states(
    context: &ContextId,
    states: &[StateInterval],
) -> (Vec<StateInterval>, Vec<MalformedInterval>) {
    let mut sorted: Vec<&StateInterval> = states.iter().collect();
    sorted.sort_by_key(|s| (s.start, s.id));

    let mut kept: Vec<StateInterval> = Vec::with_capacity(sorted.len());
    let mut malformed = Vec::new();
    // (end, id) of the last kept state with a positive duration.
    let mut last: Option<(i64, IntervalId)> = None;
    for state in sorted {
        let reason = if state.duration < 0 {
            Some(MalformedReason::NegativeDuration {
                duration: state.duration,
            })
        } else if let Some(overflow) = end_overflow(state) {
            Some(overflow)
        } else if state.duration == 0 {
            None
        } else {
            last.filter(|&(end, _)| end > state.start)
                .map(|(_, other_id)| MalformedReason::Overlaps { other_id })
        };

        match reason {
            Some(reason) => {
                malformed.push(MalformedInterval::new(RecordKind::State, state.id, context, reason));
            }
            None => {
                if state.duration > 0 {
                    last = Some((state.end(), state.id));
                }
                kept.push(state.clone());
            }
        }
    }

    (kept, malformed)
}
