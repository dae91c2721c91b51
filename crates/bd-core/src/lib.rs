//! Interval algebra for exclusive time breakdowns.
//!
//! This crate decomposes root spans (e.g. one app startup per process) into
//! gapless, non-overlapping sub-intervals attributed to a cause:
//! - Normalisation: compacting a slice forest after removing nodes
//! - Clipping: intersecting intervals with root windows per context
//! - Flattening: reducing a nested stack to its innermost-active sequence
//! - Joining: merging the slice and thread-state partitions of a root
//! - Attribution: mapping each joined range to a cause

mod attribution;
mod clip;
mod flatten;
pub mod input;
mod join;
mod normalize;
mod pipeline;
mod summary;
pub mod types;
mod validate;

pub use attribution::{IO_CAUSE, IRQ_CAUSE, attribute_cause};
pub use clip::{Clippable, clip_to_roots};
pub use flatten::flatten_stack;
pub use input::{BreakdownInput, InputError, RecordKind};
pub use join::{Joined, join_exclusive};
pub use normalize::{compact_forest, normalize};
pub use pipeline::{
    Breakdown, BreakdownConfig, BreakdownError, Diagnostics, SliceBreakdown, compute_breakdown,
    flatten_slices,
};
pub use summary::{CauseTotal, RootSummary, summarize};
pub use types::{
    Clipped, ClippedInterval, ContextId, ExclusiveRecord, FlatInterval, Interval, IntervalId,
    RootId, RootSpan, StateInterval, TimeSpan,
};
pub use validate::{MalformedInterval, MalformedReason, validate_slices, validate_states};
