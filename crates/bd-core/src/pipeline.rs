//! End-to-end breakdown pipeline.
//!
//! Input rows are converted and partitioned by context up front. Each
//! context is then processed independently on a bounded worker pool:
//!
//! 1. validate slices and states, dropping malformed rows
//! 2. normalise the slice forest (remove unlabeled nodes)
//! 3. clip slices and states against the context's roots
//! 4. flatten each root's slice stack
//! 5. join the flattened stack (left) with the thread states (right)
//! 6. attribute a cause to every joined range
//!
//! Results are concatenated in context order and sorted by
//! `(root_id, start)`, so the output never depends on scheduling.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attribution::attribute_cause;
use crate::clip::clip_to_roots;
use crate::flatten::flatten_stack;
use crate::input::{BreakdownInput, InputError, RecordKind};
use crate::join::join_exclusive;
use crate::normalize::normalize;
use crate::types::{
    Clipped, ClippedInterval, ContextId, ExclusiveRecord, FlatInterval, Interval, RootId,
    RootSpan, StateInterval, TimeSpan,
};
use crate::validate::{
    MalformedInterval, MalformedReason, end_overflow, validate_slices, validate_states,
};

/// Configuration for a breakdown run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownConfig {
    /// Worker threads for per-context processing.
    /// Default: `None` (one per CPU).
    pub worker_threads: Option<usize>,

    /// Thread state used where no state interval covers a range.
    /// Default: `"unknown"`.
    pub unknown_state: String,
}

impl Default for BreakdownConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            unknown_state: "unknown".to_string(),
        }
    }
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum BreakdownError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Non-fatal findings collected during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Rows dropped as malformed, ordered by context.
    pub malformed: Vec<MalformedInterval>,
    /// Slices and states whose context has no root span.
    pub unknown_context: usize,
    /// Roots that no slice or state overlapped.
    pub uncovered_roots: usize,
}

/// Result of [`compute_breakdown`].
#[derive(Debug, Clone, Serialize)]
pub struct Breakdown {
    /// Roots with at least one record, ordered by id.
    pub roots: Vec<RootSpan>,
    /// Exclusive records ordered by `(root_id, start)`.
    pub records: Vec<ExclusiveRecord>,
    pub diagnostics: Diagnostics,
}

/// Result of [`flatten_slices`].
#[derive(Debug, Clone, Serialize)]
pub struct SliceBreakdown {
    /// Roots with at least one interval, ordered by id.
    pub roots: Vec<RootSpan>,
    /// Flat intervals ordered by `(root_id, start)`.
    pub intervals: Vec<FlatInterval>,
    pub diagnostics: Diagnostics,
}

/// Everything belonging to one context.
#[derive(Debug)]
struct ContextBatch {
    context: ContextId,
    roots: Vec<RootSpan>,
    slices: Vec<Interval>,
    states: Vec<StateInterval>,
}

/// A root with a contributing interval, flattened and ready to join.
struct RootParts<'a> {
    root: &'a RootSpan,
    flat: Vec<FlatInterval>,
    states: Vec<Clipped<StateInterval>>,
}

impl ContextBatch {
    fn new(context: ContextId) -> Self {
        Self {
            context,
            roots: Vec::new(),
            slices: Vec::new(),
            states: Vec::new(),
        }
    }

    fn decompose(&self) -> (Vec<RootParts<'_>>, Vec<MalformedInterval>) {
        let (slices, mut malformed) = validate_slices(&self.context, &self.slices);
        let slices = normalize(&slices);
        let (states, dropped_states) = validate_states(&self.context, &self.states);
        malformed.extend(dropped_states);

        let mut slices_by_root: HashMap<RootId, Vec<ClippedInterval>> = HashMap::new();
        for clipped in clip_to_roots(&self.roots, &slices) {
            slices_by_root.entry(clipped.root_id).or_default().push(clipped);
        }
        let mut states_by_root: HashMap<RootId, Vec<Clipped<StateInterval>>> = HashMap::new();
        for clipped in clip_to_roots(&self.roots, &states) {
            states_by_root.entry(clipped.root_id).or_default().push(clipped);
        }

        let parts: Vec<RootParts<'_>> = self
            .roots
            .iter()
            .filter_map(|root| {
                let slices = slices_by_root.remove(&root.id).unwrap_or_default();
                let mut states = states_by_root.remove(&root.id).unwrap_or_default();
                if slices.is_empty() && states.is_empty() {
                    return None;
                }
                states.sort_by_key(TimeSpan::start);
                Some(RootParts {
                    root,
                    flat: flatten_stack(root, &slices),
                    states,
                })
            })
            .collect();

        tracing::debug!(
            context = %self.context,
            roots = self.roots.len(),
            covered_roots = parts.len(),
            slices = slices.len(),
            states = states.len(),
            malformed = malformed.len(),
            "processed context"
        );
        (parts, malformed)
    }
}

impl RootParts<'_> {
    fn records(&self, config: &BreakdownConfig) -> Vec<ExclusiveRecord> {
        join_exclusive(&self.flat, &self.states)
            .into_iter()
            .map(|joined| {
                let state = joined.right.map(|s| &s.item);
                let thread_state = state.map_or(config.unknown_state.as_str(), |s| s.state.as_str());
                ExclusiveRecord {
                    root_id: self.root.id,
                    slice_id: joined.left.slice_id,
                    state_id: state.map(|s| s.id),
                    start: joined.start,
                    duration: joined.duration,
                    cause: attribute_cause(
                        joined.left.label.as_deref(),
                        thread_state,
                        state.is_some_and(|s| s.io_wait),
                        state.is_some_and(|s| s.irq_context),
                    ),
                }
            })
            .collect()
    }
}

/// Converts every row (failing fast on shape errors) and groups them by
/// context. Rows in contexts without roots are counted and dropped.
fn partition(input: &BreakdownInput) -> Result<(Vec<ContextBatch>, Diagnostics), InputError> {
    let roots = input
        .roots
        .iter()
        .enumerate()
        .map(|(index, row)| row.to_root(index, RootId(index as u64)))
        .collect::<Result<Vec<_>, _>>()?;
    let slices = input
        .slices
        .iter()
        .enumerate()
        .map(|(index, row)| row.to_interval(index))
        .collect::<Result<Vec<_>, _>>()?;
    let states = input
        .states
        .iter()
        .enumerate()
        .map(|(index, row)| row.to_state(index))
        .collect::<Result<Vec<_>, _>>()?;

    let mut diagnostics = Diagnostics::default();
    let mut batches: BTreeMap<ContextId, ContextBatch> = BTreeMap::new();
    for root in roots {
        let reason = if root.duration <= 0 {
            Some(MalformedReason::EmptyRoot {
                duration: root.duration,
            })
        } else {
            end_overflow(&root)
        };
        if let Some(reason) = reason {
            diagnostics.malformed.push(MalformedInterval::new(
                RecordKind::Root,
                root.source_id,
                &root.context,
                reason,
            ));
            continue;
        }
        batches
            .entry(root.context.clone())
            .or_insert_with(|| ContextBatch::new(root.context.clone()))
            .roots
            .push(root);
    }

    for slice in slices {
        match batches.get_mut(&slice.context) {
            Some(batch) => batch.slices.push(slice),
            None => diagnostics.unknown_context += 1,
        }
    }
    for state in states {
        match batches.get_mut(&state.context) {
            Some(batch) => batch.states.push(state),
            None => diagnostics.unknown_context += 1,
        }
    }
    if diagnostics.unknown_context > 0 {
        tracing::debug!(
            count = diagnostics.unknown_context,
            "ignoring intervals in contexts without root spans"
        );
    }

    Ok((batches.into_values().collect(), diagnostics))
}

fn worker_pool(config: &BreakdownConfig) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = config.worker_threads {
        builder = builder.num_threads(threads);
    }
    builder.build()
}

/// Runs every context on the worker pool, turning each covered root into
/// output rows with `per_root`.
fn run_contexts<T, F>(
    input: &BreakdownInput,
    config: &BreakdownConfig,
    per_root: F,
) -> Result<(Vec<RootSpan>, Vec<T>, Diagnostics), BreakdownError>
where
    T: Send,
    F: Fn(&RootParts<'_>) -> Vec<T> + Sync,
{
    let (batches, mut diagnostics) = partition(input)?;
    let total_roots: usize = batches.iter().map(|b| b.roots.len()).sum();
    tracing::debug!(contexts = batches.len(), roots = total_roots, "starting breakdown");

    let pool = worker_pool(config)?;
    let outputs: Vec<_> = pool.install(|| {
        batches
            .par_iter()
            .map(|batch| {
                let (parts, malformed) = batch.decompose();
                let roots: Vec<RootSpan> = parts.iter().map(|p| p.root.clone()).collect();
                let rows: Vec<T> = parts.iter().flat_map(&per_root).collect();
                (roots, rows, malformed)
            })
            .collect()
    });

    let mut roots = Vec::new();
    let mut rows = Vec::new();
    for (batch_roots, batch_rows, malformed) in outputs {
        roots.extend(batch_roots);
        rows.extend(batch_rows);
        diagnostics.malformed.extend(malformed);
    }
    roots.sort_by_key(|r| r.id);
    diagnostics.uncovered_roots = total_roots - roots.len();

    Ok((roots, rows, diagnostics))
}

/// Decomposes every root into exclusive, attributed records.
pub fn compute_breakdown(
    input: &BreakdownInput,
    config: &BreakdownConfig,
) -> Result<Breakdown, BreakdownError> {
    let (roots, mut records, diagnostics) =
        run_contexts(input, config, |parts| parts.records(config))?;
    records.sort_by_key(|r| (r.root_id, r.start));

    tracing::debug!(
        roots = roots.len(),
        records = records.len(),
        malformed = diagnostics.malformed.len(),
        "breakdown complete"
    );
    Ok(Breakdown {
        roots,
        records,
        diagnostics,
    })
}

/// Computes only the flattened slice stack of every root.
pub fn flatten_slices(
    input: &BreakdownInput,
    config: &BreakdownConfig,
) -> Result<SliceBreakdown, BreakdownError> {
    let (roots, mut intervals, diagnostics) =
        run_contexts(input, config, |parts| parts.flat.clone())?;
    intervals.sort_by_key(|f| (f.root_id, f.start));

    Ok(SliceBreakdown {
        roots,
        intervals,
        diagnostics,
    })
}
