//! Property-based tests for the interval algebra.
//!
//! Generated inputs are always well-formed: slice forests are properly
//! nested and thread states never overlap, so every property below must hold
//! with no malformed diagnostics.

use std::collections::HashMap;

use bd_core::input::{RootRow, SliceRow, StateRow};
use bd_core::{
    Breakdown, BreakdownConfig, BreakdownInput, ContextId, FlatInterval, Interval, RootId,
    StateInterval, TimeSpan, compute_breakdown, join_exclusive, normalize,
};
use proptest::prelude::*;

/// A slice before placement; offsets are relative to the previous sibling.
#[derive(Debug, Clone)]
struct Node {
    gap: i64,
    len: i64,
    labeled: bool,
    children: Vec<Node>,
}

fn node_strategy() -> impl Strategy<Value = Node> {
    let leaf = (0..20_i64, 1..80_i64, any::<bool>()).prop_map(|(gap, len, labeled)| Node {
        gap,
        len,
        labeled,
        children: Vec::new(),
    });
    leaf.prop_recursive(4, 48, 4, |inner| {
        (
            0..20_i64,
            1..80_i64,
            any::<bool>(),
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(gap, len, labeled, children)| Node {
                gap,
                len,
                labeled,
                children,
            })
    })
}

fn forest_strategy() -> impl Strategy<Value = Vec<Node>> {
    prop::collection::vec(node_strategy(), 0..6)
}

/// `(gap, len, io_wait, irq_context)` per state; zero-width states included.
fn states_strategy() -> impl Strategy<Value = Vec<(i64, i64, bool, bool)>> {
    prop::collection::vec((0..10_i64, 0..40_i64, any::<bool>(), any::<bool>()), 0..30)
}

fn context(name: &str) -> ContextId {
    ContextId::new(name).unwrap()
}

/// Lays `nodes` out left to right inside `[lo, hi)`, squeezing children into
/// their parent so the forest is properly nested.
fn place(
    nodes: &[Node],
    ctx: &ContextId,
    parent: Option<i64>,
    (lo, hi): (i64, i64),
    next_id: &mut i64,
    out: &mut Vec<Interval>,
) {
    let mut t = lo;
    for node in nodes {
        t += node.gap;
        let end = (t + node.len).min(hi);
        if end <= t {
            break;
        }
        let id = *next_id;
        *next_id += 1;
        out.push(Interval {
            id,
            context: ctx.clone(),
            start: t,
            duration: end - t,
            label: node.labeled.then(|| format!("f{}", id % 5)),
            parent_id: parent,
            depth: 0,
        });
        place(&node.children, ctx, Some(id), (t, end), next_id, out);
        t = end;
    }
}

fn lay_out_states(
    states: &[(i64, i64, bool, bool)],
    ctx: &ContextId,
    lo: i64,
    next_id: &mut i64,
) -> Vec<StateInterval> {
    let mut t = lo;
    states
        .iter()
        .map(|&(gap, len, io_wait, irq_context)| {
            t += gap;
            let state = StateInterval {
                id: *next_id,
                context: ctx.clone(),
                start: t,
                duration: len,
                state: if io_wait { "D" } else { "Running" }.to_string(),
                io_wait,
                irq_context,
            };
            *next_id += 1;
            t += len;
            state
        })
        .collect()
}

/// Well-formed multi-context input plus the typed rows it was built from.
struct Generated {
    input: BreakdownInput,
    slices: HashMap<i64, Interval>,
    states: HashMap<i64, StateInterval>,
}

fn generate(contexts: &[(Vec<Node>, Vec<(i64, i64, bool, bool)>)]) -> Generated {
    let mut input = BreakdownInput::default();
    let mut slices = HashMap::new();
    let mut states = HashMap::new();
    let mut next_id = 1;

    for (c, (forest, state_specs)) in (0_i64..).zip(contexts) {
        let name = format!("T{c}");
        let ctx = context(&name);
        for (offset, (start, duration)) in [(0, 150), (120, 300)].into_iter().enumerate() {
            input.roots.push(RootRow {
                id: Some(c * 10 + i64::try_from(offset).unwrap()),
                context: Some(name.as_str().into()),
                start: Some(start),
                duration: Some(duration),
            });
        }

        let mut laid = Vec::new();
        place(forest, &ctx, None, (-30, 450), &mut next_id, &mut laid);
        for slice in laid {
            input.slices.push(SliceRow {
                id: Some(slice.id),
                context: Some(name.as_str().into()),
                parent_id: slice.parent_id,
                depth: None,
                start: Some(slice.start),
                duration: Some(slice.duration),
                label: slice.label.clone(),
            });
            slices.insert(slice.id, slice);
        }

        for state in lay_out_states(state_specs, &ctx, -10, &mut next_id) {
            input.states.push(StateRow {
                id: Some(state.id),
                context: Some(name.as_str().into()),
                start: Some(state.start),
                duration: Some(state.duration),
                state: Some(state.state.clone()),
                io_wait: state.io_wait,
                irq_context: state.irq_context,
            });
            states.insert(state.id, state);
        }
    }

    Generated {
        input,
        slices,
        states,
    }
}

fn breakdown(input: &BreakdownInput, threads: usize) -> Breakdown {
    compute_breakdown(
        input,
        &BreakdownConfig {
            worker_threads: Some(threads),
            ..BreakdownConfig::default()
        },
    )
    .unwrap()
}

fn check_coverage(breakdown: &Breakdown) -> Result<(), TestCaseError> {
    for root in &breakdown.roots {
        let records: Vec<_> = breakdown
            .records
            .iter()
            .filter(|r| r.root_id == root.id)
            .collect();
        prop_assert_eq!(records.first().map(|r| r.start), Some(root.start));
        prop_assert_eq!(records.last().map(|r| r.end()), Some(root.end()));
        for pair in records.windows(2) {
            prop_assert_eq!(pair[0].end(), pair[1].start, "root {} not gapless", root.id);
        }
        prop_assert!(records.iter().all(|r| r.duration > 0));
    }
    Ok(())
}

fn check_clipping(breakdown: &Breakdown, generated: &Generated) -> Result<(), TestCaseError> {
    let roots: HashMap<RootId, _> = breakdown.roots.iter().map(|r| (r.id, r)).collect();
    for record in &breakdown.records {
        let root = roots[&record.root_id];
        prop_assert!(root.contains(record), "{record:?} escapes {root:?}");
        if let Some(id) = record.slice_id {
            let slice = &generated.slices[&id];
            prop_assert_eq!(&slice.context, &root.context);
            prop_assert!(slice.contains(record), "{record:?} escapes slice {slice:?}");
        }
        if let Some(id) = record.state_id {
            let state = &generated.states[&id];
            prop_assert!(state.contains(record), "{record:?} escapes state {state:?}");
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn normalize_reparents_to_nearest_labeled_ancestor(forest in forest_strategy()) {
        let ctx = context("T1");
        let mut slices = Vec::new();
        place(&forest, &ctx, None, (-30, 450), &mut 1, &mut slices);

        let normalized = normalize(&slices);

        let original: HashMap<i64, &Interval> = slices.iter().map(|s| (s.id, s)).collect();
        let kept: HashMap<i64, &Interval> = normalized.iter().map(|s| (s.id, s)).collect();
        let expected_ids: Vec<i64> = slices.iter().filter(|s| s.label.is_some()).map(|s| s.id).collect();
        let ids: Vec<i64> = normalized.iter().map(|s| s.id).collect();
        prop_assert_eq!(ids, expected_ids);

        for node in &normalized {
            let mut ancestor = original[&node.id].parent_id;
            while let Some(id) = ancestor.filter(|id| original[id].label.is_none()) {
                ancestor = original[&id].parent_id;
            }
            prop_assert_eq!(node.parent_id, ancestor);

            match node.parent_id {
                Some(parent_id) => {
                    let parent = kept[&parent_id];
                    prop_assert!(parent.contains(node), "{node:?} escapes {parent:?}");
                    prop_assert_eq!(node.depth, parent.depth + 1);
                }
                None => {
                    prop_assert_eq!(node.depth, 0);
                }
            }
        }
    }

    #[test]
    fn join_covers_left_partition_exactly(
        lefts in prop::collection::vec(1..50_i64, 1..10),
        rights in prop::collection::vec((0..30_i64, 0..40_i64), 0..12),
        offset in -40..40_i64,
    ) {
        let mut t = 0;
        let left: Vec<FlatInterval> = lefts
            .iter()
            .map(|&len| {
                let flat = FlatInterval {
                    root_id: RootId(0),
                    start: t,
                    duration: len,
                    slice_id: None,
                    label: None,
                    depth: None,
                };
                t += len;
                flat
            })
            .collect();
        let specs: Vec<_> = rights.iter().map(|&(gap, len)| (gap, len, false, false)).collect();
        let right = lay_out_states(&specs, &context("T1"), offset, &mut 1);

        let joined = join_exclusive(&left, &right);

        prop_assert_eq!(joined.first().map(|j| j.start), Some(0));
        prop_assert_eq!(joined.last().map(TimeSpan::end), Some(t));
        for pair in joined.windows(2) {
            prop_assert_eq!(pair[0].end(), pair[1].start);
            let same_left = std::ptr::eq(pair[0].left, pair[1].left);
            let same_right = match (pair[0].right, pair[1].right) {
                (Some(a), Some(b)) => std::ptr::eq(a, b),
                (None, None) => true,
                _ => false,
            };
            prop_assert!(!(same_left && same_right), "split range at {}", pair[1].start);
        }
        for j in &joined {
            prop_assert!(j.duration > 0);
            prop_assert!(j.left.contains(j));
            match j.right {
                Some(r) => {
                    prop_assert!(r.contains(j));
                }
                None => {
                    let overlapping = right
                        .iter()
                        .any(|r| r.duration > 0 && r.start < j.end() && j.start < r.end());
                    prop_assert!(!overlapping, "unmatched range [{}, {}) overlaps a right item", j.start, j.end());
                }
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn breakdown_is_gapless_clipped_and_deterministic(
        contexts in prop::collection::vec((forest_strategy(), states_strategy()), 3),
    ) {
        let generated = generate(&contexts);

        let single = breakdown(&generated.input, 1);
        let parallel = breakdown(&generated.input, 4);

        prop_assert!(single.diagnostics.malformed.is_empty(), "{:?}", single.diagnostics.malformed);
        prop_assert_eq!(single.roots.len() + single.diagnostics.uncovered_roots, 6);
        check_coverage(&single)?;
        check_clipping(&single, &generated)?;
        prop_assert_eq!(&single.records, &parallel.records);
        prop_assert_eq!(&single.roots, &parallel.roots);
    }
}
