//! Per-root aggregation of exclusive records by cause.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::types::{ExclusiveRecord, RootId, TimeSpan};

/// Total time attributed to one cause within a root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CauseTotal {
    pub cause: String,
    pub duration: i64,
    /// Share of the root's covered time, 0.0 to 100.0.
    pub percentage: f64,
}

/// Cause totals of one root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootSummary {
    pub root_id: RootId,
    pub start: i64,
    /// Sum of record durations; equals the root duration for covered roots.
    pub duration: i64,
    /// Sorted by duration descending, then cause name.
    pub causes: Vec<CauseTotal>,
}

/// Sums record durations per cause for every root, ordered by root id.
#[allow(clippy::cast_precision_loss)]
pub fn summarize(records: &[ExclusiveRecord]) -> Vec<RootSummary> {
    let mut by_root: BTreeMap<RootId, Vec<&ExclusiveRecord>> = BTreeMap::new();
    for record in records {
        by_root.entry(record.root_id).or_default().push(record);
    }

    by_root
        .into_iter()
        .map(|(root_id, records)| {
            let start = records.iter().map(|r| r.start()).min().unwrap_or_default();
            let duration: i64 = records.iter().map(|r| r.duration).sum();

            let mut totals: HashMap<&str, i64> = HashMap::new();
            for record in &records {
                *totals.entry(record.cause.as_str()).or_insert(0) += record.duration;
            }
            let mut causes: Vec<CauseTotal> = totals
                .into_iter()
                .map(|(cause, total)| CauseTotal {
                    cause: cause.to_string(),
                    duration: total,
                    percentage: if duration > 0 {
                        total as f64 / duration as f64 * 100.0
                    } else {
                        0.0
                    },
                })
                .collect();
            causes.sort_by(|a, b| b.duration.cmp(&a.duration).then_with(|| a.cause.cmp(&b.cause)));

            RootSummary {
                root_id,
                start,
                duration,
                causes,
            }
        })
        .collect()
}
