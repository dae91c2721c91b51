//! Input rows as supplied by the query layer.
//!
//! Every field of a row is optional at the serde level so a missing
//! mandatory field can be reported against the offending record's id,
//! rather than surfacing as a positional JSON error.

use std::fmt;
use std::io::Read;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    ContextId, Interval, IntervalId, RootId, RootSpan, StateInterval, ValidationError,
};

/// Kind of input record, used in error messages and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Root,
    Slice,
    State,
}

impl RecordKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root span",
            Self::Slice => "slice",
            Self::State => "thread state",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input shape violations. These abort the whole computation.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("{kind} at index {index} is missing its id")]
    MissingId { kind: RecordKind, index: usize },

    #[error("{kind} {id} is missing required field `{field}`")]
    MissingField {
        kind: RecordKind,
        id: IntervalId,
        field: &'static str,
    },

    #[error("{kind} {id} has an invalid context")]
    InvalidContext {
        kind: RecordKind,
        id: IntervalId,
        #[source]
        source: ValidationError,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A context key as it appears on the wire: either a string or an integer
/// (e.g. a thread id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawContext {
    Number(i64),
    Text(String),
}

impl RawContext {
    fn into_context(self, kind: RecordKind, id: IntervalId) -> Result<ContextId, InputError> {
        let key = match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        };
        ContextId::new(key).map_err(|source| InputError::InvalidContext { kind, id, source })
    }
}

impl From<&str> for RawContext {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A root span row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootRow {
    pub id: Option<i64>,
    pub context: Option<RawContext>,
    pub start: Option<i64>,
    pub duration: Option<i64>,
}

/// A hierarchical interval row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SliceRow {
    pub id: Option<IntervalId>,
    pub context: Option<RawContext>,
    #[serde(default)]
    pub parent_id: Option<IntervalId>,
    /// Informational only; depth is recomputed from the parent chain.
    #[serde(default)]
    pub depth: Option<u32>,
    pub start: Option<i64>,
    pub duration: Option<i64>,
    #[serde(default)]
    pub label: Option<String>,
}

/// A thread-state row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateRow {
    pub id: Option<IntervalId>,
    pub context: Option<RawContext>,
    pub start: Option<i64>,
    pub duration: Option<i64>,
    pub state: Option<String>,
    #[serde(default)]
    pub io_wait: bool,
    #[serde(default)]
    pub irq_context: bool,
}

/// The complete input of one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BreakdownInput {
    #[serde(default)]
    pub roots: Vec<RootRow>,
    #[serde(default)]
    pub slices: Vec<SliceRow>,
    #[serde(default)]
    pub states: Vec<StateRow>,
}

impl BreakdownInput {
    /// Parses an input document from JSON.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, InputError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

fn required<T>(
    value: Option<T>,
    kind: RecordKind,
    id: IntervalId,
    field: &'static str,
) -> Result<T, InputError> {
    value.ok_or(InputError::MissingField { kind, id, field })
}

impl RootRow {
    /// Converts the row, assigning `id` as its unique root id.
    ///
    /// The duration is not checked here; the pipeline drops empty roots.
    pub(crate) fn to_root(&self, index: usize, id: RootId) -> Result<RootSpan, InputError> {
        let kind = RecordKind::Root;
        let source_id = self.id.ok_or(InputError::MissingId { kind, index })?;
        let context = required(self.context.clone(), kind, source_id, "context")?
            .into_context(kind, source_id)?;
        Ok(RootSpan {
            id,
            source_id,
            context,
            start: required(self.start, kind, source_id, "start")?,
            duration: required(self.duration, kind, source_id, "duration")?,
        })
    }
}

impl SliceRow {
    pub(crate) fn to_interval(&self, index: usize) -> Result<Interval, InputError> {
        let kind = RecordKind::Slice;
        let id = self.id.ok_or(InputError::MissingId { kind, index })?;
        let context = required(self.context.clone(), kind, id, "context")?.into_context(kind, id)?;
        Ok(Interval {
            id,
            context,
            start: required(self.start, kind, id, "start")?,
            duration: required(self.duration, kind, id, "duration")?,
            label: self.label.clone(),
            parent_id: self.parent_id,
            depth: self.depth.unwrap_or(0),
        })
    }
}

impl StateRow {
    pub(crate) fn to_state(&self, index: usize) -> Result<StateInterval, InputError> {
        let kind = RecordKind::State;
        let id = self.id.ok_or(InputError::MissingId { kind, index })?;
        let context = required(self.context.clone(), kind, id, "context")?.into_context(kind, id)?;
        Ok(StateInterval {
            id,
            context,
            start: required(self.start, kind, id, "start")?,
            duration: required(self.duration, kind, id, "duration")?,
            state: required(self.state.clone(), kind, id, "state")?,
            io_wait: self.io_wait,
            irq_context: self.irq_context,
        })
    }
}
