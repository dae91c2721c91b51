//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
}

/// Identifier of a slice or thread-state row, as supplied by the caller.
pub type IntervalId = i64;

/// A validated execution-context key (e.g. a thread).
///
/// Context keys are opaque, non-empty strings. Intervals in different
/// contexts never interact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContextId(String);

impl ContextId {
    /// Creates a new context key after validation.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::Empty { field: "context" });
        }
        Ok(Self(id))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContextId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ContextId> for String {
    fn from(id: ContextId) -> Self {
        id.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ContextId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Process-wide unique identifier of a root span.
///
/// Assigned densely in input order, so two roots sharing a source id in
/// different contexts still get distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RootId(pub u64);

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Anything occupying a half-open time range `[start, start + duration)`.
pub trait TimeSpan {
    /// Inclusive start timestamp.
    fn start(&self) -> i64;

    /// Length of the range. Negative values mark malformed input.
    fn duration(&self) -> i64;

    /// Exclusive end timestamp, or `None` if it does not fit in an `i64`.
    fn checked_end(&self) -> Option<i64> {
        self.start().checked_add(self.duration())
    }

    /// Exclusive end timestamp.
    ///
    /// Spans reaching past `i64::MAX` are dropped during validation, so every
    /// span past that point has a representable end.
    fn end(&self) -> i64 {
        self.start() + self.duration()
    }

    /// Returns true if `other` lies entirely within this range.
    fn contains<T: TimeSpan + ?Sized>(&self, other: &T) -> bool {
        self.start() <= other.start() && other.end() <= self.end()
    }
}

/// A node of the hierarchical (nested) interval stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub id: IntervalId,
    pub context: ContextId,
    pub start: i64,
    pub duration: i64,
    /// `None` marks a node that normalisation removes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<IntervalId>,
    /// Number of ancestors.
    #[serde(default)]
    pub depth: u32,
}

impl TimeSpan for Interval {
    fn start(&self) -> i64 {
        self.start
    }

    fn duration(&self) -> i64 {
        self.duration
    }
}

/// A flat, mutually exclusive scheduling-state interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateInterval {
    pub id: IntervalId,
    pub context: ContextId,
    pub start: i64,
    pub duration: i64,
    /// Scheduler state, e.g. `"Running"` or `"S"`.
    pub state: String,
    /// Blocked on I/O.
    #[serde(default)]
    pub io_wait: bool,
    /// Executing in interrupt context.
    #[serde(default)]
    pub irq_context: bool,
}

impl TimeSpan for StateInterval {
    fn start(&self) -> i64 {
        self.start
    }

    fn duration(&self) -> i64 {
        self.duration
    }
}

/// An outer time window being decomposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootSpan {
    pub id: RootId,
    /// Identifier as supplied by the caller; may repeat across contexts.
    pub source_id: i64,
    pub context: ContextId,
    pub start: i64,
    /// Always positive for roots that reach the pipeline.
    pub duration: i64,
}

impl TimeSpan for RootSpan {
    fn start(&self) -> i64 {
        self.start
    }

    fn duration(&self) -> i64 {
        self.duration
    }
}

/// An item truncated to exactly one root span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clipped<T> {
    pub root_id: RootId,
    #[serde(flatten)]
    pub item: T,
}

impl<T: TimeSpan> TimeSpan for Clipped<T> {
    fn start(&self) -> i64 {
        self.item.start()
    }

    fn duration(&self) -> i64 {
        self.item.duration()
    }
}

/// A slice clipped to one root.
pub type ClippedInterval = Clipped<Interval>;

/// An exclusive sub-interval of a root, owned by the deepest active slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatInterval {
    pub root_id: RootId,
    pub start: i64,
    pub duration: i64,
    /// Deepest active slice, or `None` when nothing is on the stack.
    pub slice_id: Option<IntervalId>,
    pub label: Option<String>,
    pub depth: Option<u32>,
}

impl TimeSpan for FlatInterval {
    fn start(&self) -> i64 {
        self.start
    }

    fn duration(&self) -> i64 {
        self.duration
    }
}

/// Final merged output row: gapless and non-overlapping within its root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusiveRecord {
    pub root_id: RootId,
    pub slice_id: Option<IntervalId>,
    pub state_id: Option<IntervalId>,
    pub start: i64,
    pub duration: i64,
    pub cause: String,
}

impl TimeSpan for ExclusiveRecord {
    fn start(&self) -> i64 {
        self.start
    }

    fn duration(&self) -> i64 {
        self.duration
    }
}
