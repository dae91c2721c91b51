//! Left-outer merge-join of two exclusive partitions of one root.

use crate::types::TimeSpan;

/// One maximal range over which both the left and the right item are constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Joined<'a, L, R> {
    pub start: i64,
    pub duration: i64,
    pub left: &'a L,
    /// `None` where the right partition has no item.
    pub right: Option<&'a R>,
}

impl<L, R> TimeSpan for Joined<'_, L, R> {
    fn start(&self) -> i64 {
        self.start
    }

    fn duration(&self) -> i64 {
        self.duration
    }
}

/// Merges two exclusive partitions, both sorted by start.
///
/// The output covers exactly the union of the left items: right items only
/// subdivide left ranges and never contribute time outside them. No
/// zero-duration rows are produced. Runs in O(left + right).
pub fn join_exclusive<'a, L: TimeSpan, R: TimeSpan>(
    left: &'a [L],
    right: &'a [R],
) -> Vec<Joined<'a, L, R>> {
    let mut joined = Vec::with_capacity(left.len() + right.len());
    let mut next = 0;

    for l in left {
        let end = l.end();
        let mut cursor = l.start();

        while cursor < end {
            while right
                .get(next)
                .is_some_and(|r| r.end() <= cursor || r.duration() <= 0)
            {
                next += 1;
            }

            let (until, matched) = match right.get(next) {
                Some(r) if r.start() <= cursor => (r.end().min(end), Some(r)),
                Some(r) if r.start() < end => (r.start(), None),
                _ => (end, None),
            };
            joined.push(Joined {
                start: cursor,
                duration: until - cursor,
                left: l,
                right: matched,
            });
            cursor = until;
        }
    }

    joined
}
