//! Resumable traversal over matching pairs.
//!
//! Pairs `(left, right)` with `left < right < n` are ordered row-major over
//! the upper triangle of the pair matrix. A [`PairCursor`] is a plain value;
//! [`advance_forward`] and [`advance_backward`] are pure functions of the
//! cursor, the records, the policy and an existence check, so the caller
//! decides what becomes the current pair.

use std::path::Path;

use serde::Serialize;

use super::engine::matches;
use super::policy::MatchPolicy;
use crate::video::VideoRecord;

/// Position in the pair matrix.
///
/// Besides real pairs (`left < right`), two sentinels exist: [`PairCursor::START`]
/// sits before the first pair and [`PairCursor::end`] after the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PairCursor {
    /// Index of the left record
    pub left: usize,
    /// Index of the right record
    pub right: usize,
}

impl PairCursor {
    /// Before the first pair.
    pub const START: Self = Self { left: 0, right: 0 };

    /// A real pair, `None` unless `left < right`.
    #[must_use]
    pub fn new(left: usize, right: usize) -> Option<Self> {
        (left < right).then_some(Self { left, right })
    }

    /// After the last pair of an `n`-record set.
    #[must_use]
    pub fn end(n: usize) -> Self {
        Self {
            left: n.saturating_sub(1),
            right: n,
        }
    }

    /// Whether the cursor names a real pair of an `n`-record set.
    #[must_use]
    pub fn is_pair(self, n: usize) -> bool {
        self.left < self.right && self.right < n
    }

    /// The pair after this one, if any.
    #[must_use]
    pub fn next(self, n: usize) -> Option<Self> {
        if self.left + 1 >= n {
            return None;
        }
        let right = self.right.max(self.left) + 1;
        if right < n {
            Some(Self {
                left: self.left,
                right,
            })
        } else if self.left + 2 < n {
            Some(Self {
                left: self.left + 1,
                right: self.left + 2,
            })
        } else {
            None
        }
    }

    /// The pair before this one, if any.
    #[must_use]
    pub fn prev(self, n: usize) -> Option<Self> {
        if n < 2 {
            return None;
        }
        // Positions past the end collapse onto the end sentinel.
        let here = if self.left >= n - 1 || self.right > n {
            Self::end(n)
        } else {
            self
        };
        if here.right > here.left + 1 {
            Some(Self {
                left: here.left,
                right: here.right - 1,
            })
        } else if here.left > 0 {
            Some(Self {
                left: here.left - 1,
                right: n - 1,
            })
        } else {
            None
        }
    }
}

impl Default for PairCursor {
    fn default() -> Self {
        Self::START
    }
}

/// Outcome of a traversal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// A matching pair whose files both exist
    Found(PairCursor),
    /// No further matching pair in this direction
    Exhausted,
}

impl Traversal {
    /// The found pair, if any.
    #[must_use]
    pub fn pair(self) -> Option<PairCursor> {
        match self {
            Self::Found(pair) => Some(pair),
            Self::Exhausted => None,
        }
    }
}

/// Next matching pair strictly after `from` whose files both exist.
pub fn advance_forward<F>(
    from: PairCursor,
    records: &[VideoRecord],
    policy: &MatchPolicy,
    exists: F,
) -> Traversal
where
    F: Fn(&Path) -> bool,
{
    walk(from, records, policy, exists, |c, n| c.next(n))
}

/// Previous matching pair strictly before `from` whose files both exist.
pub fn advance_backward<F>(
    from: PairCursor,
    records: &[VideoRecord],
    policy: &MatchPolicy,
    exists: F,
) -> Traversal
where
    F: Fn(&Path) -> bool,
{
    walk(from, records, policy, exists, |c, n| c.prev(n))
}

fn walk<F, S>(
    from: PairCursor,
    records: &[VideoRecord],
    policy: &MatchPolicy,
    exists: F,
    step: S,
) -> Traversal
where
    F: Fn(&Path) -> bool,
    S: Fn(PairCursor, usize) -> Option<PairCursor>,
{
    let n = records.len();
    let mut cursor = from;
    while let Some(candidate) = step(cursor, n) {
        let (left, right) = (&records[candidate.left], &records[candidate.right]);
        if matches(left, right, policy) && exists(&left.path) && exists(&right.path) {
            return Traversal::Found(candidate);
        }
        cursor = candidate;
    }
    Traversal::Exhausted
}

/// Number of unordered pairs in an `n`-record set.
#[must_use]
pub fn total_pairs(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Pairs evaluated by a forward traversal that has reached `cursor`.
///
/// Computed in closed form: all rows before `cursor.left` plus the
/// position within the current row.
#[must_use]
pub fn comparisons_so_far(cursor: PairCursor, n: usize) -> usize {
    if n < 2 {
        return 0;
    }
    let left = cursor.left.min(n - 1);
    let remaining_rows = total_pairs(n - left);
    let within_row = cursor.right.min(n).saturating_sub(left);
    (total_pairs(n) - remaining_rows + within_row).min(total_pairs(n))
}
