//! Duplicate matching over the active record set.
//!
//! # Overview
//!
//! * [`policy`]: Thresholds, mode and duration modifiers.
//! * [`engine`]: The pairwise `matches` decision.
//! * [`cursor`]: Forward/backward traversal over matching pairs.
//! * [`summary`]: One-shot count of videos with any match.
//!
//! Everything here is synchronous and read-only over `&[VideoRecord]`.
//!
//! # Example
//!
//! ```no_run
//! use viddupe::matching::{advance_forward, MatchPolicy, PairCursor, Traversal};
//! use viddupe::video::VideoRecord;
//!
//! fn first_pair(records: &[VideoRecord]) -> Option<(usize, usize)> {
//!     let policy = MatchPolicy::default();
//!     match advance_forward(PairCursor::START, records, &policy, |p| p.exists()) {
//!         Traversal::Found(pair) => Some((pair.left, pair.right)),
//!         Traversal::Exhausted => None,
//!     }
//! }
//! ```

pub mod cursor;
pub mod engine;
pub mod policy;
pub mod summary;

pub use cursor::{
    advance_backward, advance_forward, comparisons_so_far, total_pairs, PairCursor, Traversal,
};
pub use engine::{agreeing_bits, matches, score, PairScore};
pub use policy::{ComparisonMode, MatchPolicy, PolicyError};
pub use summary::{
    count_videos_with_any_match, count_videos_with_any_match_until, summarize_alongside,
    summary_feasible, MatchSummary,
};
