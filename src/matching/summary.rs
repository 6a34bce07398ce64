//! Up-front estimate of how many videos have a match.
//!
//! For each left record only its first matching right record counts, and a
//! right record is counted once no matter how many lefts it matches. The
//! combined size sums the smaller file of each counted pair, which is what
//! deleting the likely-redundant copy would reclaim.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::Serialize;

use super::engine::matches;
use super::policy::{ComparisonMode, MatchPolicy};
use crate::video::VideoRecord;

/// Largest active set summarized in fast mode.
pub const FAST_SUMMARY_LIMIT: usize = 15_000;
/// Largest active set summarized in refined mode.
pub const REFINED_SUMMARY_LIMIT: usize = 6_000;

/// Result of a summary scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    /// Videos with at least one match
    pub videos: usize,
    /// Sum of the smaller size of each counted pair, in bytes
    pub combined_size: u64,
}

/// Whether a summary over `n` records is cheap enough to run.
#[must_use]
pub fn summary_feasible(n: usize, mode: ComparisonMode) -> bool {
    match mode {
        ComparisonMode::Fast => n <= FAST_SUMMARY_LIMIT,
        ComparisonMode::Refined => n <= REFINED_SUMMARY_LIMIT,
    }
}

/// Count videos with any match and the space their duplicates occupy.
#[must_use]
pub fn count_videos_with_any_match(records: &[VideoRecord], policy: &MatchPolicy) -> MatchSummary {
    let never = AtomicBool::new(false);
    count_videos_with_any_match_until(records, policy, &never).unwrap_or_default()
}

/// As [`count_videos_with_any_match`], abandoning the scan (`None`) once
/// `stop` is set.
///
/// First matches are searched in parallel per left record; the dedup fold
/// runs in left order afterwards so the result equals a sequential scan.
pub fn count_videos_with_any_match_until(
    records: &[VideoRecord],
    policy: &MatchPolicy,
    stop: &AtomicBool,
) -> Option<MatchSummary> {
    let first_matches: Vec<Option<usize>> = (0..records.len())
        .into_par_iter()
        .map(|left| {
            if stop.load(Ordering::Relaxed) {
                return None;
            }
            (left + 1..records.len()).find(|&right| matches(&records[left], &records[right], policy))
        })
        .collect();

    if stop.load(Ordering::Relaxed) {
        log::debug!("Match summary abandoned");
        return None;
    }

    let mut known = HashSet::new();
    let mut summary = MatchSummary::default();
    for (left, right) in first_matches.into_iter().enumerate() {
        let Some(right) = right else { continue };
        if known.insert(right) {
            summary.videos += 1;
            summary.combined_size += records[left].size.min(records[right].size);
        }
    }
    Some(summary)
}

/// Run the summary scan on a scoped background thread while `foreground`
/// runs on the caller's thread, then join both.
///
/// Both closures see the same immutable `records`; the borrow outlives the
/// scan, so the set cannot be mutated or dropped until the join.
pub fn summarize_alongside<R, F>(
    records: &[VideoRecord],
    policy: &MatchPolicy,
    foreground: F,
) -> (R, Option<MatchSummary>)
where
    F: FnOnce() -> R,
{
    if !summary_feasible(records.len(), policy.mode) {
        log::info!(
            "Skipping match summary for {} videos in {} mode",
            records.len(),
            policy.mode
        );
        return (foreground(), None);
    }

    std::thread::scope(|scope| {
        let background = scope.spawn(|| count_videos_with_any_match(records, policy));
        let result = foreground();
        let summary = settle_estimate(background.join());
        (result, summary)
    })
}

fn settle_estimate(joined: std::thread::Result<MatchSummary>) -> Option<MatchSummary> {
    match joined {
        Ok(summary) => Some(summary),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::warn!("Match summary failed: {}", message);
            None
        }
    }
}
