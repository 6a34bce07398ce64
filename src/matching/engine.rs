//! Pairwise match decision.
//!
//! Agreement is `64 - popcount(a ^ b)`, shifted by the policy's duration
//! modifier and clamped to `0..=64`. Fast mode stops there. Refined mode
//! only pays for a structural comparison when the adjusted agreement clears
//! the refined gate, then shifts the SSIM index by the same modifier
//! divided by 64.

use serde::Serialize;

use super::policy::{ComparisonMode, MatchPolicy};
use crate::video::ssim::structural_similarity;
use crate::video::{Fingerprint, VideoRecord};

/// Bits in a perceptual hash.
pub const HASH_BITS: u32 = 64;

/// Number of bits on which two hashes agree.
#[must_use]
pub fn agreeing_bits(a: u64, b: u64) -> u32 {
    HASH_BITS - (a ^ b).count_ones()
}

/// Agreeing bits shifted by `adjustment` and clamped to `0..=64`.
#[must_use]
pub fn adjusted_agreement(a: u64, b: u64, adjustment: i32) -> u32 {
    (i64::from(agreeing_bits(a, b)) + i64::from(adjustment)).clamp(0, i64::from(HASH_BITS)) as u32
}

/// Whether two records match under `policy`. Symmetric in its arguments.
#[must_use]
pub fn matches(left: &VideoRecord, right: &VideoRecord, policy: &MatchPolicy) -> bool {
    let adjustment = policy.duration_adjustment(left.duration_ms(), right.duration_ms());
    sample_pairs(left, right).any(|(a, b)| samples_match(a, b, adjustment, policy))
}

/// Best scores for a pair, for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairScore {
    /// Highest adjusted agreeing-bit count over the compared samples
    pub agreement: u32,
    /// Highest adjusted SSIM, computed in refined mode only
    pub structural: Option<f64>,
}

/// Score a pair without applying thresholds.
#[must_use]
pub fn score(left: &VideoRecord, right: &VideoRecord, policy: &MatchPolicy) -> PairScore {
    let adjustment = policy.duration_adjustment(left.duration_ms(), right.duration_ms());
    let mut best = PairScore {
        agreement: 0,
        structural: None,
    };
    for (a, b) in sample_pairs(left, right) {
        best.agreement = best.agreement.max(adjusted_agreement(a.hash, b.hash, adjustment));
        if policy.mode == ComparisonMode::Refined {
            if let Some(s) = adjusted_structural(a, b, adjustment, policy) {
                best.structural = Some(best.structural.map_or(s, |prev: f64| prev.max(s)));
            }
        }
    }
    best
}

/// Sample pairs to compare: aligned when both sides carry the same number
/// of samples, otherwise every combination.
fn sample_pairs<'a>(
    left: &'a VideoRecord,
    right: &'a VideoRecord,
) -> Box<dyn Iterator<Item = (&'a Fingerprint, &'a Fingerprint)> + 'a> {
    let (ls, rs) = (left.features.samples(), right.features.samples());
    if ls.len() == rs.len() {
        Box::new(ls.iter().zip(rs.iter()))
    } else {
        Box::new(ls.iter().flat_map(move |a| rs.iter().map(move |b| (a, b))))
    }
}

fn samples_match(a: &Fingerprint, b: &Fingerprint, adjustment: i32, policy: &MatchPolicy) -> bool {
    let agreement = adjusted_agreement(a.hash, b.hash, adjustment);
    match policy.mode {
        ComparisonMode::Fast => agreement >= policy.bit_threshold,
        ComparisonMode::Refined => {
            agreement >= policy.refined_gate()
                && adjusted_structural(a, b, adjustment, policy)
                    .is_some_and(|s| s > policy.structural_threshold)
        }
    }
}

fn adjusted_structural(
    a: &Fingerprint,
    b: &Fingerprint,
    adjustment: i32,
    policy: &MatchPolicy,
) -> Option<f64> {
    structural_similarity(&a.thumb, &b.thumb, policy.ssim_block_size)
        .map(|s| s + f64::from(adjustment) / f64::from(HASH_BITS))
}
