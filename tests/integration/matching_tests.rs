use std::path::{Path, PathBuf};

use viddupe::matching::{
    advance_backward, advance_forward, comparisons_so_far, count_videos_with_any_match, matches,
    score, summary_feasible, total_pairs, ComparisonMode, MatchPolicy, PairCursor, Traversal,
};
use viddupe::video::{Features, Fingerprint, VideoRecord};

use super::support::{synthetic, thumb};

const BASE: u64 = 0x5A5A_F00D_1234_9876;

/// `BASE` with the low `bits` bits flipped.
fn flipped(bits: u32) -> u64 {
    if bits == 0 {
        BASE
    } else {
        BASE ^ (u64::MAX >> (64 - bits))
    }
}

fn video(name: &str, hash: u64, duration_ms: u64) -> VideoRecord {
    synthetic(PathBuf::from(format!("/library/{name}.mp4")), hash, duration_ms, 1_000)
}

fn with_thumb(mut record: VideoRecord, seed: u64) -> VideoRecord {
    let hash = record.hash();
    record.features = Features::single(Fingerprint {
        hash,
        thumb: thumb(seed),
    });
    record
}

fn always(_: &Path) -> bool {
    true
}

fn found(step: Traversal) -> Option<(usize, usize)> {
    step.pair().map(|p| (p.left, p.right))
}

#[test]
fn test_threshold_boundary_with_duration_bonus() {
    let policy = MatchPolicy::default();
    let a = video("a", BASE, 90_000);
    // 8 differing bits: 56 agreeing + 1 bonus reaches 57.
    assert!(matches(&a, &video("b", flipped(8), 90_500), &policy));
    assert!(!matches(&a, &video("c", flipped(9), 90_500), &policy));
}

#[test]
fn test_threshold_boundary_with_duration_penalty() {
    let policy = MatchPolicy::default();
    let a = video("a", BASE, 90_000);
    // 3 differing bits: 61 agreeing - 4 penalty is exactly 57.
    assert!(matches(&a, &video("b", flipped(3), 95_000), &policy));
    assert!(!matches(&a, &video("c", flipped(4), 95_000), &policy));
}

#[test]
fn test_match_is_symmetric() {
    let policy = MatchPolicy::default();
    let a = video("a", BASE, 60_000);
    let b = video("b", flipped(6), 61_200);
    assert_eq!(matches(&a, &b, &policy), matches(&b, &a, &policy));
    assert_eq!(score(&a, &b, &policy), score(&b, &a, &policy));
}

#[test]
fn test_refined_needs_structure() {
    let policy = MatchPolicy::default().with_mode(ComparisonMode::Refined);
    let a = with_thumb(video("a", BASE, 60_000), 1);
    let same_picture = with_thumb(video("b", flipped(16), 60_000), 1);
    let other_picture = with_thumb(video("c", BASE, 60_000), 2);

    // 48 + 1 agreeing bits clears the refined gate; the thumbnails decide.
    assert!(matches(&a, &same_picture, &policy));
    assert!(!matches(&a, &other_picture, &policy));

    let scored = score(&a, &same_picture, &policy);
    assert_eq!(scored.agreement, 49);
    assert!(scored.structural.unwrap() > 0.99);
}

#[test]
fn test_refined_gate_blocks_distant_hashes() {
    let policy = MatchPolicy::default().with_mode(ComparisonMode::Refined);
    let a = with_thumb(video("a", BASE, 60_000), 1);
    let far = with_thumb(video("b", flipped(30), 60_000), 1);
    assert!(!matches(&a, &far, &policy));
}

#[test]
fn test_policy_changes_apply_to_next_step() {
    let records = vec![
        video("a", BASE, 60_000),
        video("b", flipped(12), 60_000),
        video("c", !BASE, 60_000),
    ];
    let mut policy = MatchPolicy::default();
    assert_eq!(
        advance_forward(PairCursor::START, &records, &policy, always),
        Traversal::Exhausted
    );

    policy.bit_threshold = 50;
    assert_eq!(
        found(advance_forward(PairCursor::START, &records, &policy, always)),
        Some((0, 1))
    );
}

#[test]
fn test_forward_and_backward_visit_the_same_pairs() {
    let records = vec![
        video("a", BASE, 60_000),
        video("b", !BASE, 60_000),
        video("c", BASE, 60_000),
        video("d", !BASE, 60_000),
        video("e", BASE, 60_000),
    ];
    let policy = MatchPolicy::default();

    let mut forward = Vec::new();
    let mut cursor = PairCursor::START;
    while let Traversal::Found(pair) = advance_forward(cursor, &records, &policy, always) {
        forward.push((pair.left, pair.right));
        cursor = pair;
    }
    assert_eq!(forward, vec![(0, 2), (0, 4), (1, 3), (2, 4)]);

    let mut backward = Vec::new();
    let mut cursor = PairCursor::end(records.len());
    while let Traversal::Found(pair) = advance_backward(cursor, &records, &policy, always) {
        backward.push((pair.left, pair.right));
        cursor = pair;
    }
    backward.reverse();
    assert_eq!(backward, forward);
}

#[test]
fn test_missing_files_are_skipped() {
    let records = vec![
        video("a", BASE, 60_000),
        video("gone", BASE, 60_000),
        video("c", BASE, 60_000),
    ];
    let policy = MatchPolicy::default();
    let exists = |p: &Path| !p.ends_with("gone.mp4");

    assert_eq!(
        found(advance_forward(PairCursor::START, &records, &policy, exists)),
        Some((0, 2))
    );
}

#[test]
fn test_progress_counts() {
    assert_eq!(total_pairs(0), 0);
    assert_eq!(total_pairs(1), 0);
    assert_eq!(total_pairs(5), 10);

    let n = 5;
    assert_eq!(comparisons_so_far(PairCursor::START, n), 0);
    let mut cursor = PairCursor::START;
    let mut steps = 0;
    while let Some(next) = cursor.next(n) {
        steps += 1;
        assert_eq!(comparisons_so_far(next, n), steps);
        cursor = next;
    }
    assert_eq!(steps, total_pairs(n));
}

#[test]
fn test_summary_counts_videos_and_reclaimable_space() {
    let mut records = vec![
        video("a", BASE, 60_000),
        video("b", BASE, 60_000),
        video("c", !BASE, 60_000),
        video("d", BASE, 60_000),
    ];
    records[0].size = 700;
    records[1].size = 300;
    records[3].size = 500;

    let summary = count_videos_with_any_match(&records, &MatchPolicy::default());
    // Left 0 counts right 1 (min 300); left 1 counts right 3 (min 300).
    assert_eq!(summary.videos, 2);
    assert_eq!(summary.combined_size, 600);
}

#[test]
fn test_summary_limits() {
    assert!(summary_feasible(15_000, ComparisonMode::Fast));
    assert!(!summary_feasible(15_001, ComparisonMode::Fast));
    assert!(summary_feasible(6_000, ComparisonMode::Refined));
    assert!(!summary_feasible(6_001, ComparisonMode::Refined));
}
