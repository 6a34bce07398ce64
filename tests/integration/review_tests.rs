use std::fs;
use std::sync::Arc;

use tempfile::TempDir;
use viddupe::cache::{identity_for_file, FingerprintCache, IdentityScope, VideoMetadata};
use viddupe::matching::{MatchPolicy, Traversal};
use viddupe::review::{DeleteMode, ReviewError, ReviewSession, Side};

use super::support::synthetic_on_disk;

const SAME: u64 = 0x0123_4567_89AB_CDEF;
const OTHER: u64 = !SAME;

fn current(session: &ReviewSession) -> Option<(usize, usize)> {
    session.current().map(|_| {
        let cursor = session.cursor();
        (cursor.left, cursor.right)
    })
}

#[test]
fn test_walk_and_delete() {
    let dir = TempDir::new().unwrap();
    let records = synthetic_on_disk(dir.path(), &[SAME, OTHER, SAME, SAME]);
    let doomed = records[2].path.clone();
    let doomed_size = records[2].size;
    let mut session = ReviewSession::new(records, MatchPolicy::default());

    assert!(session.next().pair().is_some());
    assert_eq!(current(&session), Some((0, 2)));

    let step = session.delete(Side::Right, DeleteMode::Permanent).unwrap();
    assert!(!doomed.exists());
    assert_eq!(step.pair().map(|p| (p.left, p.right)), Some((0, 3)));

    let totals = session.totals();
    assert_eq!(totals.deleted, 1);
    assert_eq!(totals.reclaimed_bytes, doomed_size);

    // Only (0, 3) remains; stepping on keeps it.
    assert_eq!(session.next(), Traversal::Exhausted);
    assert_eq!(current(&session), Some((0, 3)));
}

#[test]
fn test_deleting_left_moves_to_next_row() {
    let dir = TempDir::new().unwrap();
    let records = synthetic_on_disk(dir.path(), &[SAME, SAME, SAME]);
    let mut session = ReviewSession::new(records, MatchPolicy::default());

    session.next();
    let step = session.delete(Side::Left, DeleteMode::Permanent).unwrap();
    assert_eq!(step.pair().map(|p| (p.left, p.right)), Some((1, 2)));
}

#[test]
fn test_prev_falls_forward_at_start() {
    let dir = TempDir::new().unwrap();
    let records = synthetic_on_disk(dir.path(), &[SAME, OTHER, SAME]);
    let mut session = ReviewSession::new(records, MatchPolicy::default());

    assert_eq!(session.prev().pair().map(|p| (p.left, p.right)), Some((0, 2)));
    assert_eq!(session.prev().pair().map(|p| (p.left, p.right)), Some((0, 2)));
}

#[test]
fn test_delete_purges_cache() {
    let dir = TempDir::new().unwrap();
    let records = synthetic_on_disk(dir.path(), &[SAME, SAME]);
    let cache = Arc::new(FingerprintCache::open_in_memory().unwrap());
    let id = identity_for_file(&records[1].path, IdentityScope::FileName).unwrap();
    cache.write_metadata(&id, &VideoMetadata::default()).unwrap();

    let mut session = ReviewSession::new(records, MatchPolicy::default())
        .with_cache(Arc::clone(&cache), IdentityScope::FileName);
    session.next();
    session.delete(Side::Right, DeleteMode::Permanent).unwrap();

    assert!(cache.read_metadata(&id).unwrap().is_none());
}

#[test]
fn test_move_to_other_folder() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("archive");
    fs::create_dir(&archive).unwrap();
    let mut records = synthetic_on_disk(dir.path(), &[SAME, SAME]);
    let moved_from = archive.join("stray.mp4");
    fs::rename(&records[1].path, &moved_from).unwrap();
    records[1].path = moved_from.clone();

    let mut session = ReviewSession::new(records, MatchPolicy::default());
    session.next();
    let step = session.move_to_other_folder(Side::Right).unwrap();

    assert!(!moved_from.exists());
    assert!(dir.path().join("stray.mp4").is_file());
    assert_eq!(session.records()[1].path, dir.path().join("stray.mp4"));
    assert_eq!(session.totals().moved, 1);
    // The moved file leaves the traversal.
    assert_eq!(step, Traversal::Exhausted);
}

#[test]
fn test_move_within_same_folder_is_refused() {
    let dir = TempDir::new().unwrap();
    let records = synthetic_on_disk(dir.path(), &[SAME, SAME]);
    let mut session = ReviewSession::new(records, MatchPolicy::default());
    session.next();

    assert!(matches!(
        session.move_to_other_folder(Side::Left),
        Err(ReviewError::SameFolder(_))
    ));
    assert!(session.details().unwrap().same_folder);
}

#[test]
fn test_swap_names() {
    let dir = TempDir::new().unwrap();
    let records = synthetic_on_disk(dir.path(), &[SAME, SAME]);
    let (left, right) = (records[0].path.clone(), records[1].path.clone());
    let (left_len, right_len) = (records[0].size, records[1].size);
    let mut session = ReviewSession::new(records, MatchPolicy::default());
    session.next();

    session.swap_names().unwrap();

    assert_eq!(fs::metadata(&left).unwrap().len(), right_len);
    assert_eq!(fs::metadata(&right).unwrap().len(), left_len);
    assert_eq!(session.totals().swapped, 1);
    assert_eq!(current(&session), Some((0, 1)));
}

#[test]
fn test_actions_need_a_pair() {
    let dir = TempDir::new().unwrap();
    let records = synthetic_on_disk(dir.path(), &[SAME, OTHER]);
    let mut session = ReviewSession::new(records, MatchPolicy::default());

    assert_eq!(session.next(), Traversal::Exhausted);
    assert!(matches!(
        session.delete(Side::Left, DeleteMode::Permanent),
        Err(ReviewError::NoCurrentPair)
    ));
    assert!(matches!(session.swap_names(), Err(ReviewError::NoCurrentPair)));
}
