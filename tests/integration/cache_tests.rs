use std::sync::Arc;
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use tempfile::TempDir;
use viddupe::cache::database::SCHEMA_VERSION;
use viddupe::cache::{identity_for_file, FingerprintCache, IdentityScope};
use viddupe::video::{ExtractionConfig, FeatureExtractor};

use super::support::{write_video, ContentProbe, Footage};

fn extractor(cache: &Arc<FingerprintCache>) -> FeatureExtractor<ContentProbe> {
    FeatureExtractor::new(ContentProbe::new(60_000), ExtractionConfig::default())
        .with_cache(Arc::clone(cache))
}

#[test]
fn test_second_run_is_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let video = write_video(dir.path(), "clip.mp4", Footage::scene(4));
    let db = dir.path().join("cache").join("fingerprints.db");

    let first = {
        let cache = Arc::new(FingerprintCache::open(&db).unwrap());
        let extractor = extractor(&cache);
        let record = extractor.process(&video).unwrap();
        assert_eq!(extractor.probe().probe_count(), 1);
        assert_eq!(extractor.probe().capture_count(), 4);
        record
    };

    let cache = Arc::new(FingerprintCache::open(&db).unwrap());
    let extractor = extractor(&cache);
    let second = extractor.process(&video).unwrap();
    assert_eq!(extractor.probe().probe_count(), 0);
    assert_eq!(extractor.probe().capture_count(), 0);
    assert_eq!(second.hash(), first.hash());
    assert_eq!(second.metadata, first.metadata);
}

#[test]
fn test_touched_file_is_probed_again() {
    let dir = TempDir::new().unwrap();
    let video = write_video(dir.path(), "clip.mp4", Footage::scene(4));
    let cache = Arc::new(FingerprintCache::open_in_memory().unwrap());

    extractor(&cache).process(&video).unwrap();
    let before = identity_for_file(&video, IdentityScope::FileName).unwrap();

    let later = SystemTime::now() + Duration::from_secs(3600);
    filetime::set_file_mtime(&video, FileTime::from_system_time(later)).unwrap();
    let after = identity_for_file(&video, IdentityScope::FileName).unwrap();
    assert_ne!(before, after);

    let again = extractor(&cache);
    again.process(&video).unwrap();
    assert_eq!(again.probe().probe_count(), 1);
    assert_eq!(cache.len().unwrap(), 2);
}

#[test]
fn test_file_name_scope_follows_moved_file() {
    let dir = TempDir::new().unwrap();
    let video = write_video(dir.path(), "a/clip.mp4", Footage::scene(9));
    let cache = Arc::new(FingerprintCache::open_in_memory().unwrap());
    extractor(&cache).process(&video).unwrap();

    let moved = dir.path().join("b").join("clip.mp4");
    std::fs::create_dir_all(moved.parent().unwrap()).unwrap();
    let mtime = FileTime::from_last_modification_time(&std::fs::metadata(&video).unwrap());
    std::fs::rename(&video, &moved).unwrap();
    filetime::set_file_mtime(&moved, mtime).unwrap();

    let again = extractor(&cache);
    again.process(&moved).unwrap();
    assert_eq!(again.probe().probe_count(), 0);
}

#[test]
fn test_full_path_scope_separates_folders() {
    let dir = TempDir::new().unwrap();
    let left = write_video(dir.path(), "a/clip.mp4", Footage::scene(9));
    let right = write_video(dir.path(), "b/clip.mp4", Footage::scene(9));
    let cache = Arc::new(FingerprintCache::open_in_memory().unwrap());

    let config = ExtractionConfig::default().with_identity_scope(IdentityScope::FullPath);
    let extractor =
        FeatureExtractor::new(ContentProbe::new(60_000), config).with_cache(Arc::clone(&cache));
    extractor.process(&left).unwrap();
    extractor.process(&right).unwrap();
    assert_eq!(extractor.probe().probe_count(), 2);
    assert_eq!(cache.len().unwrap(), 2);
}

#[test]
fn test_rejected_probe_is_not_cached() {
    let dir = TempDir::new().unwrap();
    let video = write_video(dir.path(), "bad.mp4", Footage::Broken);
    let cache = Arc::new(FingerprintCache::open_in_memory().unwrap());

    assert!(extractor(&cache).process(&video).is_err());
    assert!(cache.is_empty().unwrap());
}

#[test]
fn test_clear_and_reopen() {
    let dir = TempDir::new().unwrap();
    let video = write_video(dir.path(), "clip.mp4", Footage::scene(2));
    let db = dir.path().join("fingerprints.db");

    {
        let cache = Arc::new(FingerprintCache::open(&db).unwrap());
        extractor(&cache).process(&video).unwrap();
        assert_eq!(cache.len().unwrap(), 1);
        assert_eq!(cache.schema_version().unwrap(), Some(SCHEMA_VERSION));
        cache.clear().unwrap();
        assert!(cache.is_empty().unwrap());
    }

    let cache = FingerprintCache::open(&db).unwrap();
    assert!(cache.is_empty().unwrap());
    assert_eq!(cache.schema_version().unwrap(), Some(SCHEMA_VERSION));
}

#[test]
fn test_remove_entry() {
    let dir = TempDir::new().unwrap();
    let video = write_video(dir.path(), "clip.mp4", Footage::scene(2));
    let cache = Arc::new(FingerprintCache::open_in_memory().unwrap());
    extractor(&cache).process(&video).unwrap();

    let id = identity_for_file(&video, IdentityScope::FileName).unwrap();
    let entry = cache.read_entry(&id).unwrap();
    assert!(entry.metadata.is_some());
    assert_eq!(entry.frames.len(), 4);

    assert!(cache.remove(&id).unwrap());
    assert!(!cache.remove(&id).unwrap());
    assert!(cache.read_metadata(&id).unwrap().is_none());
}
