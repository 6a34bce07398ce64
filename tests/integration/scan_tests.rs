use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tempfile::TempDir;
use viddupe::error::ExitCode;
use viddupe::matching::{summarize_alongside, MatchPolicy};
use viddupe::output::{JsonOutput, MatchReport, ReportContext, TextOutput};
use viddupe::pipeline::{extract_all, PipelineConfig, PipelineOutcome};
use viddupe::scanner::{discover, ScanError, WalkerConfig};
use viddupe::video::{ExtractionConfig, FeatureExtractor, ThumbnailLayout};

use super::support::{write_video, ContentProbe, Footage};

fn scan(root: &TempDir, extraction: ExtractionConfig) -> (Vec<PathBuf>, PipelineOutcome) {
    let files = discover(&[root.path().to_path_buf()], &WalkerConfig::default(), None).unwrap();
    let extractor = FeatureExtractor::new(ContentProbe::new(60_000), extraction);
    let outcome = extract_all(files.clone(), &extractor, &PipelineConfig::default().with_threads(2));
    (files, outcome)
}

fn pair_names(report: &MatchReport) -> Vec<(String, String)> {
    report
        .pairs
        .iter()
        .map(|pair| {
            let name = |p: &str| {
                PathBuf::from(p)
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            };
            (name(&pair.left.path), name(&pair.right.path))
        })
        .collect()
}

#[test]
fn test_copies_match_and_strangers_do_not() {
    let root = TempDir::new().unwrap();
    write_video(root.path(), "holiday.mp4", Footage::scene(7));
    write_video(root.path(), "backup/holiday-copy.mkv", Footage::scene(7));
    write_video(root.path(), "concert.avi", Footage::scene(991));
    fs::write(root.path().join("notes.txt"), "not a video").unwrap();

    let (files, outcome) = scan(&root, ExtractionConfig::default());
    assert_eq!(files.len(), 3);
    assert_eq!(outcome.records.len(), 3);
    assert!(outcome.rejections.is_empty());

    let report = MatchReport::build(&outcome, &MatchPolicy::default(), &ReportContext::default());
    assert_eq!(
        pair_names(&report),
        vec![("holiday-copy.mkv".to_string(), "holiday.mp4".to_string())]
    );
    assert_eq!(report.exit_code(), ExitCode::Success);
}

#[test]
fn test_no_pairs_reports_no_matches() {
    let root = TempDir::new().unwrap();
    write_video(root.path(), "a.mp4", Footage::scene(1));
    write_video(root.path(), "b.mp4", Footage::scene(2));

    let (_, outcome) = scan(&root, ExtractionConfig::default());
    let report = MatchReport::build(&outcome, &MatchPolicy::default(), &ReportContext::default());
    assert!(report.pairs.is_empty());
    assert_eq!(report.exit_code(), ExitCode::NoMatches);
}

#[test]
fn test_rejected_files_make_partial_success() {
    let root = TempDir::new().unwrap();
    write_video(root.path(), "a.mp4", Footage::scene(5));
    write_video(root.path(), "b.mp4", Footage::scene(5));
    write_video(root.path(), "black.mp4", Footage::Blank);
    write_video(root.path(), "corrupt.mp4", Footage::Broken);

    let (_, outcome) = scan(&root, ExtractionConfig::default());
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.stats.rejected, 2);

    let report = MatchReport::build(&outcome, &MatchPolicy::default(), &ReportContext::default());
    assert_eq!(report.pairs.len(), 1);
    let mut reasons: Vec<_> = report.rejections.iter().map(|r| r.reason).collect();
    reasons.sort_unstable();
    assert_eq!(reasons, vec!["degenerate", "probe"]);
    assert_eq!(report.exit_code(), ExitCode::PartialSuccess);
}

#[test]
fn test_resolution_copy_matches_under_looser_threshold() {
    let root = TempDir::new().unwrap();
    write_video(root.path(), "small.mp4", Footage::scene(31));
    write_video(
        root.path(),
        "large.mp4",
        Footage::Scene {
            seed: 31,
            width: 128,
            height: 96,
        },
    );

    let (_, outcome) = scan(&root, ExtractionConfig::default());
    let policy = MatchPolicy::default().with_bit_threshold(48);
    let report = MatchReport::build(&outcome, &policy, &ReportContext::default());
    assert_eq!(report.pairs.len(), 1);
}

#[test]
fn test_endpoints_layout_matches_copies() {
    let root = TempDir::new().unwrap();
    write_video(root.path(), "one.mp4", Footage::scene(12));
    write_video(root.path(), "two.mp4", Footage::scene(12));

    let extraction = ExtractionConfig::default().with_layout(ThumbnailLayout::Endpoints);
    let (_, outcome) = scan(&root, extraction);
    assert_eq!(outcome.records[0].features.len(), 2);

    let report = MatchReport::build(&outcome, &MatchPolicy::default(), &ReportContext::default());
    assert_eq!(report.pairs.len(), 1);
}

#[test]
fn test_summary_runs_alongside_report() {
    let root = TempDir::new().unwrap();
    for name in ["a.mp4", "b.mp4", "c.mp4"] {
        write_video(root.path(), name, Footage::scene(77));
    }
    write_video(root.path(), "d.mp4", Footage::scene(78));

    let (_, outcome) = scan(&root, ExtractionConfig::default());
    let policy = MatchPolicy::default();
    let (report, estimate) = summarize_alongside(&outcome.records, &policy, || {
        MatchReport::build(&outcome, &policy, &ReportContext::default())
    });
    let report = report.with_estimate(estimate);

    assert_eq!(report.pairs.len(), 3);
    assert_eq!(report.summary.videos_with_match, Some(2));
}

#[test]
fn test_reports_render() {
    yansi::disable();
    let root = TempDir::new().unwrap();
    write_video(root.path(), "a.mp4", Footage::scene(3));
    write_video(root.path(), "b.mp4", Footage::scene(3));

    let (_, outcome) = scan(&root, ExtractionConfig::default());
    let report = MatchReport::build(&outcome, &MatchPolicy::default(), &ReportContext::default());

    let mut text = Vec::new();
    TextOutput::new(&report).write_to(&mut text).unwrap();
    let text = String::from_utf8(text).unwrap();
    assert!(text.contains("a.mp4"));
    assert!(text.contains("Pairs:     1"));

    let json = JsonOutput::new(&report).to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["pairs"].as_array().unwrap().len(), 1);
    assert_eq!(value["summary"]["exit_code"], 0);
}

#[test]
fn test_interrupted_discovery_is_an_error() {
    let root = TempDir::new().unwrap();
    write_video(root.path(), "a.mp4", Footage::scene(1));

    let stop = Arc::new(AtomicBool::new(true));
    let result = discover(&[root.path().to_path_buf()], &WalkerConfig::default(), Some(stop));
    assert!(matches!(result, Err(ScanError::Interrupted)));
}

#[test]
fn test_interrupted_extraction_still_reports() {
    let root = TempDir::new().unwrap();
    write_video(root.path(), "a.mp4", Footage::scene(1));
    write_video(root.path(), "b.mp4", Footage::scene(1));

    let files = discover(&[root.path().to_path_buf()], &WalkerConfig::default(), None).unwrap();
    let stop = Arc::new(AtomicBool::new(true));
    let extractor = FeatureExtractor::new(ContentProbe::new(60_000), ExtractionConfig::default());
    let outcome = extract_all(
        files,
        &extractor,
        &PipelineConfig::default().with_shutdown_flag(Arc::clone(&stop)),
    );
    assert!(outcome.stats.interrupted);
    assert_eq!(extractor.probe().probe_count(), 0);

    let context = ReportContext::default().with_shutdown_flag(stop);
    let report = MatchReport::build(&outcome, &MatchPolicy::default(), &context);
    assert!(report.summary.interrupted);
    assert_eq!(report.exit_code(), ExitCode::Interrupted);
}

#[test]
fn test_missing_root_fails_discovery() {
    let root = TempDir::new().unwrap();
    let missing = root.path().join("nowhere");
    let result = discover(&[missing], &WalkerConfig::default(), None);
    assert!(matches!(result, Err(ScanError::PathNotFound(_))));
}
