//! Match reports and their formatters.
//!
//! # Overview
//!
//! [`MatchReport::build`] walks every matching pair of the active set with
//! the forward traversal, the same order an operator would review them in,
//! and collects per-pair details alongside the extraction rejections and
//! run counters. The report is then rendered by:
//!
//! - [`text::TextOutput`]: human-readable listing for the terminal
//! - [`json::JsonOutput`]: machine-readable JSON for scripting
//!
//! # Example
//!
//! ```no_run
//! use viddupe::matching::MatchPolicy;
//! use viddupe::output::{MatchReport, ReportContext};
//! use viddupe::output::json::JsonOutput;
//! use viddupe::pipeline::PipelineOutcome;
//!
//! let outcome = PipelineOutcome::default();
//! let policy = MatchPolicy::default();
//! let report = MatchReport::build(&outcome, &policy, &ReportContext::default())
//!     .with_estimate(None);
//! println!("{}", JsonOutput::new(&report).to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use bytesize::ByteSize;
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::ExitCode;
use crate::matching::{
    advance_forward, comparisons_so_far, total_pairs, ComparisonMode, MatchPolicy, MatchSummary,
    PairCursor, Traversal,
};
use crate::pipeline::{PipelineOutcome, PipelineStats};
use crate::progress::{ProgressCallback, PHASE_MATCH};
use crate::review::PairDetails;
use crate::video::VideoRecord;

pub use json::JsonOutput;
pub use text::TextOutput;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

/// Format a duration in milliseconds as `1h2m3s`.
///
/// Zero units are left out, so 61 000 ms is `1m1s`. Anything under one
/// second (including zero) yields an empty string.
#[must_use]
pub fn readable_duration(ms: u64) -> String {
    let total = ms / 1000;
    let (hours, minutes, seconds) = (total / 3600, (total / 60) % 60, total % 60);
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if seconds > 0 {
        out.push_str(&format!("{seconds}s"));
    }
    out
}

/// Format a file size: whole kilobytes below 1 MiB, otherwise one decimal
/// in the largest fitting binary unit.
#[must_use]
pub fn readable_size(bytes: u64) -> String {
    if bytes < MIB {
        format!("{} kB", bytes / KIB)
    } else {
        ByteSize::b(bytes).to_string()
    }
}

/// Format a bitrate in kilobits per second.
#[must_use]
pub fn readable_bitrate(kbps: u32) -> String {
    format!("{kbps} kb/s")
}

/// Format a modification time in local time.
#[must_use]
pub fn readable_modified(time: SystemTime) -> String {
    let datetime: DateTime<Local> = time.into();
    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// One side of a reported pair.
#[derive(Debug, Clone, Serialize)]
pub struct ReportVideo {
    /// Path as discovered
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// Human-readable size
    pub size_display: String,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Human-readable duration
    pub duration_display: String,
    /// Bitrate in kb/s
    pub bitrate_kbps: u32,
    /// Frames per second
    pub framerate: f64,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Video codec
    pub codec: String,
    /// Audio description
    pub audio: String,
    /// Human-readable modification time
    pub modified: String,
}

impl ReportVideo {
    fn from_record(record: &VideoRecord) -> Self {
        let meta = &record.metadata;
        Self {
            path: display_path(&record.path),
            size: record.size,
            size_display: readable_size(record.size),
            duration_ms: meta.duration_ms,
            duration_display: readable_duration(meta.duration_ms),
            bitrate_kbps: meta.bitrate_kbps,
            framerate: meta.framerate,
            width: meta.width,
            height: meta.height,
            codec: meta.codec.clone(),
            audio: meta.audio.clone(),
            modified: readable_modified(record.modified),
        }
    }
}

/// A matching pair with its comparison details.
#[derive(Debug, Clone, Serialize)]
pub struct ReportPair {
    /// Index of the left record in the active set
    pub left_index: usize,
    /// Index of the right record in the active set
    pub right_index: usize,
    /// Left file
    pub left: ReportVideo,
    /// Right file
    pub right: ReportVideo,
    /// Which side wins each property, plus the similarity score
    pub details: PairDetails,
}

/// A file dropped from the active set.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRejection {
    /// Rejected file
    pub path: String,
    /// Short machine-readable reason
    pub reason: &'static str,
    /// Full error message
    pub message: String,
}

/// Run counters and the up-front match estimate.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    /// Comparison mode used
    pub mode: ComparisonMode,
    /// Agreeing-bit threshold used
    pub bit_threshold: u32,
    /// Files handed to extraction
    pub files_discovered: usize,
    /// Files in the active set
    pub videos_accepted: usize,
    /// Files rejected during extraction
    pub videos_rejected: usize,
    /// Rejections caused by resource exhaustion
    pub resource_exhausted: usize,
    /// Files never started because of a stop request
    pub files_skipped: usize,
    /// Matching pairs listed
    pub pairs: usize,
    /// Videos with at least one match; absent when the estimate was skipped
    pub videos_with_match: Option<usize>,
    /// Combined size of the likely-redundant copies, in bytes
    pub combined_size: Option<u64>,
    /// Whether the run was interrupted
    pub interrupted: bool,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "VD000")
    pub exit_code_name: String,
}

/// Optional inputs to [`MatchReport::build`].
#[derive(Clone, Default)]
pub struct ReportContext {
    /// Stop flag checked between pairs
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Progress for the `match` phase
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for ReportContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportContext")
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl ReportContext {
    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Everything a formatter needs about one scan.
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    /// Matching pairs in traversal order
    pub pairs: Vec<ReportPair>,
    /// Rejected files
    pub rejections: Vec<ReportRejection>,
    /// Counters
    pub summary: ReportSummary,
}

impl MatchReport {
    /// Traverse every matching pair of `outcome.records` and assemble the
    /// report.
    ///
    /// Pairs whose files no longer exist are skipped. A stop request ends
    /// the traversal early and marks the report interrupted.
    #[must_use]
    pub fn build(outcome: &PipelineOutcome, policy: &MatchPolicy, context: &ReportContext) -> Self {
        let records = &outcome.records;
        let n = records.len();
        if let Some(ref callback) = context.progress_callback {
            callback.on_phase_start(PHASE_MATCH, total_pairs(n));
        }

        let mut pairs = Vec::new();
        let mut cursor = PairCursor::START;
        let mut stopped = false;
        loop {
            if context.is_shutdown_requested() {
                stopped = true;
                break;
            }
            match advance_forward(cursor, records, policy, Path::is_file) {
                Traversal::Found(pair) => {
                    let (left, right) = (&records[pair.left], &records[pair.right]);
                    pairs.push(ReportPair {
                        left_index: pair.left,
                        right_index: pair.right,
                        left: ReportVideo::from_record(left),
                        right: ReportVideo::from_record(right),
                        details: PairDetails::compare(left, right, policy),
                    });
                    if let Some(ref callback) = context.progress_callback {
                        callback.on_progress(comparisons_so_far(pair, n), "");
                    }
                    cursor = pair;
                }
                Traversal::Exhausted => break,
            }
        }

        if let Some(ref callback) = context.progress_callback {
            callback.on_progress(total_pairs(n), "");
            callback.on_phase_end(PHASE_MATCH);
        }
        log::info!("Found {} matching pair(s) among {} videos", pairs.len(), n);

        let rejections = outcome
            .rejections
            .iter()
            .map(|e| ReportRejection {
                path: display_path(e.path()),
                reason: e.reason(),
                message: e.to_string(),
            })
            .collect();
        let summary = ReportSummary::new(&outcome.stats, policy, pairs.len(), stopped);
        Self {
            pairs,
            rejections,
            summary,
        }
    }

    /// Attach the up-front match estimate, when the summary scan ran.
    #[must_use]
    pub fn with_estimate(mut self, estimate: Option<MatchSummary>) -> Self {
        self.summary.videos_with_match = estimate.map(|s| s.videos);
        self.summary.combined_size = estimate.map(|s| s.combined_size);
        self
    }

    /// Exit code this report maps to.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::for_scan(
            self.summary.interrupted,
            self.summary.pairs,
            self.summary.videos_rejected,
        )
    }
}

impl ReportSummary {
    fn new(
        stats: &PipelineStats,
        policy: &MatchPolicy,
        pairs: usize,
        stopped: bool,
    ) -> Self {
        let interrupted = stats.interrupted || stopped;
        let exit_code = ExitCode::for_scan(interrupted, pairs, stats.rejected);
        Self {
            mode: policy.mode,
            bit_threshold: policy.bit_threshold,
            files_discovered: stats.input_files,
            videos_accepted: stats.accepted,
            videos_rejected: stats.rejected,
            resource_exhausted: stats.resource_exhausted,
            files_skipped: stats.skipped,
            pairs,
            videos_with_match: None,
            combined_size: None,
            interrupted,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}
