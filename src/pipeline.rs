//! Parallel feature extraction over a discovered file list.
//!
//! # Overview
//!
//! Each file is handed to [`FeatureExtractor::process`] on a bounded rayon
//! pool. Files are independent: a rejection is recorded and the batch
//! moves on. The shutdown flag is checked before each file starts, so a
//! stop request lets in-flight files finish and skips the rest; whatever
//! completed is still returned for matching.
//!
//! # Example
//!
//! ```no_run
//! use viddupe::pipeline::{extract_all, PipelineConfig};
//! use viddupe::probe::FfmpegProbe;
//! use viddupe::video::{ExtractionConfig, FeatureExtractor};
//! use std::path::PathBuf;
//!
//! let extractor = FeatureExtractor::new(FfmpegProbe::default(), ExtractionConfig::default());
//! let files = vec![PathBuf::from("/videos/a.mp4"), PathBuf::from("/videos/b.mp4")];
//! let outcome = extract_all(files, &extractor, &PipelineConfig::default());
//! println!("{} intact videos", outcome.records.len());
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::probe::FrameProbe;
use crate::progress::{ProgressCallback, PHASE_EXTRACT};
use crate::video::{ExtractError, FeatureExtractor, VideoRecord};

/// Worker pool settings for one extraction run.
#[derive(Clone, Default)]
pub struct PipelineConfig {
    /// Worker threads; 0 uses the available parallelism.
    pub threads: usize,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("threads", &self.threads)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Set the worker count (0 = available parallelism).
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

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

    fn worker_count(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        }
    }
}

/// Counters from one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Files handed to the pipeline
    pub input_files: usize,
    /// Files that produced a record
    pub accepted: usize,
    /// Files rejected for any reason
    pub rejected: usize,
    /// Rejections caused by resource exhaustion
    pub resource_exhausted: usize,
    /// Files never started because of a stop request
    pub skipped: usize,
    /// Whether the run was interrupted by shutdown
    pub interrupted: bool,
}

/// Records and rejections from one extraction run.
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    /// Active set, in input order
    pub records: Vec<VideoRecord>,
    /// Every rejected file with its reason
    pub rejections: Vec<ExtractError>,
    /// Counters
    pub stats: PipelineStats,
}

enum FileOutcome {
    Accepted(VideoRecord),
    Rejected(ExtractError),
    Skipped,
}

/// Extract features for every file on a bounded worker pool.
///
/// The returned records keep the order of `files`, so a sorted discovery
/// list gives a stable pair ordering across runs.
#[must_use]
pub fn extract_all<P: FrameProbe>(
    files: Vec<PathBuf>,
    extractor: &FeatureExtractor<P>,
    config: &PipelineConfig,
) -> PipelineOutcome {
    let mut outcome = PipelineOutcome {
        stats: PipelineStats {
            input_files: files.len(),
            ..Default::default()
        },
        ..Default::default()
    };
    if files.is_empty() {
        log::debug!("Extraction: No files to process");
        return outcome;
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_start(PHASE_EXTRACT, files.len());
    }
    log::info!(
        "Extracting features from {} files ({} layout)",
        files.len(),
        extractor.config().layout
    );

    let run = || -> Vec<FileOutcome> {
        files
            .par_iter()
            .enumerate()
            .map(|(idx, path)| {
                if config.is_shutdown_requested() {
                    return FileOutcome::Skipped;
                }
                let result = extractor.process(path);
                if let Some(ref callback) = config.progress_callback {
                    callback.on_progress(idx + 1, path.to_string_lossy().as_ref());
                }
                match result {
                    Ok(record) => {
                        log::trace!("Extracted: {}", path.display());
                        FileOutcome::Accepted(record)
                    }
                    Err(e) => {
                        log::warn!("Rejected ({}): {}", e.reason(), e);
                        FileOutcome::Rejected(e)
                    }
                }
            })
            .collect()
    };

    let results = match rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_count())
        .build()
    {
        Ok(pool) => pool.install(run),
        Err(e) => {
            log::warn!(
                "Failed to create extraction pool ({}), using global pool with {} threads",
                e,
                rayon::current_num_threads()
            );
            run()
        }
    };

    for result in results {
        match result {
            FileOutcome::Accepted(record) => {
                outcome.stats.accepted += 1;
                outcome.records.push(record);
            }
            FileOutcome::Rejected(e) => {
                outcome.stats.rejected += 1;
                if e.is_resource_exhaustion() {
                    outcome.stats.resource_exhausted += 1;
                }
                outcome.rejections.push(e);
            }
            FileOutcome::Skipped => outcome.stats.skipped += 1,
        }
    }

    if config.is_shutdown_requested() {
        outcome.stats.interrupted = true;
        log::info!(
            "Extraction interrupted: {} files not started",
            outcome.stats.skipped
        );
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_end(PHASE_EXTRACT);
    }

    log::info!(
        "Extraction complete: {} intact video(s) out of {}",
        outcome.stats.accepted,
        outcome.stats.input_files
    );
    outcome
}
