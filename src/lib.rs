//! viddupe - Near-Duplicate Video Finder
//!
//! Finds videos that show the same footage despite different encodings,
//! resolutions or containers. Each file is sampled into a grid of frames,
//! fingerprinted with a 64-bit perceptual hash (and optionally a grayscale
//! thumbnail for structural similarity), and every pair of the resulting
//! active set is compared under a tunable [`matching::MatchPolicy`].
//! Probe results and captured frames are kept in a SQLite cache so repeat
//! scans skip the expensive decoding.
//!
//! # Architecture
//!
//! ```text
//! scanner::discover -> pipeline::extract_all -> output::MatchReport
//!                         |   (video + probe + cache)      |
//!                         v                               v
//!                   Vec<VideoRecord>  --------->  matching / review
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod matching;
pub mod output;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod review;
pub mod scanner;
pub mod signal;
pub mod video;

#[cfg(test)]
pub(crate) mod testing;

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use anyhow::Context;

use crate::cache::FingerprintCache;
use crate::cli::{Cli, Commands, OutputFormat, ScanArgs};
use crate::config::Config;
use crate::error::ExitCode;
use crate::matching::summarize_alongside;
use crate::output::{JsonOutput, MatchReport, ReportContext, TextOutput};
use crate::pipeline::{extract_all, PipelineConfig};
use crate::probe::FfmpegProbe;
use crate::progress::{Progress, ProgressCallback, PHASE_DISCOVER};
use crate::video::FeatureExtractor;

/// Run the parsed command and return the exit code to report.
///
/// # Errors
///
/// Configuration, discovery and output failures. A stop request during
/// discovery surfaces as [`scanner::ScanError::Interrupted`]; once
/// extraction has started, a stop yields a partial report and
/// [`ExitCode::Interrupted`] instead.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color || !io::stdout().is_terminal() {
        yansi::disable();
    }

    match cli.command {
        Commands::Scan(ref args) => run_scan(&cli, args),
    }
}

fn run_scan(cli: &Cli, args: &ScanArgs) -> anyhow::Result<ExitCode> {
    let config = Config::load(cli.config.as_deref(), &args.overrides())
        .context("Failed to load configuration")?;
    let policy = config.policy()?;
    log::debug!("Effective configuration: {config:?}");

    let handler = signal::install_handler()?;
    let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::new(cli.quiet));

    progress.on_phase_start(PHASE_DISCOVER, 0);
    let discovered = scanner::discover(&args.paths, &config.walker(), Some(handler.get_flag()));
    progress.on_phase_end(PHASE_DISCOVER);
    let files = discovered?;

    let probe = FfmpegProbe::new(config.capture_timeout());
    if !files.is_empty() && !probe.is_available() {
        anyhow::bail!("ffprobe/ffmpeg not found; install FFmpeg and make sure it is on PATH");
    }

    let mut extractor = FeatureExtractor::new(probe, config.extraction(files.len()));
    if let Some(cache) = open_cache(args, &config) {
        extractor = extractor.with_cache(cache);
    }
    let pipeline = PipelineConfig::default()
        .with_threads(config.threads)
        .with_shutdown_flag(handler.get_flag())
        .with_progress_callback(Arc::clone(&progress));
    let outcome = extract_all(files, &extractor, &pipeline);

    let context = ReportContext::default()
        .with_shutdown_flag(handler.get_flag())
        .with_progress_callback(progress);
    let (report, estimate) = summarize_alongside(&outcome.records, &policy, || {
        MatchReport::build(&outcome, &policy, &context)
    });
    let report = report.with_estimate(estimate);

    write_report(&report, args.output)?;
    Ok(report.exit_code())
}

/// Open (or skip) the persistent cache. Failure to open is not fatal.
fn open_cache(args: &ScanArgs, config: &Config) -> Option<Arc<FingerprintCache>> {
    if args.no_cache {
        log::info!("Fingerprint cache disabled");
        return None;
    }
    let Some(path) = config.cache_path.clone().or_else(FingerprintCache::default_path) else {
        log::warn!("No cache directory available; continuing without cache");
        return None;
    };
    let cache = match FingerprintCache::open(&path) {
        Ok(cache) => cache,
        Err(e) => {
            log::warn!("Cache unavailable at {}: {}", path.display(), e);
            return None;
        }
    };
    if args.clear_cache {
        match cache.clear() {
            Ok(()) => log::info!("Cleared fingerprint cache at {}", path.display()),
            Err(e) => log::warn!("Failed to clear cache: {e}"),
        }
    }
    Some(Arc::new(cache))
}

fn write_report(report: &MatchReport, format: OutputFormat) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Text => TextOutput::new(report)
            .write_to(&mut out)
            .context("Failed to write report")?,
        OutputFormat::Json => JsonOutput::new(report)
            .write_to(&mut out, true)
            .context("Failed to write JSON report")?,
    }
    out.flush().context("Failed to flush output")?;
    Ok(())
}
