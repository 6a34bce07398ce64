//! Command-line interface definitions for viddupe.
//!
//! Defines all CLI arguments with the clap derive API: global options
//! (verbosity, color, error format) and the `scan` subcommand. Policy and
//! extraction flags are optional so that, when absent, the config file and
//! `VIDDUPE_*` environment values apply (see [`crate::config`]).
//!
//! # Example
//!
//! ```bash
//! # Scan two folders with the default fast policy
//! viddupe scan ~/Videos /mnt/archive
//!
//! # Refined comparison with a looser hash threshold, JSON for scripting
//! viddupe scan ~/Videos --mode refined --threshold 52 --output json
//!
//! # Sixteen-frame fingerprints, no persistent cache
//! viddupe -v scan ~/Videos --layout 4x4 --no-cache
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cache::IdentityScope;
use crate::config::ConfigOverrides;
use crate::matching::ComparisonMode;
use crate::video::ThumbnailLayout;

/// Near-duplicate video finder.
///
/// viddupe samples frames from every video, fingerprints them with a
/// perceptual hash (optionally refined by structural similarity), and lists
/// pairs that look like the same footage regardless of encoding, resolution
/// or container.
#[derive(Debug, Parser)]
#[command(name = "viddupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON objects on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (TOML); defaults to config.toml in the platform config directory
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan directories for near-duplicate videos
    Scan(ScanArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directories to scan (searched recursively)
    #[arg(value_name = "PATH", required = true, num_args = 1..)]
    pub paths: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Comparison mode: fast (hash bits only) or refined (hash pre-filter + SSIM)
    #[arg(short, long, value_enum)]
    pub mode: Option<ComparisonMode>,

    /// Minimum agreeing hash bits out of 64 for a match
    #[arg(short, long, value_name = "BITS", value_parser = clap::value_parser!(u32).range(0..=64))]
    pub threshold: Option<u32>,

    /// Structural similarity a refined match must exceed (0.0 to 1.0)
    #[arg(long, value_name = "SCORE", value_parser = parse_unit_interval)]
    pub ssim_threshold: Option<f64>,

    /// SSIM block size; must divide the 16 pixel thumbnail side
    #[arg(long, value_name = "N")]
    pub ssim_block_size: Option<u32>,

    /// Durations within this many milliseconds count as equal
    #[arg(long, value_name = "MS")]
    pub duration_tolerance: Option<u64>,

    /// Agreeing-bit bonus when durations are equal
    #[arg(long, value_name = "BITS")]
    pub same_duration_bonus: Option<u32>,

    /// Agreeing-bit penalty when durations differ
    #[arg(long, value_name = "BITS")]
    pub different_duration_penalty: Option<u32>,

    /// Thumbnail grid sampled from each video
    #[arg(short, long, value_enum)]
    pub layout: Option<ThumbnailLayout>,

    /// Extraction worker threads (0 = all cores)
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Seconds allowed for each ffprobe/ffmpeg call
    #[arg(long, value_name = "SECS")]
    pub capture_timeout: Option<u64>,

    /// Video file extensions to consider (comma-separated, e.g. mp4,mkv)
    #[arg(short, long, value_name = "EXT", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// What identifies a cached file: its name, or its full path
    #[arg(long, value_enum)]
    pub identity_scope: Option<IdentityScope>,

    /// Follow symbolic links during discovery
    ///
    /// Warning: May cause loops if symlinks form cycles.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Path to the fingerprint cache database
    ///
    /// If not specified, a default platform-specific path is used.
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Disable the fingerprint cache
    #[arg(long, conflicts_with = "cache")]
    pub no_cache: bool,

    /// Clear the fingerprint cache before scanning
    #[arg(long, conflicts_with = "no_cache")]
    pub clear_cache: bool,
}

impl ScanArgs {
    /// The flags given on the command line, as the top config layer.
    ///
    /// Boolean switches only override when set, so `skip_hidden = true` in
    /// a config file is not undone by leaving the flag off.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            mode: self.mode,
            threshold: self.threshold,
            ssim_threshold: self.ssim_threshold,
            ssim_block_size: self.ssim_block_size,
            duration_tolerance_ms: self.duration_tolerance,
            same_duration_bonus: self.same_duration_bonus,
            different_duration_penalty: self.different_duration_penalty,
            layout: self.layout,
            threads: self.threads,
            capture_timeout_secs: self.capture_timeout,
            extensions: (!self.extensions.is_empty()).then(|| self.extensions.clone()),
            identity_scope: self.identity_scope,
            cache_path: self.cache.clone(),
            follow_symlinks: self.follow_symlinks.then_some(true),
            skip_hidden: self.skip_hidden.then_some(true),
        }
    }
}

/// Report format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing
    #[default]
    Text,
    /// Machine-readable JSON
    Json,
}

/// Parse a float in `0.0..=1.0`.
pub fn parse_unit_interval(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number: '{s}'"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("Value must be between 0.0 and 1.0, got {value}"))
    }
}
