//! Frame probe contract.
//!
//! Decoding is delegated to an external tool. The rest of the crate only
//! needs two operations from it:
//!
//! * [`FrameProbe::probe`] - container/stream metadata for a file
//! * [`FrameProbe::capture_frame`] - one decoded RGB frame at a time offset
//!
//! [`FfmpegProbe`] implements the contract by spawning `ffprobe`/`ffmpeg`
//! once per call. Tests substitute in-memory fakes.

pub mod ffmpeg;

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::RgbImage;
use thiserror::Error;

pub use ffmpeg::FfmpegProbe;

/// Raw metadata reported by a probe, before rotation correction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeReport {
    /// Container duration in milliseconds
    pub duration_ms: u64,
    /// Overall bitrate in kb/s
    pub bitrate_kbps: u32,
    /// Frames per second of the video stream
    pub framerate: f64,
    /// Video codec name (e.g. "h264")
    pub codec: String,
    /// Human-readable audio summary (e.g. "aac 48000 Hz stereo 128kb/s")
    pub audio: String,
    /// Coded width in pixels
    pub width: u32,
    /// Coded height in pixels
    pub height: u32,
    /// Display rotation in degrees
    pub rotation: i32,
}

impl ProbeReport {
    /// Whether the report describes something that can be sampled.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.duration_ms > 0 && self.width > 0 && self.height > 0
    }
}

/// Errors raised by a probe implementation.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The external tool could not be started.
    #[error("failed to launch {tool}: {source}")]
    Spawn {
        /// Tool name
        tool: &'static str,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The external tool did not finish within the allowed time.
    #[error("{tool} timed out after {timeout:?} on {path}")]
    Timeout {
        /// Tool name
        tool: &'static str,
        /// File being processed
        path: PathBuf,
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// The external tool exited unsuccessfully.
    #[error("{tool} failed on {path} (status {status})")]
    Failed {
        /// Tool name
        tool: &'static str,
        /// File being processed
        path: PathBuf,
        /// Exit status description
        status: String,
    },

    /// The tool output could not be interpreted.
    #[error("unreadable output for {path}: {message}")]
    Parse {
        /// File being processed
        path: PathBuf,
        /// What went wrong
        message: String,
    },
}

/// Source of metadata and decoded frames for video files.
///
/// Implementations must be shareable across the extraction worker pool.
/// Both calls are expected to be slow; callers never hold locks across them.
pub trait FrameProbe: Send + Sync {
    /// Read container and stream metadata.
    fn probe(&self, path: &Path) -> Result<ProbeReport, ProbeError>;

    /// Decode a single frame at `offset_ms` from the start of the file.
    ///
    /// `None` means decoding or seeking failed at that offset.
    fn capture_frame(&self, path: &Path, offset_ms: u64) -> Option<RgbImage>;
}
