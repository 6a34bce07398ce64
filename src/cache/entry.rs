//! Data stored in the fingerprint cache.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::identity::CacheId;
use crate::probe::ProbeReport;

/// Probed metadata for one file, after rotation correction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// File size in bytes at probe time
    pub size: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Overall bitrate in kb/s
    pub bitrate_kbps: u32,
    /// Frames per second, rounded to one decimal
    pub framerate: f64,
    /// Video codec name
    pub codec: String,
    /// Audio summary
    pub audio: String,
    /// Display width in pixels
    pub width: u32,
    /// Display height in pixels
    pub height: u32,
}

impl VideoMetadata {
    /// Build metadata from a probe report, swapping dimensions for
    /// quarter-turn rotations.
    #[must_use]
    pub fn from_probe(report: &ProbeReport, size: u64) -> Self {
        let (width, height) = match report.rotation.rem_euclid(360) {
            90 | 270 => (report.height, report.width),
            _ => (report.width, report.height),
        };
        Self {
            size,
            duration_ms: report.duration_ms,
            bitrate_kbps: report.bitrate_kbps,
            framerate: (report.framerate * 10.0).round() / 10.0,
            codec: report.codec.clone(),
            audio: report.audio.clone(),
            width,
            height,
        }
    }

    /// Duration and both dimensions are nonzero.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.duration_ms > 0 && self.width > 0 && self.height > 0
    }
}

/// Everything cached for one identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheEntry {
    /// Identity the entry is stored under
    pub id: Option<CacheId>,
    /// Metadata row, if present
    pub metadata: Option<VideoMetadata>,
    /// JPEG-encoded captures keyed by capture percentage
    pub frames: BTreeMap<u8, Vec<u8>>,
}

impl CacheEntry {
    /// Whether nothing at all is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metadata.is_none() && self.frames.is_empty()
    }
}
