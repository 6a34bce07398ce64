//! Per-file feature extraction.
//!
//! # Architecture
//!
//! * [`layout`]: Capture positions and grid geometry.
//! * [`phash`]: 64-bit DCT perceptual hash.
//! * [`ssim`]: Structural thumbnails and block SSIM.
//! * [`extract`]: Turns a file into a [`VideoRecord`] using a
//!   [`FrameProbe`](crate::probe::FrameProbe) and the fingerprint cache.
//!
//! A record only exists for files that probed with nonzero duration and
//! dimensions and produced at least one non-degenerate fingerprint.

pub mod extract;
pub mod layout;
pub mod phash;
pub mod ssim;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;

pub use crate::cache::VideoMetadata;
pub use extract::{CaptureAttempt, ExtractError, ExtractionConfig, FeatureExtractor};
pub use layout::ThumbnailLayout;
pub use ssim::GrayThumb;

/// Hash and structural thumbnail derived from one composite (or one
/// endpoint frame).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fingerprint {
    /// 64-bit perceptual hash, never 0 for an accepted sample
    pub hash: u64,
    /// Grayscale structural thumbnail
    #[serde(skip)]
    pub thumb: GrayThumb,
}

/// One or two fingerprints for a file.
///
/// Grid layouts produce one; the endpoints layout produces up to two.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Features {
    samples: Vec<Fingerprint>,
}

impl Features {
    /// Most samples a file can carry.
    pub const MAX_SAMPLES: usize = 2;

    /// Features with a single sample.
    #[must_use]
    pub fn single(sample: Fingerprint) -> Self {
        Self {
            samples: vec![sample],
        }
    }

    /// Build from samples. `None` if empty or more than [`Self::MAX_SAMPLES`].
    #[must_use]
    pub fn from_samples(samples: Vec<Fingerprint>) -> Option<Self> {
        (!samples.is_empty() && samples.len() <= Self::MAX_SAMPLES).then_some(Self { samples })
    }

    /// All samples; never empty.
    #[must_use]
    pub fn samples(&self) -> &[Fingerprint] {
        &self.samples
    }

    /// First sample.
    #[must_use]
    pub fn primary(&self) -> &Fingerprint {
        &self.samples[0]
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A file in the active set.
#[derive(Debug, Clone, Serialize)]
pub struct VideoRecord {
    /// Absolute path; updated in place on rename or move
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
    /// Probed metadata
    pub metadata: VideoMetadata,
    /// Fingerprints used for matching
    pub features: Features,
    /// JPEG preview of the composite
    #[serde(skip)]
    pub preview: Vec<u8>,
}

impl VideoRecord {
    /// Duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.metadata.duration_ms
    }

    /// Hash of the primary sample.
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.features.primary().hash
    }

    /// Pixel count of one frame.
    #[must_use]
    pub fn resolution(&self) -> u64 {
        u64::from(self.metadata.width) * u64::from(self.metadata.height)
    }

    /// Final path component, lossily converted.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Containing directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Whether the file is still on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}
