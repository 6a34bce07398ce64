//! Feature extraction for one file.
//!
//! # Pipeline
//!
//! 1. Confirm the file exists and compute its cache identity.
//! 2. Read metadata from the cache or the probe; reject unusable metadata.
//! 3. Capture one frame per layout cell, last cell first. Frames are
//!    softened (downscaled into the per-cell box and JPEG round-tripped)
//!    so a fresh capture and a cached one composite identically.
//! 4. On a failed capture, retreat the reference duration and recapture
//!    every cell until the usable floor is crossed.
//! 5. Composite, hash, build the structural thumbnail and the preview.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbImage};
use thiserror::Error;

use super::layout::ThumbnailLayout;
use super::phash::perceptual_hash;
use super::ssim::{GrayThumb, SSIM_SIZE};
use super::{Features, Fingerprint, VideoRecord};
use crate::cache::{identity_of, CacheId, FingerprintCache, IdentityScope, VideoMetadata};
use crate::probe::FrameProbe;

/// Preview and cache frames fit inside this box.
pub const THUMBNAIL_MAX_WIDTH: u32 = 448;
/// See [`THUMBNAIL_MAX_WIDTH`].
pub const THUMBNAIL_MAX_HEIGHT: u32 = 336;

/// JPEG quality for normal batches.
pub const OK_JPEG_QUALITY: u8 = 60;
/// JPEG quality once a batch exceeds [`HUGE_FILE_COUNT`] files.
pub const LOW_JPEG_QUALITY: u8 = 25;
/// Batch size beyond which previews are compressed harder.
pub const HUGE_FILE_COUNT: usize = 200_000;

/// Largest composite buffer a single file may request.
pub const DEFAULT_MAX_COMPOSITE_BYTES: usize = 1 << 30;

/// Percentage of the duration dropped from the end on each retry.
pub const RETREAT_STEP_PERCENT: u8 = 7;
/// Retries continue while the reference is at least this percentage.
pub const USABLE_FLOOR_PERCENT: u8 = 86;

/// Why a file was rejected from the active set.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Metadata could not be read, or has zero duration or dimensions.
    #[error("{}: metadata unavailable ({reason})", path.display())]
    Probe {
        /// Rejected file
        path: PathBuf,
        /// Probe failure description
        reason: String,
    },

    /// No frame could be captured at any retried reference duration.
    #[error("{}: frame capture failed at {percent}% (reference {reference_percent}% of duration)", path.display())]
    Capture {
        /// Rejected file
        path: PathBuf,
        /// Cell percentage of the last failed capture
        percent: u8,
        /// Reference duration of the last attempt
        reference_percent: u8,
    },

    /// The composite buffer could not be allocated.
    #[error("{}: out of memory allocating {bytes} byte composite", path.display())]
    Allocation {
        /// Rejected file
        path: PathBuf,
        /// Requested size
        bytes: usize,
    },

    /// Every sample hashed to zero (black or single-color captures).
    #[error("{}: captures are blank or monochrome", path.display())]
    DegenerateContent {
        /// Rejected file
        path: PathBuf,
    },

    /// The file disappeared before it could be processed.
    #[error("{}: file no longer exists", path.display())]
    Missing {
        /// Rejected file
        path: PathBuf,
    },
}

impl ExtractError {
    /// The rejected file.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Probe { path, .. }
            | Self::Capture { path, .. }
            | Self::Allocation { path, .. }
            | Self::DegenerateContent { path }
            | Self::Missing { path } => path,
        }
    }

    /// Short machine-readable reason.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Probe { .. } => "probe",
            Self::Capture { .. } => "capture",
            Self::Allocation { .. } => "allocation",
            Self::DegenerateContent { .. } => "degenerate",
            Self::Missing { .. } => "missing",
        }
    }

    /// Resource exhaustion rather than a content problem.
    #[must_use]
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(self, Self::Allocation { .. })
    }
}

/// Settings for one extraction batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionConfig {
    /// Grid of sampled frames
    pub layout: ThumbnailLayout,
    /// JPEG quality for previews and cached frames
    pub jpeg_quality: u8,
    /// How cache identities are derived
    pub identity_scope: IdentityScope,
    /// Upper bound on one composite buffer
    pub max_composite_bytes: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            layout: ThumbnailLayout::default(),
            jpeg_quality: OK_JPEG_QUALITY,
            identity_scope: IdentityScope::default(),
            max_composite_bytes: DEFAULT_MAX_COMPOSITE_BYTES,
        }
    }
}

impl ExtractionConfig {
    /// Set the thumbnail layout.
    #[must_use]
    pub fn with_layout(mut self, layout: ThumbnailLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the JPEG quality (clamped to 1..=100).
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set the cache identity scope.
    #[must_use]
    pub fn with_identity_scope(mut self, scope: IdentityScope) -> Self {
        self.identity_scope = scope;
        self
    }

    /// Set the composite buffer limit.
    #[must_use]
    pub fn with_max_composite_bytes(mut self, bytes: usize) -> Self {
        self.max_composite_bytes = bytes;
        self
    }

    /// Lower the JPEG quality for very large batches.
    #[must_use]
    pub fn for_file_count(mut self, count: usize) -> Self {
        if count > HUGE_FILE_COUNT {
            self.jpeg_quality = self.jpeg_quality.min(LOW_JPEG_QUALITY);
        }
        self
    }

    /// Box each cached frame is fitted into.
    #[must_use]
    pub fn cell_box(&self) -> (u32, u32) {
        (
            (THUMBNAIL_MAX_WIDTH / self.layout.cols()).max(1),
            (THUMBNAIL_MAX_HEIGHT / self.layout.rows()).max(1),
        )
    }

    /// Composite cell size for a `width` x `height` source: the source
    /// fitted into [`cell_box`](Self::cell_box), never enlarged.
    #[must_use]
    pub fn cell_size(&self, width: u32, height: u32) -> (u32, u32) {
        let (box_w, box_h) = self.cell_box();
        fitted_dimensions(width, height, box_w, box_h)
    }
}

/// Reference duration for one round of captures.
///
/// Starts at the full duration and retreats toward the start of the file,
/// since unseekable footage tends to sit at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureAttempt {
    reference_percent: u8,
}

impl CaptureAttempt {
    /// First attempt, against the full duration.
    pub const FIRST: Self = Self {
        reference_percent: 100,
    };

    /// Percentage of the duration treated as the file's length.
    #[must_use]
    pub fn reference_percent(self) -> u8 {
        self.reference_percent
    }

    /// Whether this attempt samples the full duration. Cache slots are
    /// only valid for such captures.
    #[must_use]
    pub fn is_full_duration(self) -> bool {
        self.reference_percent == 100
    }

    /// Offset of cell `percent` within a file of `duration_ms`.
    #[must_use]
    pub fn offset_ms(self, duration_ms: u64, percent: u8) -> u64 {
        duration_ms * u64::from(percent) * u64::from(self.reference_percent) / 10_000
    }

    /// Next attempt, or `None` once the usable floor has been crossed.
    #[must_use]
    pub fn retreat(self) -> Option<Self> {
        (self.reference_percent >= USABLE_FLOOR_PERCENT).then(|| Self {
            reference_percent: self.reference_percent - RETREAT_STEP_PERCENT,
        })
    }
}

impl Default for CaptureAttempt {
    fn default() -> Self {
        Self::FIRST
    }
}

/// Turns files into [`VideoRecord`]s.
pub struct FeatureExtractor<P> {
    probe: P,
    cache: Option<Arc<FingerprintCache>>,
    config: ExtractionConfig,
}

impl<P: FrameProbe> FeatureExtractor<P> {
    /// Create an extractor without a cache.
    pub fn new(probe: P, config: ExtractionConfig) -> Self {
        Self {
            probe,
            cache: None,
            config,
        }
    }

    /// Memoize metadata and captures in `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<FingerprintCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Extraction settings.
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// The probe in use.
    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Probe, capture and fingerprint one file.
    pub fn process(&self, path: &Path) -> Result<VideoRecord, ExtractError> {
        let fs_meta = std::fs::metadata(path)
            .ok()
            .filter(std::fs::Metadata::is_file)
            .ok_or_else(|| ExtractError::Missing {
                path: path.to_path_buf(),
            })?;
        let modified = fs_meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let id = identity_of(path, modified, self.config.identity_scope);

        let metadata = self.metadata_for(path, fs_meta.len(), &id)?;
        if !metadata.is_usable() {
            return Err(ExtractError::Probe {
                path: path.to_path_buf(),
                reason: format!(
                    "duration {}ms, {}x{}",
                    metadata.duration_ms, metadata.width, metadata.height
                ),
            });
        }

        let (features, preview) = self.extract_features(path, &metadata, &id)?;
        Ok(VideoRecord {
            path: path.to_path_buf(),
            size: fs_meta.len(),
            modified,
            metadata,
            features,
            preview,
        })
    }

    /// Cached metadata, or freshly probed metadata written back to the cache.
    pub fn metadata_for(
        &self,
        path: &Path,
        size: u64,
        id: &CacheId,
    ) -> Result<VideoMetadata, ExtractError> {
        if let Some(cache) = &self.cache {
            match cache.read_metadata(id) {
                Ok(Some(meta)) => return Ok(meta),
                Ok(None) => {}
                Err(e) => log::warn!("Cache read failed for {}: {}", path.display(), e),
            }
        }

        let report = self.probe.probe(path).map_err(|e| ExtractError::Probe {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let meta = VideoMetadata::from_probe(&report, size);

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.write_metadata(id, &meta) {
                log::warn!("Cache write failed for {}: {}", path.display(), e);
            }
        }
        Ok(meta)
    }

    /// Capture, composite and fingerprint a file with known metadata.
    ///
    /// Returns the features and a JPEG preview of the composite.
    pub fn extract_features(
        &self,
        path: &Path,
        metadata: &VideoMetadata,
        id: &CacheId,
    ) -> Result<(Features, Vec<u8>), ExtractError> {
        let layout = self.config.layout;
        let (cell_w, cell_h) = self.config.cell_size(metadata.width, metadata.height);
        let mut composite = self.allocate_composite(path, cell_w, cell_h)?;

        let mut attempt = CaptureAttempt::FIRST;
        loop {
            match self.capture_cells(path, metadata, id, attempt, (cell_w, cell_h), &mut composite) {
                Ok(()) => break,
                Err(percent) => match attempt.retreat() {
                    Some(next) => {
                        log::debug!(
                            "{}: capture at {}% failed, retrying with {}% of duration",
                            path.display(),
                            percent,
                            next.reference_percent()
                        );
                        attempt = next;
                    }
                    None => {
                        return Err(ExtractError::Capture {
                            path: path.to_path_buf(),
                            percent,
                            reference_percent: attempt.reference_percent(),
                        })
                    }
                },
            }
        }

        let samples: Vec<Fingerprint> = if layout.is_endpoints() {
            (0..layout.cell_count())
                .map(|index| {
                    let (x, y) = layout.cell_origin(index, cell_w, cell_h);
                    fingerprint(&imageops::crop_imm(&composite, x, y, cell_w, cell_h).to_image())
                })
                .filter(|sample| sample.hash != 0)
                .collect()
        } else {
            let sample = fingerprint(&composite);
            if sample.hash == 0 {
                Vec::new()
            } else {
                vec![sample]
            }
        };

        let features = Features::from_samples(samples).ok_or_else(|| {
            ExtractError::DegenerateContent {
                path: path.to_path_buf(),
            }
        })?;

        let preview = fit_within(&composite, THUMBNAIL_MAX_WIDTH, THUMBNAIL_MAX_HEIGHT);
        let preview = encode_jpeg(&preview, self.config.jpeg_quality).unwrap_or_else(|e| {
            log::warn!("Preview encoding failed for {}: {}", path.display(), e);
            Vec::new()
        });

        Ok((features, preview))
    }

    fn allocate_composite(
        &self,
        path: &Path,
        cell_w: u32,
        cell_h: u32,
    ) -> Result<RgbImage, ExtractError> {
        let layout = self.config.layout;
        let width = cell_w.checked_mul(layout.cols());
        let height = cell_h.checked_mul(layout.rows());
        let bytes = (cell_w as usize)
            .checked_mul(cell_h as usize)
            .and_then(|px| px.checked_mul(3 * layout.cell_count()));

        let too_large = |bytes: usize| ExtractError::Allocation {
            path: path.to_path_buf(),
            bytes,
        };
        let (Some(width), Some(height), Some(bytes)) = (width, height, bytes) else {
            return Err(too_large(usize::MAX));
        };
        if bytes > self.config.max_composite_bytes {
            return Err(too_large(bytes));
        }

        let mut buffer = Vec::new();
        buffer.try_reserve_exact(bytes).map_err(|_| too_large(bytes))?;
        buffer.resize(bytes, 0);
        RgbImage::from_raw(width, height, buffer).ok_or_else(|| too_large(bytes))
    }

    /// Fill every cell of `composite` for one attempt, last cell first.
    ///
    /// On failure returns the percentage that could not be captured.
    fn capture_cells(
        &self,
        path: &Path,
        metadata: &VideoMetadata,
        id: &CacheId,
        attempt: CaptureAttempt,
        (cell_w, cell_h): (u32, u32),
        composite: &mut RgbImage,
    ) -> Result<(), u8> {
        let layout = self.config.layout;

        for (index, &percent) in layout.percentages().iter().enumerate().rev() {
            let frame = self
                .frame_at(path, metadata, id, percent, attempt)
                .ok_or(percent)?;
            let frame = if frame.dimensions() == (cell_w, cell_h) {
                frame
            } else {
                imageops::resize(&frame, cell_w, cell_h, FilterType::Triangle)
            };
            let (x, y) = layout.cell_origin(index, cell_w, cell_h);
            imageops::replace(composite, &frame, i64::from(x), i64::from(y));
        }
        Ok(())
    }

    /// Softened frame for one cell, from cache when possible.
    fn frame_at(
        &self,
        path: &Path,
        metadata: &VideoMetadata,
        id: &CacheId,
        percent: u8,
        attempt: CaptureAttempt,
    ) -> Option<RgbImage> {
        let cache = self.cache.as_deref().filter(|_| attempt.is_full_duration());

        if let Some(cache) = cache {
            match cache.read_frame(id, percent) {
                Ok(Some(bytes)) => match decode_jpeg(&bytes) {
                    Some(frame) => return Some(frame),
                    None => log::debug!("Discarding undecodable cached frame for {}", path.display()),
                },
                Ok(None) => {}
                Err(e) => log::warn!("Cache read failed for {}: {}", path.display(), e),
            }
        }

        let raw = self
            .probe
            .capture_frame(path, attempt.offset_ms(metadata.duration_ms, percent))?;

        let (box_w, box_h) = self.config.cell_box();
        let small = fit_within(&raw, box_w, box_h);
        let jpeg = match encode_jpeg(&small, self.config.jpeg_quality) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                log::debug!("Frame encoding failed for {}: {}", path.display(), e);
                return Some(small);
            }
        };

        if let Some(cache) = cache {
            if let Err(e) = cache.write_frame(id, percent, &jpeg) {
                log::warn!("Cache write failed for {}: {}", path.display(), e);
            }
        }
        Some(decode_jpeg(&jpeg).unwrap_or(small))
    }
}

fn fingerprint(image: &RgbImage) -> Fingerprint {
    Fingerprint {
        hash: perceptual_hash(image),
        thumb: GrayThumb::from_image(image, SSIM_SIZE),
    }
}

/// Scale `image` down to fit `max_w` x `max_h`, keeping aspect ratio.
/// Images that already fit are returned unchanged.
#[must_use]
pub fn fit_within(image: &RgbImage, max_w: u32, max_h: u32) -> RgbImage {
    let (w, h) = image.dimensions();
    let (new_w, new_h) = fitted_dimensions(w, h, max_w, max_h);
    if (new_w, new_h) == (w, h) {
        return image.clone();
    }
    imageops::resize(image, new_w, new_h, FilterType::Triangle)
}

/// Dimensions of `w` x `h` scaled down to fit `max_w` x `max_h`.
fn fitted_dimensions(w: u32, h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if w <= max_w && h <= max_h {
        return (w, h);
    }
    let scale = f64::min(f64::from(max_w) / f64::from(w), f64::from(max_h) / f64::from(h));
    let new_w = ((f64::from(w) * scale).round() as u32).clamp(1, max_w);
    let new_h = ((f64::from(h) * scale).round() as u32).clamp(1, max_h);
    (new_w, new_h)
}

/// Encode as baseline JPEG.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> image::ImageResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, quality).encode_image(image)?;
    Ok(out.into_inner())
}

fn decode_jpeg(bytes: &[u8]) -> Option<RgbImage> {
    image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .ok()
        .map(|img| img.to_rgb8())
}
