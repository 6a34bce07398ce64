//! Record builders and a scripted probe shared by unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use image::{Rgb, RgbImage};

use crate::cache::VideoMetadata;
use crate::probe::{FrameProbe, ProbeError, ProbeReport};
use crate::video::{Features, Fingerprint, GrayThumb, VideoRecord};

/// Deterministic pseudo-random 16x16 thumbnail; distinct seeds are
/// structurally unrelated.
pub(crate) fn thumb_pattern(seed: u64) -> GrayThumb {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
    let values = (0..256)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            ((state >> 33) % 256) as f64
        })
        .collect();
    GrayThumb::from_values(16, values).unwrap()
}

pub(crate) fn record_with_samples(
    index: usize,
    samples: &[(u64, GrayThumb)],
    duration_ms: u64,
) -> VideoRecord {
    let samples = samples
        .iter()
        .map(|(hash, thumb)| Fingerprint {
            hash: *hash,
            thumb: thumb.clone(),
        })
        .collect();
    VideoRecord {
        path: PathBuf::from(format!("/videos/clip{index:03}.mp4")),
        size: 1_000_000 + index as u64,
        modified: SystemTime::UNIX_EPOCH,
        metadata: VideoMetadata {
            size: 1_000_000 + index as u64,
            duration_ms,
            bitrate_kbps: 1000,
            framerate: 25.0,
            codec: "h264".into(),
            audio: String::new(),
            width: 640,
            height: 360,
        },
        features: Features::from_samples(samples).unwrap(),
        preview: Vec::new(),
    }
}

pub(crate) fn record(index: usize, hash: u64, duration_ms: u64) -> VideoRecord {
    record_with_samples(index, &[(hash, thumb_pattern(index as u64))], duration_ms)
}

/// Blocky 8x8 pattern; equal seeds render equal frames at any size.
pub(crate) fn scene_frame(seed: u64, width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let bx = u64::from(x * 8 / width);
        let by = u64::from(y * 8 / height);
        let s = (seed ^ (bx * 31 + by * 1_000_003))
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        let v = (s >> 56) as u8;
        Rgb([v, v.wrapping_add(40), v / 2])
    })
}

/// What the scripted probe does for a given file name.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Scene {
    /// Renders [`scene_frame`] with this seed
    Seed(u64),
    /// Renders black frames
    Blank,
    /// Probing fails
    Unreadable,
}

/// In-memory [`FrameProbe`] keyed by file name.
pub(crate) struct FakeProbe {
    pub report: ProbeReport,
    pub scenes: HashMap<String, Scene>,
    /// Captures beyond this offset fail.
    pub last_good_ms: Option<u64>,
    /// Size of captured frames when it differs from the probed size.
    pub frame_size: Option<(u32, u32)>,
    captures: AtomicUsize,
    probes: AtomicUsize,
}

impl FakeProbe {
    pub(crate) fn new(duration_ms: u64, width: u32, height: u32) -> Self {
        Self {
            report: ProbeReport {
                duration_ms,
                bitrate_kbps: 1200,
                framerate: 25.0,
                codec: "h264".into(),
                audio: "aac 48000 Hz stereo".into(),
                width,
                height,
                rotation: 0,
            },
            scenes: HashMap::new(),
            last_good_ms: None,
            frame_size: None,
            captures: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_scene(mut self, name: &str, scene: Scene) -> Self {
        self.scenes.insert(name.to_string(), scene);
        self
    }

    pub(crate) fn failing_after(mut self, offset_ms: u64) -> Self {
        self.last_good_ms = Some(offset_ms);
        self
    }

    pub(crate) fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = Some((width, height));
        self
    }

    pub(crate) fn capture_count(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    pub(crate) fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    fn scene_for(&self, path: &Path) -> Scene {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.scenes.get(&name).copied().unwrap_or_else(|| {
            Scene::Seed(
                name.bytes()
                    .fold(17u64, |acc, b| acc.wrapping_mul(131).wrapping_add(u64::from(b))),
            )
        })
    }
}

impl FrameProbe for FakeProbe {
    fn probe(&self, path: &Path) -> Result<ProbeReport, ProbeError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        match self.scene_for(path) {
            Scene::Unreadable => Err(ProbeError::Parse {
                path: path.to_path_buf(),
                message: "no streams".into(),
            }),
            _ => Ok(self.report.clone()),
        }
    }

    fn capture_frame(&self, path: &Path, offset_ms: u64) -> Option<RgbImage> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        if self.last_good_ms.is_some_and(|limit| offset_ms > limit) {
            return None;
        }
        let (w, h) = self
            .frame_size
            .unwrap_or((self.report.width, self.report.height));
        match self.scene_for(path) {
            Scene::Seed(seed) => {
                let percent = offset_ms * 100 / self.report.duration_ms.max(1);
                Some(scene_frame(seed ^ (percent << 32), w, h))
            }
            Scene::Blank => Some(RgbImage::new(w, h)),
            Scene::Unreadable => None,
        }
    }
}
