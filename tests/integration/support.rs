//! Shared fixtures: a probe that reads its "video" description from the
//! file itself, so copies of a file decode to the same footage.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use image::{Rgb, RgbImage};
use viddupe::cache::VideoMetadata;
use viddupe::probe::{FrameProbe, ProbeError, ProbeReport};
use viddupe::video::{Features, Fingerprint, GrayThumb, VideoRecord};

/// What a fixture file describes. Written as `key=value` lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Footage {
    /// Blocky pattern derived from the seed
    Scene { seed: u64, width: u32, height: u32 },
    /// Black frames
    Blank,
    /// Probe fails
    Broken,
}

impl Footage {
    pub fn scene(seed: u64) -> Self {
        Self::Scene {
            seed,
            width: 64,
            height: 48,
        }
    }

    fn encode(self) -> String {
        match self {
            Self::Scene {
                seed,
                width,
                height,
            } => format!("seed={seed}\nsize={width}x{height}\n"),
            Self::Blank => "blank\n".to_string(),
            Self::Broken => "broken\n".to_string(),
        }
    }

    fn decode(text: &str) -> Self {
        if text.starts_with("blank") {
            return Self::Blank;
        }
        let mut seed = None;
        let (mut width, mut height) = (64, 48);
        for line in text.lines() {
            if let Some(value) = line.strip_prefix("seed=") {
                seed = value.trim().parse().ok();
            } else if let Some(value) = line.strip_prefix("size=") {
                if let Some((w, h)) = value.trim().split_once('x') {
                    width = w.parse().unwrap_or(width);
                    height = h.parse().unwrap_or(height);
                }
            }
        }
        match seed {
            Some(seed) => Self::Scene {
                seed,
                width,
                height,
            },
            None => Self::Broken,
        }
    }
}

/// Write a fixture video and return its path.
pub fn write_video(dir: &Path, name: &str, footage: Footage) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, footage.encode()).unwrap();
    path
}

/// Blocky 8x8 pattern; the same seed renders the same picture at any size.
pub fn scene_frame(seed: u64, width: u32, height: u32) -> RgbImage {
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

/// [`FrameProbe`] that decodes fixture files.
#[derive(Debug)]
pub struct ContentProbe {
    pub duration_ms: u64,
    probes: AtomicUsize,
    captures: AtomicUsize,
}

impl ContentProbe {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            probes: AtomicUsize::new(0),
            captures: AtomicUsize::new(0),
        }
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn capture_count(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    fn footage(path: &Path) -> Footage {
        fs::read_to_string(path)
            .map(|text| Footage::decode(&text))
            .unwrap_or(Footage::Broken)
    }
}

impl FrameProbe for ContentProbe {
    fn probe(&self, path: &Path) -> Result<ProbeReport, ProbeError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        match Self::footage(path) {
            Footage::Scene { width, height, .. } => Ok(ProbeReport {
                duration_ms: self.duration_ms,
                bitrate_kbps: 900,
                framerate: 25.0,
                codec: "h264".into(),
                audio: String::new(),
                width,
                height,
                rotation: 0,
            }),
            Footage::Blank => Ok(ProbeReport {
                duration_ms: self.duration_ms,
                width: 64,
                height: 48,
                ..Default::default()
            }),
            Footage::Broken => Err(ProbeError::Parse {
                path: path.to_path_buf(),
                message: "no video stream".into(),
            }),
        }
    }

    fn capture_frame(&self, path: &Path, offset_ms: u64) -> Option<RgbImage> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        match Self::footage(path) {
            Footage::Scene {
                seed,
                width,
                height,
            } => {
                let percent = offset_ms * 100 / self.duration_ms.max(1);
                Some(scene_frame(seed ^ (percent << 32), width, height))
            }
            Footage::Blank => Some(RgbImage::new(64, 48)),
            Footage::Broken => None,
        }
    }
}

/// Pseudo-random 16x16 thumbnail for synthetic records.
pub fn thumb(seed: u64) -> GrayThumb {
    let mut state = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
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

/// Record built directly from a hash, without any extraction.
pub fn synthetic(path: PathBuf, hash: u64, duration_ms: u64, size: u64) -> VideoRecord {
    VideoRecord {
        path,
        size,
        modified: SystemTime::UNIX_EPOCH,
        metadata: VideoMetadata {
            size,
            duration_ms,
            bitrate_kbps: 1000,
            framerate: 25.0,
            codec: "h264".into(),
            audio: String::new(),
            width: 640,
            height: 360,
        },
        features: Features::single(Fingerprint {
            hash,
            thumb: thumb(hash),
        }),
        preview: Vec::new(),
    }
}

/// Synthetic records backed by small files in `dir`, one per hash.
pub fn synthetic_on_disk(dir: &Path, hashes: &[u64]) -> Vec<VideoRecord> {
    hashes
        .iter()
        .enumerate()
        .map(|(i, &hash)| {
            let path = dir.join(format!("video{i:02}.mp4"));
            fs::write(&path, vec![b'v'; 100 + i]).unwrap();
            synthetic(path, hash, 60_000, 100 + i as u64)
        })
        .collect()
}
