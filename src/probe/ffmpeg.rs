//! `ffprobe`/`ffmpeg` subprocess implementation of [`FrameProbe`].
//!
//! Metadata comes from `ffprobe -print_format json`. Frames are captured by
//! seeking with `ffmpeg -ss` and piping a single BMP frame to stdout, which is
//! decoded in memory with the `image` crate. Every invocation is bounded by a
//! timeout; a timed-out capture is reported the same way as a failed one.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use image::{ImageFormat, RgbImage};
use serde::Deserialize;

use super::{FrameProbe, ProbeError, ProbeReport};

/// Default per-call timeout for probe and capture invocations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Frame probe backed by the ffmpeg command-line tools.
#[derive(Debug, Clone)]
pub struct FfmpegProbe {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    timeout: Duration,
}

impl Default for FfmpegProbe {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl FfmpegProbe {
    /// Create a probe using `ffmpeg` and `ffprobe` from `PATH`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            timeout,
        }
    }

    /// Use explicit tool locations.
    #[must_use]
    pub fn with_binaries(mut self, ffmpeg: PathBuf, ffprobe: PathBuf) -> Self {
        self.ffmpeg = ffmpeg;
        self.ffprobe = ffprobe;
        self
    }

    /// Per-call timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check that both tools can be launched.
    #[must_use]
    pub fn is_available(&self) -> bool {
        [&self.ffmpeg, &self.ffprobe].iter().all(|bin| {
            Command::new(bin)
                .arg("-version")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .is_ok_and(|status| status.success())
        })
    }
}

impl FrameProbe for FfmpegProbe {
    fn probe(&self, path: &Path) -> Result<ProbeReport, ProbeError> {
        let mut command = Command::new(&self.ffprobe);
        command
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path);

        let output = run_with_timeout(command, "ffprobe", path, self.timeout)?;
        parse_probe_output(path, &output)
    }

    fn capture_frame(&self, path: &Path, offset_ms: u64) -> Option<RgbImage> {
        let mut command = Command::new(&self.ffmpeg);
        command
            .args(["-hide_banner", "-loglevel", "error", "-ss"])
            .arg(format_timestamp(offset_ms))
            .arg("-i")
            .arg(path)
            .args([
                "-an", "-frames:v", "1", "-pix_fmt", "rgb24", "-f", "image2pipe", "-vcodec", "bmp",
                "pipe:1",
            ]);

        let output = match run_with_timeout(command, "ffmpeg", path, self.timeout) {
            Ok(output) => output,
            Err(e) => {
                log::debug!("Capture at {}ms failed: {}", offset_ms, e);
                return None;
            }
        };
        if output.is_empty() {
            log::debug!(
                "No frame decoded at {}ms in {}",
                offset_ms,
                path.display()
            );
            return None;
        }

        match image::load_from_memory_with_format(&output, ImageFormat::Bmp) {
            Ok(img) => Some(img.to_rgb8()),
            Err(e) => {
                log::debug!("Undecodable frame from {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Run a command, collecting stdout, and kill it once `timeout` elapses.
fn run_with_timeout(
    mut command: Command,
    tool: &'static str,
    path: &Path,
    timeout: Duration,
) -> Result<Vec<u8>, ProbeError> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| ProbeError::Spawn { tool, source })?;

    let mut stdout = child.stdout.take().ok_or_else(|| ProbeError::Parse {
        path: path.to_path_buf(),
        message: format!("{tool} stdout unavailable"),
    })?;

    // Drain stdout concurrently so a large frame cannot block the child on a full pipe.
    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stdout.read_to_end(&mut buf);
        buf
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProbeError::Timeout {
                    tool,
                    path: path.to_path_buf(),
                    timeout,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => return Err(ProbeError::Spawn { tool, source }),
        }
    };

    let output = reader.join().unwrap_or_default();
    if !status.success() {
        return Err(ProbeError::Failed {
            tool,
            path: path.to_path_buf(),
            status: status.to_string(),
        });
    }
    Ok(output)
}

/// Format milliseconds as `HH:MM:SS.mmm` for `ffmpeg -ss`.
#[must_use]
pub fn format_timestamp(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = ms / 60_000 % 60;
    let seconds = ms / 1000 % 60;
    let millis = ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    bit_rate: Option<String>,
    #[serde(default)]
    tags: std::collections::HashMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<serde_json::Value>,
}

/// Interpret `ffprobe -print_format json` output.
pub fn parse_probe_output(path: &Path, output: &[u8]) -> Result<ProbeReport, ProbeError> {
    let parsed: FfprobeOutput =
        serde_json::from_slice(output).map_err(|e| ProbeError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut report = ProbeReport {
        duration_ms: parsed
            .format
            .duration
            .as_deref()
            .and_then(|d| d.trim().parse::<f64>().ok())
            .map_or(0, |secs| (secs * 1000.0).round().max(0.0) as u64),
        bitrate_kbps: parsed
            .format
            .bit_rate
            .as_deref()
            .and_then(|b| b.trim().parse::<u64>().ok())
            .map_or(0, |bps| (bps / 1000) as u32),
        ..Default::default()
    };

    let kind = |s: &FfprobeStream, wanted: &str| s.codec_type.as_deref() == Some(wanted);

    if let Some(video) = parsed.streams.iter().find(|s| kind(s, "video")) {
        report.codec = video.codec_name.clone().unwrap_or_default();
        report.width = video.width.unwrap_or(0);
        report.height = video.height.unwrap_or(0);
        report.framerate = video
            .avg_frame_rate
            .as_deref()
            .and_then(parse_ratio)
            .or_else(|| video.r_frame_rate.as_deref().and_then(parse_ratio))
            .map_or(0.0, |fps| (fps * 10.0).round() / 10.0);
        report.rotation = stream_rotation(video);
    }

    if let Some(audio) = parsed.streams.iter().find(|s| kind(s, "audio")) {
        report.audio = describe_audio(audio);
    }

    Ok(report)
}

/// Parse an ffprobe rational such as `30000/1001`. `0/0` yields `None`.
fn parse_ratio(value: &str) -> Option<f64> {
    let (num, den) = match value.split_once('/') {
        Some((n, d)) => (n.trim().parse::<f64>().ok()?, d.trim().parse::<f64>().ok()?),
        None => (value.trim().parse::<f64>().ok()?, 1.0),
    };
    if den == 0.0 || num == 0.0 {
        None
    } else {
        Some(num / den)
    }
}

/// Rotation from the legacy `rotate` tag or the display matrix side data.
fn stream_rotation(stream: &FfprobeStream) -> i32 {
    let raw = stream
        .tags
        .get("rotate")
        .and_then(|r| r.trim().parse::<i64>().ok())
        .or_else(|| {
            stream
                .side_data_list
                .iter()
                .find_map(|entry| entry.get("rotation").and_then(serde_json::Value::as_i64))
        })
        .unwrap_or(0);
    raw.rem_euclid(360) as i32
}

fn describe_audio(stream: &FfprobeStream) -> String {
    let mut parts = Vec::new();
    if let Some(codec) = &stream.codec_name {
        parts.push(codec.clone());
    }
    if let Some(rate) = &stream.sample_rate {
        parts.push(format!("{rate} Hz"));
    }
    match stream.channels {
        Some(1) => parts.push("mono".to_string()),
        Some(2) => parts.push("stereo".to_string()),
        Some(n) if n > 0 => parts.push(format!("{n} channels")),
        _ => {}
    }
    if let Some(kbps) = stream
        .bit_rate
        .as_deref()
        .and_then(|b| b.trim().parse::<u64>().ok())
        .filter(|bps| *bps > 0)
        .map(|bps| bps / 1000)
    {
        parts.push(format!("{kbps}kb/s"));
    }
    parts.join(" ")
}
