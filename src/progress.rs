//! Progress reporting using indicatif.
//!
//! [`Progress`] implements [`ProgressCallback`] with one bar per phase:
//!
//! - `discover`: spinner while directories are walked
//! - `extract`: bar over candidate files, with the current file name
//! - `match`: bar over the pairs examined by the report traversal
//!
//! Library code only sees the trait, so tests can record events instead.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Phase name for directory discovery.
pub const PHASE_DISCOVER: &str = "discover";
/// Phase name for feature extraction.
pub const PHASE_EXTRACT: &str = "extract";
/// Phase name for the pairwise match traversal.
pub const PHASE_MATCH: &str = "match";

/// Receiver of progress updates from the scan phases.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts with the number of items it will process
    /// (0 when unknown).
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called as items complete. `current` counts completed items (1-based);
    /// it may arrive out of order from parallel workers.
    fn on_progress(&self, current: usize, path: &str);

    /// Called when an item has been processed, with its size in bytes.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Replace the message shown next to the active bar.
    fn on_message(&self, _message: &str) {}
}

/// Terminal progress bars for a scan.
pub struct Progress {
    multi: MultiProgress,
    discover: Mutex<Option<ProgressBar>>,
    extract: Mutex<Option<ProgressBar>>,
    matching: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("quiet", &self.quiet)
            .finish_non_exhaustive()
    }
}

impl Progress {
    /// Create a reporter; `quiet` suppresses every bar.
    ///
    /// ```
    /// use viddupe::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            discover: Mutex::new(None),
            extract: Mutex::new(None),
            matching: Mutex::new(None),
            quiet,
        }
    }

    fn slot(&self, phase: &str) -> Option<&Mutex<Option<ProgressBar>>> {
        match phase {
            PHASE_DISCOVER => Some(&self.discover),
            PHASE_EXTRACT => Some(&self.extract),
            PHASE_MATCH => Some(&self.matching),
            _ => None,
        }
    }

    /// The bar currently in front: matching, then extraction, then discovery.
    fn active(&self) -> Option<ProgressBar> {
        [&self.matching, &self.extract, &self.discover]
            .into_iter()
            .find_map(|slot| lock(slot).clone())
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn extract_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn match_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.green/blue}] {human_pos}/{human_len} pairs {msg} {per_sec}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }
}

fn lock(slot: &Mutex<Option<ProgressBar>>) -> MutexGuard<'_, Option<ProgressBar>> {
    slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }
        let bar = match phase {
            PHASE_DISCOVER => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(Self::spinner_style());
                pb.set_message("Discovering videos");
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            }
            PHASE_EXTRACT => {
                let pb = ProgressBar::new(total as u64);
                pb.set_style(Self::extract_style());
                pb.set_message("Capturing");
                pb
            }
            PHASE_MATCH => {
                let pb = ProgressBar::new(total as u64);
                pb.set_style(Self::match_style());
                pb
            }
            _ => return,
        };
        let bar = self.multi.add(bar);
        if let Some(slot) = self.slot(phase) {
            *lock(slot) = Some(bar);
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.active() {
            if current as u64 > pb.position() {
                pb.set_position(current as u64);
            }
            if !path.is_empty() {
                pb.set_message(truncate_path(path, 30));
            }
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }
        let Some(slot) = self.slot(phase) else {
            return;
        };
        if let Some(pb) = lock(slot).take() {
            let message = match phase {
                PHASE_DISCOVER => "Discovery complete",
                PHASE_EXTRACT => "Extraction complete",
                _ => "Matching complete",
            };
            pb.finish_with_message(message);
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.active() {
            pb.set_message(message.to_string());
        }
    }
}

/// Shorten a path to at most `max_len` characters, keeping the file name.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }
    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let chars: Vec<char> = file_name.chars().collect();
    if chars.len() + 4 > max_len {
        let keep = max_len.saturating_sub(3);
        let tail: String = chars[chars.len().saturating_sub(keep)..].iter().collect();
        return format!("...{tail}");
    }
    format!(".../{file_name}")
}
