//! Candidate discovery: which files on disk should be fingerprinted.
//!
//! # Architecture
//!
//! - [`walker`]: Recursive traversal of one root, plus [`discover`] which
//!   merges several roots into one sorted, de-duplicated list
//! - [`path_utils`]: Unicode normalization and comparison keys
//!
//! # Example
//!
//! ```no_run
//! use viddupe::scanner::{discover, WalkerConfig};
//! use std::path::PathBuf;
//!
//! let roots = vec![PathBuf::from("/media/videos")];
//! let files = discover(&roots, &WalkerConfig::default(), None).unwrap();
//! println!("{} candidate videos", files.len());
//! ```

pub mod path_utils;
pub mod walker;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub use walker::{discover, Walker};

/// Extensions scanned when none are configured.
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &[
    "3gp", "asf", "avi", "divx", "f4v", "flv", "m2ts", "m4v", "mkv", "mov", "mp4", "mpeg",
    "mpg", "mts", "ogm", "ogv", "qt", "rm", "rmvb", "ts", "vob", "webm", "wmv",
];

/// A regular file found during the walk.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Path as produced by the walk (root joined with relative components)
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
}

/// Configuration for directory walking.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal. Loops are reported, not followed.
    pub follow_symlinks: bool,
    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,
    /// Accepted extensions, lower-case without the dot.
    pub extensions: Vec<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            skip_hidden: false,
            extensions: DEFAULT_VIDEO_EXTENSIONS
                .iter()
                .map(|e| (*e).to_string())
                .collect(),
        }
    }
}

impl WalkerConfig {
    /// Configuration accepting the given extensions. Entries such as
    /// `*.MP4` or `.mp4` are normalized; an empty list means the defaults.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cleaned: Vec<String> = extensions
            .into_iter()
            .map(|e| path_utils::clean_extension(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        cleaned.sort();
        cleaned.dedup();
        if !cleaned.is_empty() {
            self.extensions = cleaned;
        }
        self
    }

    /// Follow symbolic links.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Skip dot-files and dot-directories.
    #[must_use]
    pub fn with_skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Whether `path` carries one of the accepted extensions.
    #[must_use]
    pub fn accepts(&self, path: &Path) -> bool {
        path_utils::extension_key(path).is_some_and(|ext| self.extensions.contains(&ext))
    }
}

/// Errors that can occur during discovery.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// A root path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// A root path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Permission was denied when reading a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Discovery was stopped by the shutdown flag.
    #[error("Discovery interrupted")]
    Interrupted,

    /// An I/O error occurred while accessing a path.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
