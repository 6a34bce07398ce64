//! Directory walker built on walkdir.
//!
//! # Overview
//!
//! [`Walker`] traverses one root and yields every regular file whose
//! extension is accepted by the [`WalkerConfig`]. Children are visited in
//! file-name order so repeated runs see the same sequence. [`discover`]
//! validates several roots, walks each, and returns one list sorted by a
//! case-insensitive key with repeats removed (overlapping roots, or the
//! same tree given twice in different case).
//!
//! Per-entry problems (unreadable directories, files vanishing mid-walk)
//! are yielded as [`ScanError`] values rather than stopping iteration.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use walkdir::{DirEntry, WalkDir};

use super::path_utils::path_key_folded;
use super::{FileEntry, ScanError, WalkerConfig};

/// Recursive file discovery under one root.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Stop iteration as soon as the flag becomes `true`.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Walk the directory tree, yielding accepted files.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + '_ {
        let skip_hidden = self.config.skip_hidden;

        WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !(skip_hidden && entry.depth() > 0 && is_hidden(entry)))
            .map_while(move |entry| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                    return None;
                }
                Some(entry)
            })
            .filter_map(move |entry| match entry {
                Ok(entry) => self.process_entry(&entry),
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), Path::to_path_buf);
                    let error = match e.into_io_error() {
                        Some(io) => self.handle_io_error(&path, io),
                        None => {
                            log::warn!("Filesystem loop at {}", path.display());
                            ScanError::Io {
                                path,
                                source: std::io::Error::other("filesystem loop"),
                            }
                        }
                    };
                    Some(Err(error))
                }
            })
    }

    fn process_entry(&self, entry: &DirEntry) -> Option<Result<FileEntry, ScanError>> {
        let file_type = entry.file_type();
        if file_type.is_dir() {
            return None;
        }
        if file_type.is_symlink() && !self.config.follow_symlinks {
            log::trace!("Skipping symlink: {}", entry.path().display());
            return None;
        }
        if !self.config.accepts(entry.path()) {
            return None;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                let path = entry.path().to_path_buf();
                return e
                    .into_io_error()
                    .map(|io| Err(self.handle_io_error(&path, io)));
            }
        };
        if !metadata.is_file() {
            return None;
        }

        Some(Ok(FileEntry {
            path: entry.path().to_path_buf(),
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        }))
    }

    fn handle_io_error(&self, path: &Path, error: std::io::Error) -> ScanError {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path.to_path_buf())
            }
            ErrorKind::NotFound => {
                log::debug!("File not found (may have been deleted): {}", path.display());
                ScanError::PathNotFound(path.to_path_buf())
            }
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), error);
                ScanError::Io {
                    path: path.to_path_buf(),
                    source: error,
                }
            }
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// Discover candidate videos under every root.
///
/// Roots are validated first; a missing root or one that is not a
/// directory fails the whole call. Entry-level errors are logged and
/// skipped. The result is sorted by a case-insensitive NFC key, and paths
/// that share that key are kept once.
///
/// # Errors
///
/// [`ScanError::PathNotFound`] / [`ScanError::NotADirectory`] for a bad
/// root, [`ScanError::Interrupted`] when the shutdown flag is set.
pub fn discover(
    roots: &[PathBuf],
    config: &WalkerConfig,
    shutdown: Option<Arc<AtomicBool>>,
) -> Result<Vec<PathBuf>, ScanError> {
    for root in roots {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.clone()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.clone()));
        }
    }

    let mut found: Vec<(String, PathBuf)> = Vec::new();
    for root in roots {
        let mut walker = Walker::new(root, config.clone());
        if let Some(flag) = &shutdown {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }
        for entry in walker.walk() {
            match entry {
                Ok(file) => found.push((path_key_folded(&file.path), file.path)),
                Err(e) => log::debug!("Skipped during discovery: {e}"),
            }
        }
    }

    if shutdown.as_ref().is_some_and(|f| f.load(Ordering::SeqCst)) {
        return Err(ScanError::Interrupted);
    }

    found.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    found.dedup_by(|a, b| a.0 == b.0);
    log::info!("Discovered {} candidate videos", found.len());
    Ok(found.into_iter().map(|(_, path)| path).collect())
}
