//! Filesystem operations behind operator decisions.
//!
//! # Overview
//!
//! - [`delete_file`]: move to the system trash (default) or remove permanently
//! - [`move_into`]: move a file into another folder, never overwriting
//! - [`swap_file_names`]: exchange the stems of two files, keeping each
//!   file's own extension
//!
//! Every operation checks the source still exists first and reports a
//! path-specific [`ActionError`] otherwise.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Temporary name used while two files exchange names.
const SWAP_TEMP_NAME: &str = ".viddupe-swap.tmp";

/// How a deleted file is disposed of.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    /// Move to the system trash (recoverable)
    #[default]
    Trash,
    /// Remove immediately
    Permanent,
}

/// Error type for review actions.
#[derive(Debug, Error)]
pub enum ActionError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when touching the file.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed {
        /// File being deleted
        path: PathBuf,
        /// Platform error text
        message: String,
    },

    /// Something already occupies the destination.
    #[error("destination already exists: {0}")]
    TargetExists(PathBuf),

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ActionError {
    fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

fn require_file(path: &Path) -> Result<u64, ActionError> {
    let metadata = fs::metadata(path).map_err(|e| ActionError::from_io(path, e))?;
    if metadata.is_file() {
        Ok(metadata.len())
    } else {
        Err(ActionError::NotFound(path.to_path_buf()))
    }
}

/// Delete a file, returning the size it occupied.
pub fn delete_file(path: &Path, mode: DeleteMode) -> Result<u64, ActionError> {
    let size = require_file(path)?;
    match mode {
        DeleteMode::Trash => {
            trash::delete(path).map_err(|e| {
                log::error!("Trash operation failed for {}: {}", path.display(), e);
                ActionError::TrashFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            })?;
            log::info!("Moved to trash: {} ({} bytes)", path.display(), size);
        }
        DeleteMode::Permanent => {
            fs::remove_file(path).map_err(|e| {
                log::error!("Permanent delete failed for {}: {}", path.display(), e);
                ActionError::from_io(path, e)
            })?;
            log::info!("Permanently deleted: {} ({} bytes)", path.display(), size);
        }
    }
    Ok(size)
}

/// Move `path` into `folder` under its current name.
///
/// Returns the new path. An existing file at the destination is never
/// replaced.
pub fn move_into(path: &Path, folder: &Path) -> Result<PathBuf, ActionError> {
    require_file(path)?;
    let name = path
        .file_name()
        .ok_or_else(|| ActionError::NotFound(path.to_path_buf()))?;
    let target = folder.join(name);
    if target.exists() {
        return Err(ActionError::TargetExists(target));
    }
    fs::rename(path, &target).map_err(|e| ActionError::from_io(path, e))?;
    log::info!("Moved {} to {}", path.display(), folder.display());
    Ok(target)
}

/// Name `path` would get with `stem` and its own extension.
fn renamed(path: &Path, stem: &std::ffi::OsStr) -> PathBuf {
    let mut name = stem.to_os_string();
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}

/// Exchange the stems of two files; each keeps its extension and folder.
///
/// Returns the new `(left, right)` paths. When a step fails, completed
/// renames are rolled back.
pub fn swap_file_names(left: &Path, right: &Path) -> Result<(PathBuf, PathBuf), ActionError> {
    require_file(left)?;
    require_file(right)?;
    let left_stem = left
        .file_stem()
        .ok_or_else(|| ActionError::NotFound(left.to_path_buf()))?;
    let right_stem = right
        .file_stem()
        .ok_or_else(|| ActionError::NotFound(right.to_path_buf()))?;

    let new_left = renamed(left, right_stem);
    let new_right = renamed(right, left_stem);
    if new_left == left && new_right == right {
        return Ok((new_left, new_right));
    }
    if new_left.exists() && new_left != right {
        return Err(ActionError::TargetExists(new_left));
    }
    if new_right.exists() && new_right != left {
        return Err(ActionError::TargetExists(new_right));
    }
    let temp = left.with_file_name(SWAP_TEMP_NAME);
    if temp.exists() {
        return Err(ActionError::TargetExists(temp));
    }

    fs::rename(left, &temp).map_err(|e| ActionError::from_io(left, e))?;
    if let Err(e) = fs::rename(right, &new_right) {
        let _ = fs::rename(&temp, left);
        return Err(ActionError::from_io(right, e));
    }
    if let Err(e) = fs::rename(&temp, &new_left) {
        let _ = fs::rename(&new_right, right);
        let _ = fs::rename(&temp, left);
        return Err(ActionError::from_io(left, e));
    }

    log::info!(
        "Swapped names: {} <-> {}",
        new_left.display(),
        new_right.display()
    );
    Ok((new_left, new_right))
}
