//! Cache identities.
//!
//! An identity is a digest of a normalized name plus the file's modification
//! time. Touching or re-encoding a file changes its mtime and therefore its
//! identity, so stale captures are never served for a changed file.

use std::fmt;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scanner::path_utils::{file_name_key, path_key};

/// Which part of the path participates in the identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityScope {
    /// File name only: a moved but unmodified file still hits the cache.
    #[default]
    FileName,
    /// Full path: moving a file re-identifies it.
    FullPath,
}

/// Stable cache key for one version of one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheId(String);

impl CacheId {
    /// Hex digest backing this identity.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap a previously computed digest (e.g. read back from the store).
    #[must_use]
    pub fn from_digest(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }
}

impl fmt::Display for CacheId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the identity of `path` as it was at `modified`.
///
/// Pure: the same `(path, modified, scope)` always yields the same id.
#[must_use]
pub fn identity_of(path: &Path, modified: SystemTime, scope: IdentityScope) -> CacheId {
    let name = match scope {
        IdentityScope::FileName => file_name_key(path),
        IdentityScope::FullPath => path_key(path).to_lowercase(),
    };
    let stamp = DateTime::<Utc>::from(modified).format("%Y-%m-%d %H:%M:%S%.9f");

    let mut hasher = blake3::Hasher::new();
    hasher.update(name.as_bytes());
    hasher.update(b"_");
    hasher.update(stamp.to_string().as_bytes());
    CacheId(hasher.finalize().to_hex().to_string())
}

/// Compute the identity of an existing file from its current mtime.
pub fn identity_for_file(path: &Path, scope: IdentityScope) -> io::Result<CacheId> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(identity_of(path, modified, scope))
}
