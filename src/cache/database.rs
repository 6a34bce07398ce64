//! SQLite-backed fingerprint cache.
//!
//! Two logical tables hang off each identity:
//!
//! * `metadata` - one row of probed metadata
//! * `captures` - one JPEG blob per capture percentage
//!
//! A `version` table records the schema version. Opening a store written
//! with a different schema drops and recreates the data tables.
//!
//! The connection sits behind a [`Mutex`] so a single cache can be shared by
//! the extraction worker pool. Statements are short; workers never hold the
//! lock across a probe or capture call.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use super::entry::{CacheEntry, VideoMetadata};
use super::identity::CacheId;

/// Schema version written to the `version` table.
pub const SCHEMA_VERSION: i64 = 2;

/// File name of the cache inside the cache directory.
pub const CACHE_FILE_NAME: &str = "fingerprints.db";

/// Errors from the cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// SQLite reported an error.
    #[error("cache database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The cache file or its directory could not be created.
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A worker panicked while holding the connection.
    #[error("cache connection lock poisoned")]
    Poisoned,
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Persistent store of metadata and captured frames keyed by [`CacheId`].
pub struct FingerprintCache {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for FingerprintCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintCache")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl FingerprintCache {
    /// Open or create the cache at `path`, creating parent directories.
    pub fn open(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::trace!("Cache journal mode: {}", mode);
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::initialize(&conn)?;
        log::debug!("Opened fingerprint cache at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a throwaway in-memory cache.
    pub fn open_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Platform cache location (`<cache dir>/fingerprints.db`).
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "viddupe")
            .map(|dirs| dirs.cache_dir().join(CACHE_FILE_NAME))
    }

    /// Backing file, `None` for in-memory caches.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn initialize(conn: &Connection) -> CacheResult<()> {
        conn.execute_batch("CREATE TABLE IF NOT EXISTS version (version INTEGER NOT NULL)")?;

        let stored: Option<i64> = conn
            .query_row("SELECT version FROM version LIMIT 1", [], |row| row.get(0))
            .optional()?;

        match stored {
            Some(v) if v == SCHEMA_VERSION => {}
            Some(v) => {
                log::info!(
                    "Cache schema version {} differs from {}, rebuilding cache",
                    v,
                    SCHEMA_VERSION
                );
                conn.execute_batch(
                    "DROP TABLE IF EXISTS metadata;
                     DROP TABLE IF EXISTS captures;
                     DELETE FROM version;",
                )?;
                conn.execute("INSERT INTO version (version) VALUES (?1)", params![SCHEMA_VERSION])?;
            }
            None => {
                conn.execute("INSERT INTO version (version) VALUES (?1)", params![SCHEMA_VERSION])?;
            }
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS metadata (
                id TEXT PRIMARY KEY,
                size INTEGER NOT NULL,
                duration INTEGER NOT NULL,
                bitrate INTEGER NOT NULL,
                framerate REAL NOT NULL,
                codec TEXT NOT NULL,
                audio TEXT NOT NULL,
                width INTEGER NOT NULL,
                height INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS captures (
                id TEXT NOT NULL,
                percent INTEGER NOT NULL,
                image BLOB NOT NULL,
                PRIMARY KEY (id, percent)
            );",
        )?;
        Ok(())
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CacheError::Poisoned)
    }

    /// Schema version stored in the database.
    pub fn schema_version(&self) -> CacheResult<Option<i64>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row("SELECT version FROM version LIMIT 1", [], |row| row.get(0))
            .optional()?)
    }

    /// Read cached metadata; `None` is a miss.
    pub fn read_metadata(&self, id: &CacheId) -> CacheResult<Option<VideoMetadata>> {
        let conn = self.lock()?;
        let meta = conn
            .query_row(
                "SELECT size, duration, bitrate, framerate, codec, audio, width, height
                 FROM metadata WHERE id = ?1",
                params![id.as_str()],
                |row| {
                    Ok(VideoMetadata {
                        size: row.get::<_, i64>(0)? as u64,
                        duration_ms: row.get::<_, i64>(1)? as u64,
                        bitrate_kbps: row.get(2)?,
                        framerate: row.get(3)?,
                        codec: row.get(4)?,
                        audio: row.get(5)?,
                        width: row.get(6)?,
                        height: row.get(7)?,
                    })
                },
            )
            .optional()?;
        log::trace!(
            "Cache metadata {} for {}",
            if meta.is_some() { "hit" } else { "miss" },
            id
        );
        Ok(meta)
    }

    /// Insert or replace the metadata row for `id`.
    pub fn write_metadata(&self, id: &CacheId, meta: &VideoMetadata) -> CacheResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO metadata
             (id, size, duration, bitrate, framerate, codec, audio, width, height)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id.as_str(),
                meta.size as i64,
                meta.duration_ms as i64,
                meta.bitrate_kbps,
                meta.framerate,
                meta.codec,
                meta.audio,
                meta.width,
                meta.height,
            ],
        )?;
        Ok(())
    }

    /// Read the capture stored for `percent`; `None` is a miss.
    pub fn read_frame(&self, id: &CacheId, percent: u8) -> CacheResult<Option<Vec<u8>>> {
        let conn = self.lock()?;
        let blob = conn
            .query_row(
                "SELECT image FROM captures WHERE id = ?1 AND percent = ?2",
                params![id.as_str(), percent],
                |row| row.get(0),
            )
            .optional()?;
        log::trace!(
            "Cache frame {}% {} for {}",
            percent,
            if blob.is_some() { "hit" } else { "miss" },
            id
        );
        Ok(blob)
    }

    /// Insert or replace the capture stored for `percent`.
    pub fn write_frame(&self, id: &CacheId, percent: u8, image: &[u8]) -> CacheResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO captures (id, percent, image) VALUES (?1, ?2, ?3)",
            params![id.as_str(), percent, image],
        )?;
        Ok(())
    }

    /// Everything stored for `id`.
    pub fn read_entry(&self, id: &CacheId) -> CacheResult<CacheEntry> {
        let metadata = self.read_metadata(id)?;
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT percent, image FROM captures WHERE id = ?1 ORDER BY percent")?;
        let frames = stmt
            .query_map(params![id.as_str()], |row| {
                Ok((row.get::<_, u8>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<Result<_, _>>()?;
        Ok(CacheEntry {
            id: Some(id.clone()),
            metadata,
            frames,
        })
    }

    /// Delete metadata and every capture for `id` in one transaction.
    ///
    /// Returns `false` when nothing was stored. The file itself need not exist.
    pub fn remove(&self, id: &CacheId) -> CacheResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let metadata_rows = tx.execute("DELETE FROM metadata WHERE id = ?1", params![id.as_str()])?;
        let capture_rows = tx.execute("DELETE FROM captures WHERE id = ?1", params![id.as_str()])?;
        tx.commit()?;

        let removed = metadata_rows + capture_rows > 0;
        if removed {
            log::debug!(
                "Purged cache identity {} ({} capture(s))",
                id,
                capture_rows
            );
        }
        Ok(removed)
    }

    /// Remove every cached row.
    pub fn clear(&self) -> CacheResult<()> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM metadata; DELETE FROM captures;")?;
        log::info!("Cleared fingerprint cache");
        Ok(())
    }

    /// Number of identities with a metadata row.
    pub fn len(&self) -> CacheResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM metadata", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Whether the metadata table is empty.
    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }
}
