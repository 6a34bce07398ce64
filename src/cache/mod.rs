//! Fingerprint cache module.
//!
//! Probing a video and seeking to capture frames is the slowest part of a
//! scan. This module memoizes both across runs.
//!
//! # Architecture
//!
//! * [`identity`]: Derives the [`CacheId`] a file is stored under.
//! * [`entry`]: Defines the data stored per identity.
//! * [`database`]: SQLite persistence, schema versioning and CRUD.
//!
//! # Cache Invalidation
//!
//! Nothing is ever compared for staleness. The identity itself folds in the
//! modification time, so a changed file simply looks up a different key and
//! old rows are orphaned until purged or cleared.
//!
//! Cache failures are never fatal: callers treat a failed read as a miss and
//! skip a failed write.

pub mod database;
pub mod entry;
pub mod identity;

pub use database::{CacheError, CacheResult, FingerprintCache};
pub use entry::{CacheEntry, VideoMetadata};
pub use identity::{identity_for_file, identity_of, CacheId, IdentityScope};
