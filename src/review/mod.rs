//! Operator review of matching pairs.
//!
//! # Overview
//!
//! A [`ReviewSession`] owns the active set and a [`MatchPolicy`] and keeps
//! the current pair. Stepping uses the pure traversal functions from
//! [`crate::matching`]; the session only decides what to do at the edges:
//!
//! - `next` that finds nothing keeps the current pair
//! - `prev` that runs off the start falls forward to the first match
//! - after deleting or moving one side, stepping continues in the
//!   direction of the last step
//!
//! Files that disappear from disk are skipped by the traversal, so a
//! deleted or moved file leaves the active set without index shuffling.
//!
//! # Example
//!
//! ```no_run
//! use viddupe::matching::MatchPolicy;
//! use viddupe::review::{DeleteMode, ReviewSession, Side};
//! use viddupe::video::VideoRecord;
//!
//! fn prune(records: Vec<VideoRecord>) {
//!     let mut session = ReviewSession::new(records, MatchPolicy::default());
//!     while session.next().pair().is_some() {
//!         let _ = session.delete(Side::Right, DeleteMode::Trash);
//!     }
//!     println!("{} deleted", session.totals().deleted);
//! }
//! ```

pub mod actions;
pub mod details;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

pub use actions::{ActionError, DeleteMode};
pub use details::{Better, PairDetails};

use crate::cache::{identity_for_file, identity_of, CacheId, FingerprintCache, IdentityScope};
use crate::matching::{
    advance_backward, advance_forward, comparisons_so_far, total_pairs, MatchPolicy, PairCursor,
    Traversal,
};
use crate::video::VideoRecord;

/// One side of the current pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Lower index
    Left,
    /// Higher index
    Right,
}

/// Running totals for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReviewTotals {
    /// Files deleted
    pub deleted: usize,
    /// Bytes freed by deletions
    pub reclaimed_bytes: u64,
    /// Files moved to the other side's folder
    pub moved: usize,
    /// Pairs whose names were swapped
    pub swapped: usize,
}

/// Errors from review operations.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// No pair is being shown.
    #[error("no pair selected")]
    NoCurrentPair,

    /// Both files already share a folder.
    #[error("both files are already in {0}")]
    SameFolder(PathBuf),

    /// The filesystem operation failed.
    #[error(transparent)]
    Action(#[from] ActionError),
}

/// Interactive adjudication over a fixed active set.
pub struct ReviewSession {
    records: Vec<VideoRecord>,
    policy: MatchPolicy,
    cursor: PairCursor,
    current: Option<PairCursor>,
    forwards: bool,
    retired: HashSet<PathBuf>,
    cache: Option<Arc<FingerprintCache>>,
    identity_scope: IdentityScope,
    totals: ReviewTotals,
}

impl std::fmt::Debug for ReviewSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewSession")
            .field("records", &self.records.len())
            .field("policy", &self.policy)
            .field("cursor", &self.cursor)
            .field("current", &self.current)
            .field("forwards", &self.forwards)
            .field("cache", &self.cache.as_ref().map(|_| "<cache>"))
            .field("totals", &self.totals)
            .finish()
    }
}

impl ReviewSession {
    /// Start a session before the first pair.
    #[must_use]
    pub fn new(records: Vec<VideoRecord>, policy: MatchPolicy) -> Self {
        Self {
            records,
            policy,
            cursor: PairCursor::START,
            current: None,
            forwards: true,
            retired: HashSet::new(),
            cache: None,
            identity_scope: IdentityScope::default(),
            totals: ReviewTotals::default(),
        }
    }

    /// Purge cache entries of files that are deleted or renamed.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<FingerprintCache>, scope: IdentityScope) -> Self {
        self.cache = Some(cache);
        self.identity_scope = scope;
        self
    }

    /// The active set.
    #[must_use]
    pub fn records(&self) -> &[VideoRecord] {
        &self.records
    }

    /// Policy used for every comparison.
    #[must_use]
    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    /// Change the policy; the next step uses the new values.
    pub fn policy_mut(&mut self) -> &mut MatchPolicy {
        &mut self.policy
    }

    /// Running totals.
    #[must_use]
    pub fn totals(&self) -> ReviewTotals {
        self.totals
    }

    /// Position of the last step.
    #[must_use]
    pub fn cursor(&self) -> PairCursor {
        self.cursor
    }

    /// The pair on display, if any.
    #[must_use]
    pub fn current(&self) -> Option<(&VideoRecord, &VideoRecord)> {
        self.current
            .map(|pair| (&self.records[pair.left], &self.records[pair.right]))
    }

    /// Comparison of the pair on display.
    #[must_use]
    pub fn details(&self) -> Option<PairDetails> {
        self.current()
            .map(|(left, right)| PairDetails::compare(left, right, &self.policy))
    }

    /// `(pairs evaluated, total pairs)` for progress display.
    #[must_use]
    pub fn progress(&self) -> (usize, usize) {
        let n = self.records.len();
        (comparisons_so_far(self.cursor, n), total_pairs(n))
    }

    fn is_live(&self, path: &Path) -> bool {
        !self.retired.contains(path) && path.is_file()
    }

    fn land(&mut self, step: Traversal) -> Traversal {
        if let Traversal::Found(pair) = step {
            self.cursor = pair;
            self.current = Some(pair);
        }
        step
    }

    /// Step to the next matching pair. On exhaustion the current pair stays.
    pub fn next(&mut self) -> Traversal {
        self.forwards = true;
        let step = advance_forward(self.cursor, &self.records, &self.policy, |p| self.is_live(p));
        if step == Traversal::Exhausted {
            log::debug!("No further matching pairs");
        }
        self.land(step)
    }

    /// Step to the previous matching pair, falling forward from the start
    /// when there is none.
    pub fn prev(&mut self) -> Traversal {
        self.forwards = false;
        let step = advance_backward(self.cursor, &self.records, &self.policy, |p| self.is_live(p));
        match step {
            Traversal::Found(_) => self.land(step),
            Traversal::Exhausted => {
                self.forwards = true;
                let step =
                    advance_forward(PairCursor::START, &self.records, &self.policy, |p| self.is_live(p));
                self.land(step)
            }
        }
    }

    /// Continue in the last direction after `side` left the active set.
    fn step_past(&mut self, side: Side) -> Traversal {
        if side == Side::Left {
            let left = self.cursor.left + 1;
            self.cursor = PairCursor { left, right: left };
        }
        self.current = None;
        if self.forwards {
            self.next()
        } else {
            self.prev()
        }
    }

    fn index_of(&self, side: Side) -> Result<usize, ReviewError> {
        let pair = self.current.ok_or(ReviewError::NoCurrentPair)?;
        Ok(match side {
            Side::Left => pair.left,
            Side::Right => pair.right,
        })
    }

    fn identity(&self, record: &VideoRecord) -> CacheId {
        identity_for_file(&record.path, self.identity_scope)
            .unwrap_or_else(|_| identity_of(&record.path, record.modified, self.identity_scope))
    }

    fn purge(&self, id: &CacheId, path: &Path) {
        if let Some(cache) = &self.cache {
            match cache.remove(id) {
                Ok(true) => log::trace!("Purged cache entry for {}", path.display()),
                Ok(false) => {}
                Err(e) => log::warn!("Cache purge failed for {}: {}", path.display(), e),
            }
        }
    }

    /// Delete one side and step onward.
    ///
    /// A file that is already gone is skipped without counting.
    pub fn delete(&mut self, side: Side, mode: DeleteMode) -> Result<Traversal, ReviewError> {
        let index = self.index_of(side)?;
        let record = &self.records[index];
        if !record.path.is_file() {
            return Ok(self.step_past(side));
        }

        let id = self.identity(record);
        actions::delete_file(&record.path, mode)?;
        self.totals.deleted += 1;
        self.totals.reclaimed_bytes += record.size;
        self.purge(&id, &record.path);
        Ok(self.step_past(side))
    }

    /// Move one side into the other side's folder and step onward.
    ///
    /// The record follows the file but is retired from traversal.
    pub fn move_to_other_folder(&mut self, side: Side) -> Result<Traversal, ReviewError> {
        let index = self.index_of(side)?;
        let other = match side {
            Side::Left => self.index_of(Side::Right)?,
            Side::Right => self.index_of(Side::Left)?,
        };
        let folder = self.records[other].directory().to_path_buf();
        if self.records[index].directory() == folder {
            return Err(ReviewError::SameFolder(folder));
        }
        if !self.records[index].path.is_file() {
            return Ok(self.step_past(side));
        }

        let old_id = self.identity(&self.records[index]);
        let new_path = actions::move_into(&self.records[index].path, &folder)?;
        if self.identity_scope == IdentityScope::FullPath {
            self.purge(&old_id, &self.records[index].path);
        }
        self.records[index].path = new_path.clone();
        self.retired.insert(new_path);
        self.totals.moved += 1;
        Ok(self.step_past(side))
    }

    /// Exchange the two files' names (extensions stay put).
    ///
    /// Records are updated in place and cache entries of the old names are
    /// purged. The cursor does not move.
    pub fn swap_names(&mut self) -> Result<(), ReviewError> {
        let left = self.index_of(Side::Left)?;
        let right = self.index_of(Side::Right)?;
        let old_ids = (
            self.identity(&self.records[left]),
            self.identity(&self.records[right]),
        );

        let (new_left, new_right) =
            actions::swap_file_names(&self.records[left].path, &self.records[right].path)?;
        self.purge(&old_ids.0, &self.records[left].path);
        self.purge(&old_ids.1, &self.records[right].path);
        self.records[left].path = new_left;
        self.records[right].path = new_right;
        self.totals.swapped += 1;
        Ok(())
    }
}
