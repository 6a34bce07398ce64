//! Side-by-side comparison of a matched pair.

use serde::Serialize;

use crate::matching::{score, MatchPolicy, PairScore};
use crate::video::VideoRecord;

/// Sizes closer than this are reported as equal.
pub const SIZE_TIE_BYTES: u64 = 100 * 1024;
/// Durations closer than this are reported as equal.
pub const DURATION_TIE_MS: u64 = 1000;
/// Frame rates closer than this are reported as equal.
pub const FRAMERATE_TIE: f64 = 0.1;

/// Which side of a pair has the preferable value of some property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Better {
    /// The left file
    Left,
    /// The right file
    Right,
    /// Equal, or too close to call
    Tie,
}

impl Better {
    fn by<T: PartialOrd>(left: T, right: T, tie: bool) -> Self {
        if tie {
            Self::Tie
        } else if left > right {
            Self::Left
        } else if left < right {
            Self::Right
        } else {
            Self::Tie
        }
    }
}

/// Per-property verdicts for the current pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairDetails {
    /// Similarity under the active policy
    pub score: PairScore,
    /// Larger file
    pub size: Better,
    /// Longer runtime
    pub duration: Better,
    /// Higher bitrate
    pub bitrate: Better,
    /// Higher frame rate
    pub framerate: Better,
    /// Older modification time
    pub modified: Better,
    /// More pixels per frame
    pub resolution: Better,
    /// Both files live in the same folder (moving is pointless)
    pub same_folder: bool,
}

impl PairDetails {
    /// Compare two records.
    #[must_use]
    pub fn compare(left: &VideoRecord, right: &VideoRecord, policy: &MatchPolicy) -> Self {
        let (lm, rm) = (&left.metadata, &right.metadata);
        Self {
            score: score(left, right, policy),
            size: Better::by(left.size, right.size, left.size.abs_diff(right.size) <= SIZE_TIE_BYTES),
            duration: Better::by(
                lm.duration_ms,
                rm.duration_ms,
                lm.duration_ms.abs_diff(rm.duration_ms) <= DURATION_TIE_MS,
            ),
            bitrate: Better::by(lm.bitrate_kbps, rm.bitrate_kbps, false),
            framerate: Better::by(
                lm.framerate,
                rm.framerate,
                (lm.framerate - rm.framerate).abs() <= FRAMERATE_TIE,
            ),
            // Earlier wins.
            modified: Better::by(right.modified, left.modified, false),
            resolution: Better::by(left.resolution(), right.resolution(), false),
            same_folder: left.directory() == right.directory(),
        }
    }
}
