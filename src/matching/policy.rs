//! Tunable match policy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::video::ssim::{block_size_fits, SSIM_SIZE};

/// Lowest agreeing-bit count that can still trigger a structural comparison
/// in refined mode.
pub const REFINED_GATE_FLOOR: u32 = 44;

/// Largest duration bonus or penalty; one full hash width.
pub const MAX_DURATION_MODIFIER: u32 = 64;

/// Default minimum agreeing bits.
pub const DEFAULT_BIT_THRESHOLD: u32 = 57;
/// Default structural similarity threshold.
pub const DEFAULT_STRUCTURAL_THRESHOLD: f64 = 0.89;
/// Default SSIM block size.
pub const DEFAULT_SSIM_BLOCK_SIZE: u32 = 16;
/// Default duration window in milliseconds.
pub const DEFAULT_DURATION_TOLERANCE_MS: u64 = 1000;

/// How pairs are compared.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMode {
    /// Agreeing hash bits only
    #[default]
    Fast,
    /// Hash pre-filter followed by structural similarity
    Refined,
}

impl std::fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Refined => write!(f, "refined"),
        }
    }
}

/// Invalid policy values.
#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    /// Bit threshold outside 0..=64.
    #[error("bit threshold must be between 0 and 64, got {0}")]
    BitThreshold(u32),
    /// Structural threshold outside 0.0..=1.0.
    #[error("structural threshold must be between 0.0 and 1.0, got {0}")]
    StructuralThreshold(f64),
    /// Block size does not tile the structural thumbnail.
    #[error("SSIM block size {0} must evenly divide {SSIM_SIZE}")]
    BlockSize(u32),
    /// Duration bonus or penalty above 64.
    #[error("duration modifiers must be between 0 and {MAX_DURATION_MODIFIER}, got {0}")]
    DurationModifier(u32),
}

/// Thresholds and modifiers consulted on every comparison.
///
/// The policy is plain data. The engine only reads it, so a caller may
/// change fields between comparisons and the next comparison picks them up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPolicy {
    /// Comparison mode
    pub mode: ComparisonMode,
    /// Minimum adjusted agreeing bits (0..=64)
    pub bit_threshold: u32,
    /// Adjusted SSIM must exceed this (0.0..=1.0)
    pub structural_threshold: f64,
    /// SSIM block size; must divide the thumbnail side
    pub ssim_block_size: u32,
    /// Durations within this many milliseconds count as equal
    pub duration_tolerance_ms: u64,
    /// Added to agreement when durations are equal
    pub same_duration_bonus: u32,
    /// Subtracted from agreement when durations differ
    pub different_duration_penalty: u32,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            mode: ComparisonMode::Fast,
            bit_threshold: DEFAULT_BIT_THRESHOLD,
            structural_threshold: DEFAULT_STRUCTURAL_THRESHOLD,
            ssim_block_size: DEFAULT_SSIM_BLOCK_SIZE,
            duration_tolerance_ms: DEFAULT_DURATION_TOLERANCE_MS,
            same_duration_bonus: 1,
            different_duration_penalty: 4,
        }
    }
}

impl MatchPolicy {
    /// Set the comparison mode.
    #[must_use]
    pub fn with_mode(mut self, mode: ComparisonMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the agreeing-bit threshold.
    #[must_use]
    pub fn with_bit_threshold(mut self, threshold: u32) -> Self {
        self.bit_threshold = threshold;
        self
    }

    /// Set the structural similarity threshold.
    #[must_use]
    pub fn with_structural_threshold(mut self, threshold: f64) -> Self {
        self.structural_threshold = threshold;
        self
    }

    /// Set the SSIM block size.
    #[must_use]
    pub fn with_ssim_block_size(mut self, block_size: u32) -> Self {
        self.ssim_block_size = block_size;
        self
    }

    /// Set the duration tolerance.
    #[must_use]
    pub fn with_duration_tolerance_ms(mut self, tolerance: u64) -> Self {
        self.duration_tolerance_ms = tolerance;
        self
    }

    /// Set both duration modifiers.
    #[must_use]
    pub fn with_duration_modifiers(mut self, bonus: u32, penalty: u32) -> Self {
        self.same_duration_bonus = bonus;
        self.different_duration_penalty = penalty;
        self
    }

    /// Check every field is in range.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.bit_threshold > 64 {
            return Err(PolicyError::BitThreshold(self.bit_threshold));
        }
        if !(0.0..=1.0).contains(&self.structural_threshold) {
            return Err(PolicyError::StructuralThreshold(self.structural_threshold));
        }
        if !block_size_fits(SSIM_SIZE, self.ssim_block_size) {
            return Err(PolicyError::BlockSize(self.ssim_block_size));
        }
        for modifier in [self.same_duration_bonus, self.different_duration_penalty] {
            if modifier > MAX_DURATION_MODIFIER {
                return Err(PolicyError::DurationModifier(modifier));
            }
        }
        Ok(())
    }

    /// Signed agreement adjustment for two durations, bounded to one hash
    /// width in either direction.
    #[must_use]
    pub fn duration_adjustment(&self, a_ms: u64, b_ms: u64) -> i32 {
        if a_ms.abs_diff(b_ms) <= self.duration_tolerance_ms {
            self.same_duration_bonus.min(MAX_DURATION_MODIFIER) as i32
        } else {
            -(self.different_duration_penalty.min(MAX_DURATION_MODIFIER) as i32)
        }
    }

    /// Adjusted agreement needed before a structural comparison is made.
    #[must_use]
    pub fn refined_gate(&self) -> u32 {
        self.bit_threshold.min(REFINED_GATE_FLOOR)
    }
}
