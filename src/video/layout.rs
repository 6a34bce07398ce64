//! Thumbnail grid layouts.
//!
//! A layout fixes how many frames are sampled, at which percentage of the
//! reference duration, and where each frame lands in the composite image.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Grid of sampled frames forming one composite.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum ThumbnailLayout {
    /// One frame
    #[serde(rename = "1x1")]
    #[value(name = "1x1")]
    Grid1x1,
    /// Two frames side by side
    #[serde(rename = "2x1")]
    #[value(name = "2x1")]
    Grid2x1,
    /// Three frames side by side
    #[serde(rename = "3x1")]
    #[value(name = "3x1")]
    Grid3x1,
    /// Four frames in a square
    #[default]
    #[serde(rename = "2x2")]
    #[value(name = "2x2")]
    Grid2x2,
    /// Six frames
    #[serde(rename = "3x2")]
    #[value(name = "3x2")]
    Grid3x2,
    /// Nine frames
    #[serde(rename = "3x3")]
    #[value(name = "3x3")]
    Grid3x3,
    /// Twelve frames
    #[serde(rename = "4x3")]
    #[value(name = "4x3")]
    Grid4x3,
    /// Sixteen frames
    #[serde(rename = "4x4")]
    #[value(name = "4x4")]
    Grid4x4,
    /// One frame near each end, fingerprinted independently
    #[serde(rename = "endpoints")]
    #[value(name = "endpoints")]
    Endpoints,
}

const P_1X1: &[u8] = &[48];
const P_2X1: &[u8] = &[32, 64];
const P_3X1: &[u8] = &[24, 48, 72];
const P_2X2: &[u8] = &[16, 40, 56, 80];
const P_3X2: &[u8] = &[16, 32, 48, 64, 72, 88];
const P_3X3: &[u8] = &[8, 16, 32, 40, 48, 56, 72, 80, 88];
const P_4X3: &[u8] = &[8, 16, 24, 32, 40, 48, 56, 64, 72, 80, 88, 96];
const P_4X4: &[u8] = &[6, 12, 18, 24, 30, 36, 42, 48, 54, 60, 66, 72, 78, 84, 90, 96];
const P_ENDPOINTS: &[u8] = &[6, 94];

impl ThumbnailLayout {
    /// Every layout, smallest first.
    pub const ALL: [Self; 9] = [
        Self::Grid1x1,
        Self::Grid2x1,
        Self::Grid3x1,
        Self::Grid2x2,
        Self::Grid3x2,
        Self::Grid3x3,
        Self::Grid4x3,
        Self::Grid4x4,
        Self::Endpoints,
    ];

    /// Capture positions as percentages of the reference duration, in
    /// cell order (row-major).
    #[must_use]
    pub fn percentages(self) -> &'static [u8] {
        match self {
            Self::Grid1x1 => P_1X1,
            Self::Grid2x1 => P_2X1,
            Self::Grid3x1 => P_3X1,
            Self::Grid2x2 => P_2X2,
            Self::Grid3x2 => P_3X2,
            Self::Grid3x3 => P_3X3,
            Self::Grid4x3 => P_4X3,
            Self::Grid4x4 => P_4X4,
            Self::Endpoints => P_ENDPOINTS,
        }
    }

    /// Grid columns.
    #[must_use]
    pub fn cols(self) -> u32 {
        match self {
            Self::Grid1x1 => 1,
            Self::Grid2x1 | Self::Grid2x2 | Self::Endpoints => 2,
            Self::Grid3x1 | Self::Grid3x2 | Self::Grid3x3 => 3,
            Self::Grid4x3 | Self::Grid4x4 => 4,
        }
    }

    /// Grid rows.
    #[must_use]
    pub fn rows(self) -> u32 {
        match self {
            Self::Grid1x1 | Self::Grid2x1 | Self::Grid3x1 | Self::Endpoints => 1,
            Self::Grid2x2 | Self::Grid3x2 => 2,
            Self::Grid3x3 | Self::Grid4x3 => 3,
            Self::Grid4x4 => 4,
        }
    }

    /// Number of frames sampled.
    #[must_use]
    pub fn cell_count(self) -> usize {
        self.percentages().len()
    }

    /// Whether each cell is fingerprinted on its own.
    #[must_use]
    pub fn is_endpoints(self) -> bool {
        matches!(self, Self::Endpoints)
    }

    /// Grid position `(col, row)` of the cell sampled at `index`.
    #[must_use]
    pub fn cell_position(self, index: usize) -> (u32, u32) {
        let index = index as u32;
        (index % self.cols(), index / self.cols())
    }

    /// Pixel origin of cell `index` for cells of `cell_width` x `cell_height`.
    #[must_use]
    pub fn cell_origin(self, index: usize, cell_width: u32, cell_height: u32) -> (u32, u32) {
        let (col, row) = self.cell_position(index);
        (col * cell_width, row * cell_height)
    }

    /// Short name as used on the command line.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Grid1x1 => "1x1",
            Self::Grid2x1 => "2x1",
            Self::Grid3x1 => "3x1",
            Self::Grid2x2 => "2x2",
            Self::Grid3x2 => "3x2",
            Self::Grid3x3 => "3x3",
            Self::Grid4x3 => "4x3",
            Self::Grid4x4 => "4x4",
            Self::Endpoints => "endpoints",
        }
    }
}

impl fmt::Display for ThumbnailLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ThumbnailLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|layout| layout.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown thumbnail layout '{s}'"))
    }
}
