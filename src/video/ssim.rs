//! Block-averaged structural similarity over small grayscale thumbnails.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use super::phash::gray_levels;

/// Side of the structural thumbnail.
pub const SSIM_SIZE: u32 = 16;

const C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
const C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);

/// Square single-channel matrix of raw gray intensities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrayThumb {
    size: u32,
    data: Vec<f64>,
}

impl GrayThumb {
    /// Downscale a composite to a `size` x `size` thumbnail.
    #[must_use]
    pub fn from_image(image: &RgbImage, size: u32) -> Self {
        Self {
            size,
            data: gray_levels(image, size),
        }
    }

    /// Wrap row-major values. `None` unless `data.len() == size * size`.
    #[must_use]
    pub fn from_values(size: u32, data: Vec<f64>) -> Option<Self> {
        (data.len() == (size as usize) * (size as usize)).then_some(Self { size, data })
    }

    /// Side length.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Row-major values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.data
    }

    fn block(&self, bx: usize, by: usize, block: usize) -> impl Iterator<Item = f64> + '_ {
        let size = self.size as usize;
        (by * block..(by + 1) * block)
            .flat_map(move |y| self.data[y * size + bx * block..y * size + (bx + 1) * block].iter().copied())
    }
}

/// Whether `block_size` tiles a thumbnail of side `size` exactly.
#[must_use]
pub fn block_size_fits(size: u32, block_size: u32) -> bool {
    block_size > 0 && block_size <= size && size % block_size == 0
}

/// Mean structural similarity between two thumbnails over non-overlapping
/// `block_size` blocks.
///
/// `None` when the thumbnails differ in size or the block size does not
/// tile them.
#[must_use]
pub fn structural_similarity(a: &GrayThumb, b: &GrayThumb, block_size: u32) -> Option<f64> {
    if a.size != b.size || !block_size_fits(a.size, block_size) {
        return None;
    }

    let block = block_size as usize;
    let per_side = (a.size / block_size) as usize;
    let count = (block * block) as f64;

    let mut total = 0.0;
    for by in 0..per_side {
        for bx in 0..per_side {
            let (mut sa, mut sb, mut saa, mut sbb, mut sab) = (0.0, 0.0, 0.0, 0.0, 0.0);
            for (x, y) in a.block(bx, by, block).zip(b.block(bx, by, block)) {
                sa += x;
                sb += y;
                saa += x * x;
                sbb += y * y;
                sab += x * y;
            }
            let mean_a = sa / count;
            let mean_b = sb / count;
            let var_a = saa / count - mean_a * mean_a;
            let var_b = sbb / count - mean_b * mean_b;
            let cov = sab / count - mean_a * mean_b;

            total += ((2.0 * mean_a * mean_b + C1) * (2.0 * cov + C2))
                / ((mean_a * mean_a + mean_b * mean_b + C1) * (var_a + var_b + C2));
        }
    }
    Some(total / (per_side * per_side) as f64)
}
