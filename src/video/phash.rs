//! DCT-based 64-bit perceptual hash.
//!
//! The composite is shrunk to 32x32 grayscale, transformed with an
//! orthonormal 2D DCT-II, and the 8x8 lowest-frequency coefficients are
//! compared against their mean (DC term excluded). Bit `i` is set when
//! coefficient `i` (row-major) is above the mean.

use std::f64::consts::{PI, SQRT_2};

use image::imageops::{self, FilterType};
use image::RgbImage;

/// Side of the square the composite is reduced to before hashing.
pub const PHASH_SIZE: u32 = 32;

/// Side of the low-frequency block that becomes the hash.
const HASH_BLOCK: usize = 8;

/// Total absolute gray deviation from the first pixel below which an image
/// is considered monochrome.
pub const MONOCHROME_FLOOR: f64 = 1500.0;

/// Downscale `image` to `size` x `size` and return row-major gray levels.
#[must_use]
pub fn gray_levels(image: &RgbImage, size: u32) -> Vec<f64> {
    let small = imageops::resize(image, size, size, FilterType::Triangle);
    imageops::grayscale(&small)
        .pixels()
        .map(|p| f64::from(p.0[0]))
        .collect()
}

/// Whether the gray levels barely deviate from the first pixel.
///
/// Black or single-color captures land here.
#[must_use]
pub fn is_monochrome(gray: &[f64]) -> bool {
    let Some(&first) = gray.first() else {
        return true;
    };
    gray.iter().map(|&p| (p - first).abs()).sum::<f64>() < MONOCHROME_FLOOR
}

/// Perceptual hash of a composite image. Returns 0 for monochrome input.
#[must_use]
pub fn perceptual_hash(image: &RgbImage) -> u64 {
    let gray = gray_levels(image, PHASH_SIZE);
    hash_gray(&gray, PHASH_SIZE as usize)
}

/// Hash an `n` x `n` row-major gray matrix.
#[must_use]
pub fn hash_gray(gray: &[f64], n: usize) -> u64 {
    if is_monochrome(gray) {
        return 0;
    }

    let coeffs = low_frequency_dct(gray, n, HASH_BLOCK);
    let mean = (coeffs.iter().sum::<f64>() - coeffs[0]) / (coeffs.len() - 1) as f64;

    coeffs
        .iter()
        .enumerate()
        .filter(|&(_, &c)| c > mean)
        .fold(0u64, |hash, (i, _)| hash | (1u64 << i))
}

/// Top-left `k` x `k` block of the orthonormal 2D DCT-II of an `n` x `n`
/// matrix, row-major. Computed separably: rows first, then columns.
fn low_frequency_dct(input: &[f64], n: usize, k: usize) -> Vec<f64> {
    let cos_table: Vec<f64> = (0..k)
        .flat_map(|freq| {
            (0..n).map(move |x| ((2 * x + 1) as f64 * freq as f64 * PI / (2 * n) as f64).cos())
        })
        .collect();
    let scale = |freq: usize| {
        if freq == 0 {
            1.0 / (n as f64).sqrt()
        } else {
            SQRT_2 / (n as f64).sqrt()
        }
    };

    // rows[y * k + u]: horizontal frequency u of row y
    let mut rows = vec![0.0; n * k];
    for y in 0..n {
        let row = &input[y * n..(y + 1) * n];
        for u in 0..k {
            let basis = &cos_table[u * n..(u + 1) * n];
            rows[y * k + u] = row.iter().zip(basis).map(|(p, c)| p * c).sum::<f64>() * scale(u);
        }
    }

    let mut out = vec![0.0; k * k];
    for v in 0..k {
        let basis = &cos_table[v * n..(v + 1) * n];
        for u in 0..k {
            let sum: f64 = (0..n).map(|y| rows[y * k + u] * basis[y]).sum();
            out[v * k + u] = sum * scale(v);
        }
    }
    out
}
