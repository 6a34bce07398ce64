//! Unicode path normalization utilities.
//!
//! macOS stores file names decomposed (NFD) while Windows and Linux
//! typically hand out composed (NFC) names. The same visible name can
//! therefore arrive as different byte sequences. Everything that compares
//! or hashes names goes through NFC first.
//!
//! # Example
//!
//! ```
//! use viddupe::scanner::path_utils::normalize_path_str;
//!
//! let nfc = "café.mp4";
//! let nfd = "cafe\u{0301}.mp4";
//! assert_eq!(normalize_path_str(nfc), normalize_path_str(nfd));
//! ```

use std::path::Path;

use unicode_normalization::UnicodeNormalization;

/// Normalize a string to NFC.
#[must_use]
pub fn normalize_path_str(s: &str) -> String {
    s.nfc().collect()
}

/// NFC comparison key for a whole path. Invalid UTF-8 is converted lossily.
#[must_use]
pub fn path_key(path: &Path) -> String {
    normalize_path_str(&path.to_string_lossy())
}

/// Case-insensitive NFC key for a path, used to drop repeats when roots
/// overlap or differ only in case.
#[must_use]
pub fn path_key_folded(path: &Path) -> String {
    path_key(path).to_lowercase()
}

/// Lower-cased NFC file name, or the folded whole path when there is no
/// final component.
#[must_use]
pub fn file_name_key(path: &Path) -> String {
    match path.file_name() {
        Some(name) => normalize_path_str(&name.to_string_lossy()).to_lowercase(),
        None => path_key_folded(path),
    }
}

/// Lower-cased extension without the dot.
#[must_use]
pub fn extension_key(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| normalize_path_str(&ext.to_string_lossy()).to_lowercase())
}

/// Normalize a user-supplied extension (`*.MP4`, `.mp4`, `mp4`) to `mp4`.
#[must_use]
pub fn clean_extension(ext: &str) -> String {
    normalize_path_str(ext.trim().trim_start_matches('*').trim_start_matches('.')).to_lowercase()
}
