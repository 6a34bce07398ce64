//! JSON output formatter for match reports.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "pairs": [
//!     {
//!       "left_index": 0,
//!       "right_index": 2,
//!       "left": { "path": "/videos/a.mp4", "size": 1048576, "duration_ms": 61000, "...": "..." },
//!       "right": { "path": "/videos/b.mkv", "...": "..." },
//!       "details": { "score": { "agreement": 63, "structural": null }, "size": "left", "...": "..." }
//!     }
//!   ],
//!   "rejections": [
//!     { "path": "/videos/broken.avi", "reason": "probe", "message": "..." }
//!   ],
//!   "summary": {
//!     "mode": "fast",
//!     "files_discovered": 3,
//!     "videos_accepted": 2,
//!     "pairs": 1,
//!     "exit_code": 3,
//!     "exit_code_name": "VD003"
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use super::{MatchReport, ReportPair, ReportRejection, ReportSummary};

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// Matching pairs in traversal order
    pub pairs: Vec<JsonPair<'a>>,
    /// Files rejected from the active set
    pub rejections: &'a [ReportRejection],
    /// Run counters
    pub summary: &'a ReportSummary,
}

/// A pair with both paths made absolute where possible.
#[derive(Debug, Clone, Serialize)]
pub struct JsonPair<'a> {
    #[serde(flatten)]
    pair: &'a ReportPair,
    /// Canonical left path
    pub left_path: String,
    /// Canonical right path
    pub right_path: String,
}

impl<'a> JsonOutput<'a> {
    /// Create a JSON view of a report.
    #[must_use]
    pub fn new(report: &'a MatchReport) -> Self {
        Self {
            pairs: report
                .pairs
                .iter()
                .map(|pair| JsonPair {
                    left_path: normalize_path(&pair.left.path),
                    right_path: normalize_path(&pair.right.path),
                    pair,
                })
                .collect(),
            rejections: &report.rejections,
            summary: &report.summary,
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Canonicalize when the file still exists, otherwise keep the path as is.
fn normalize_path(path: &str) -> String {
    match std::path::Path::new(path).canonicalize() {
        Ok(canonical) => canonical.to_string_lossy().into_owned(),
        Err(_) => path.to_string(),
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
