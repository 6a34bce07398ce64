//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the viddupe binary.
///
/// - 0: Success (completed normally, matching pairs found)
/// - 1: General error (unexpected failure)
/// - 2: No matches (completed normally, nothing matched)
/// - 3: Partial success (completed, but some files were rejected)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: Scan completed and matching pairs were found.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// No matches: Scan completed but no pair matched.
    NoMatches = 2,
    /// Partial success: Scan completed but some files were rejected.
    PartialSuccess = 3,
    /// Interrupted: Scan was interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "VD000",
            Self::GeneralError => "VD001",
            Self::NoMatches => "VD002",
            Self::PartialSuccess => "VD003",
            Self::Interrupted => "VD130",
        }
    }

    /// Pick the exit code for a finished scan.
    ///
    /// Interruption wins over everything, then rejections, then whether any
    /// pair matched.
    #[must_use]
    pub fn for_scan(interrupted: bool, pairs: usize, rejected: usize) -> Self {
        if interrupted {
            Self::Interrupted
        } else if rejected > 0 {
            Self::PartialSuccess
        } else if pairs == 0 {
            Self::NoMatches
        } else {
            Self::Success
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "VD001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
