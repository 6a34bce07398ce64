//! Layered application configuration.
//!
//! Settings are merged with `figment`, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. TOML file: `--config <FILE>`, or `config.toml` in the platform config
//!    directory when present
//! 3. Environment variables prefixed `VIDDUPE_` (e.g. `VIDDUPE_THRESHOLD=55`)
//! 4. Command-line flags ([`ConfigOverrides`])
//!
//! # Example
//!
//! ```toml
//! mode = "refined"
//! threshold = 55
//! ssim_threshold = 0.9
//! layout = "3x3"
//! extensions = ["mp4", "mkv"]
//! identity_scope = "full-path"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::IdentityScope;
use crate::matching::policy::{
    DEFAULT_BIT_THRESHOLD, DEFAULT_DURATION_TOLERANCE_MS, DEFAULT_SSIM_BLOCK_SIZE,
    DEFAULT_STRUCTURAL_THRESHOLD,
};
use crate::matching::{ComparisonMode, MatchPolicy, PolicyError};
use crate::probe::ffmpeg::DEFAULT_TIMEOUT;
use crate::scanner::{WalkerConfig, DEFAULT_VIDEO_EXTENSIONS};
use crate::video::{ExtractionConfig, ThumbnailLayout};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "VIDDUPE_";
/// File name looked up in the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer could not be read or has a field of the wrong type.
    #[error("invalid configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// Values parse but are out of range.
    #[error("invalid match policy: {0}")]
    Policy(#[from] PolicyError),

    /// An explicitly requested config file does not exist.
    #[error("config file not found: {0}")]
    MissingFile(PathBuf),
}

/// Effective settings for a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Comparison mode
    pub mode: ComparisonMode,
    /// Minimum adjusted agreeing bits (0..=64)
    pub threshold: u32,
    /// Structural similarity threshold for refined mode
    pub ssim_threshold: f64,
    /// SSIM block size
    pub ssim_block_size: u32,
    /// Durations within this window count as equal
    pub duration_tolerance_ms: u64,
    /// Agreement bonus for equal durations
    pub same_duration_bonus: u32,
    /// Agreement penalty for different durations
    pub different_duration_penalty: u32,
    /// Thumbnail grid
    pub layout: ThumbnailLayout,
    /// Extraction workers (0 = available parallelism)
    pub threads: usize,
    /// Per-call probe/capture timeout in seconds
    pub capture_timeout_secs: u64,
    /// Accepted file extensions (empty = built-in video list)
    pub extensions: Vec<String>,
    /// How cache identities are derived
    pub identity_scope: IdentityScope,
    /// Cache database location (None = platform cache dir)
    pub cache_path: Option<PathBuf>,
    /// Follow symbolic links during discovery
    pub follow_symlinks: bool,
    /// Skip hidden files and directories
    pub skip_hidden: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: ComparisonMode::Fast,
            threshold: DEFAULT_BIT_THRESHOLD,
            ssim_threshold: DEFAULT_STRUCTURAL_THRESHOLD,
            ssim_block_size: DEFAULT_SSIM_BLOCK_SIZE,
            duration_tolerance_ms: DEFAULT_DURATION_TOLERANCE_MS,
            same_duration_bonus: MatchPolicy::default().same_duration_bonus,
            different_duration_penalty: MatchPolicy::default().different_duration_penalty,
            layout: ThumbnailLayout::default(),
            threads: 0,
            capture_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            extensions: DEFAULT_VIDEO_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
            identity_scope: IdentityScope::default(),
            cache_path: None,
            follow_symlinks: false,
            skip_hidden: false,
        }
    }
}

/// Command-line layer; only the flags actually given are merged.
///
/// Each field has the meaning of the same-named [`Config`] field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ComparisonMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssim_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssim_block_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_tolerance_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub same_duration_bonus: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub different_duration_penalty: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<ThumbnailLayout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_scope: Option<IdentityScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_symlinks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_hidden: Option<bool>,
}

impl Config {
    /// Default config file location, if the platform has a config dir.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "viddupe", "viddupe")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Assemble the layered provider without extracting it.
    ///
    /// `file` is merged only when it exists, so a missing default config is
    /// not an error.
    #[must_use]
    pub fn figment(file: Option<&Path>, overrides: &ConfigOverrides) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file.filter(|p| p.is_file()) {
            log::debug!("Loading configuration from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides))
    }

    /// Load all layers and validate the resulting policy.
    ///
    /// With `explicit` set the file must exist; otherwise the default path
    /// is used when present.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingFile`] for an absent explicit file,
    /// [`ConfigError::Figment`] for unreadable or mistyped layers and
    /// [`ConfigError::Policy`] for out-of-range thresholds.
    pub fn load(explicit: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) if !path.is_file() => {
                return Err(ConfigError::MissingFile(path.to_path_buf()))
            }
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path(),
        };
        let config: Config = Self::figment(file.as_deref(), overrides)
            .extract()
            .map_err(Box::new)?;
        config.policy()?;
        Ok(config)
    }

    /// The match policy these settings describe.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range field.
    pub fn policy(&self) -> Result<MatchPolicy, PolicyError> {
        let policy = MatchPolicy::default()
            .with_mode(self.mode)
            .with_bit_threshold(self.threshold)
            .with_structural_threshold(self.ssim_threshold)
            .with_ssim_block_size(self.ssim_block_size)
            .with_duration_tolerance_ms(self.duration_tolerance_ms)
            .with_duration_modifiers(self.same_duration_bonus, self.different_duration_penalty);
        policy.validate()?;
        Ok(policy)
    }

    /// Extraction settings for a batch of `file_count` files.
    #[must_use]
    pub fn extraction(&self, file_count: usize) -> ExtractionConfig {
        ExtractionConfig::default()
            .with_layout(self.layout)
            .with_identity_scope(self.identity_scope)
            .for_file_count(file_count)
    }

    /// Discovery settings.
    #[must_use]
    pub fn walker(&self) -> WalkerConfig {
        WalkerConfig::default()
            .with_extensions(self.extensions.iter().map(String::as_str))
            .with_follow_symlinks(self.follow_symlinks)
            .with_skip_hidden(self.skip_hidden)
    }

    /// Timeout for each external probe or capture call.
    #[must_use]
    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture_timeout_secs.max(1))
    }
}
