use figment::providers::Serialized;
use std::fs;
use tempfile::tempdir;
use viddupe::cache::IdentityScope;
use viddupe::config::{Config, ConfigError, ConfigOverrides};
use viddupe::matching::ComparisonMode;
use viddupe::video::ThumbnailLayout;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = figment::Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config.mode, ComparisonMode::Fast);
    assert_eq!(config.threshold, 57);
    assert_eq!(config.layout, ThumbnailLayout::Grid2x2);
    assert_eq!(config.identity_scope, IdentityScope::FileName);
}

#[test]
fn test_config_load_from_env() {
    std::env::set_var("VIDDUPE_CAPTURE_TIMEOUT_SECS", "90");
    std::env::set_var("VIDDUPE_IDENTITY_SCOPE", "full-path");

    use figment::{providers::Env, Figment};
    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed("VIDDUPE_").split("__"));

    let config: Config = figment.extract().unwrap();

    assert_eq!(config.capture_timeout_secs, 90);
    assert_eq!(config.identity_scope, IdentityScope::FullPath);

    std::env::remove_var("VIDDUPE_CAPTURE_TIMEOUT_SECS");
    std::env::remove_var("VIDDUPE_IDENTITY_SCOPE");
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let toml_content = r#"
mode = "refined"
threshold = 50
ssim_threshold = 0.8
layout = "3x3"
extensions = ["mp4", "mkv"]
skip_hidden = true
"#;
    fs::write(&config_path, toml_content).unwrap();

    use figment::{
        providers::{Format, Toml},
        Figment,
    };
    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));

    let config: Config = figment.extract().unwrap();

    assert_eq!(config.mode, ComparisonMode::Refined);
    assert_eq!(config.threshold, 50);
    assert_eq!(config.ssim_threshold, 0.8);
    assert_eq!(config.layout, ThumbnailLayout::Grid3x3);
    assert_eq!(config.extensions, vec!["mp4".to_string(), "mkv".to_string()]);
    assert!(config.skip_hidden);
    assert!(!config.follow_symlinks);

    let policy = config.policy().unwrap();
    assert_eq!(policy.mode, ComparisonMode::Refined);
    assert_eq!(policy.structural_threshold, 0.8);
}

#[test]
fn test_cli_overrides_beat_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "threshold = 50\nlayout = \"3x3\"\nskip_hidden = true\n").unwrap();

    let overrides = ConfigOverrides {
        threshold: Some(60),
        ..Default::default()
    };
    let config = Config::load(Some(&config_path), &overrides).unwrap();

    assert_eq!(config.threshold, 60);
    assert_eq!(config.layout, ThumbnailLayout::Grid3x3);
    assert!(config.skip_hidden);
}

#[test]
fn test_out_of_range_file_value_is_rejected() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "threshold = 80\n").unwrap();

    let result = Config::load(Some(&config_path), &ConfigOverrides::default());
    assert!(matches!(result, Err(ConfigError::Policy(_))));
}

#[test]
fn test_mistyped_file_value_is_rejected() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "layout = \"7x7\"\n").unwrap();

    let result = Config::load(Some(&config_path), &ConfigOverrides::default());
    assert!(matches!(result, Err(ConfigError::Figment(_))));
}
