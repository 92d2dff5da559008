//! Layered configuration loading: base profile, environment overlay, env vars

use rust_decimal_macros::dec;
use smc_signals::StrategyConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use types::Timeframe;

const PROFILE: &str = include_str!("../configs/smc_strategy.toml");
const PRODUCTION: &str = include_str!("../configs/environments/production.toml");

fn config_dir(overlays: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("smc_strategy.toml");
    fs::write(&base, PROFILE).unwrap();
    if !overlays.is_empty() {
        let environments = dir.path().join("environments");
        fs::create_dir_all(&environments).unwrap();
        for (name, contents) in overlays {
            fs::write(environments.join(format!("{name}.toml")), contents).unwrap();
        }
    }
    (dir, base)
}

fn load(base: &Path, environment: Option<&str>) -> anyhow::Result<StrategyConfig> {
    StrategyConfig::load(base, environment)
}

#[test]
fn test_base_profile_loads_without_overlay() {
    let (_dir, base) = config_dir(&[]);
    let config = load(&base, None).unwrap();

    assert_eq!(config.instruments.len(), 5);
    assert_eq!(config.instruments[3].symbol.symbol(), "XAU/USD");
    assert_eq!(config.instruments[3].timeframe, Timeframe::M5);
    assert_eq!(config.decision.min_confidence, Some(dec!(0.3)));
    assert_eq!(config.structure.displacement_atr_multiple, dec!(1.5));
    assert_eq!(config.min_lookback_bars, 50);
}

#[test]
fn test_environment_overlay_and_variable_override() {
    let staging = r#"
[global]
log_level = "debug"

[scheduler]
history_bars = 300
"#;
    let (_dir, base) = config_dir(&[("staging", staging)]);
    std::env::set_var("CONFLUENCE_SCHEDULER__SIGNAL_COOLDOWN_SECS", "900");
    let loaded = load(&base, Some("staging"));
    std::env::remove_var("CONFLUENCE_SCHEDULER__SIGNAL_COOLDOWN_SECS");
    let config = loaded.unwrap();

    assert_eq!(config.global.log_level, "debug");
    assert_eq!(config.scheduler.history_bars, 300);
    assert_eq!(config.scheduler.signal_cooldown_secs, 900);
    // Untouched keys keep the base value
    assert_eq!(config.scheduler.fetch_timeout_secs, 10);
    assert_eq!(config.indicators.len(), 19);
}

#[test]
fn test_production_overlay_expands_paths() {
    let (_dir, base) = config_dir(&[("production", PRODUCTION)]);
    let config = load(&base, Some("production")).unwrap();

    assert!(config.global.json_logs);
    assert_eq!(config.global.log_level, "warn");
    assert_eq!(config.scheduler.metrics_log_interval_secs, 900);
    let data_dir = config.global.data_dir.to_string_lossy().into_owned();
    assert!(!data_dir.contains("${"));
    assert!(config.global.journal_path.ends_with("journal/signals.jsonl"));
}

#[test]
fn test_missing_overlay_falls_back_to_base() {
    let (_dir, base) = config_dir(&[]);
    let config = load(&base, Some("nonexistent")).unwrap();
    assert_eq!(config.global.log_level, "info");
}

#[test]
fn test_invalid_overlay_is_rejected() {
    let broken = r#"
min_lookback_bars = 0
"#;
    let (_dir, base) = config_dir(&[("broken", broken)]);
    assert!(load(&base, Some("broken")).is_err());
}

#[test]
fn test_missing_base_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load(&dir.path().join("absent.toml"), None).is_err());
}
