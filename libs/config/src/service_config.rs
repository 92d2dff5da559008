//! Service Configuration Module
//!
//! Provides layered configuration loading for Confluence services.
//! A base TOML file is merged with an optional environment overlay
//! (`<base dir>/environments/<env>.toml`) and finally with prefixed
//! environment variables, so a deployment can override any single value
//! without editing files.
//!
//! Nested keys use a double underscore in environment variables:
//! `CONFLUENCE_SCHEDULER__FETCH_TIMEOUT_SECS=5` overrides
//! `scheduler.fetch_timeout_secs`.

use anyhow::{Context, Result};
use config_crate::{Config, Environment, File};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Global settings shared by every service
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct GlobalConfig {
    pub log_level: String,
    pub json_logs: bool,
    pub data_dir: PathBuf,
    pub journal_path: PathBuf,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            data_dir: PathBuf::from("./data/bars"),
            journal_path: PathBuf::from("./data/journal/signals.jsonl"),
        }
    }
}

impl GlobalConfig {
    /// Expand `~` and `$VARS` in path values
    pub fn expand_env_vars(&mut self) -> Result<()> {
        self.data_dir = expand_path(&self.data_dir).context("Failed to expand data_dir")?;
        self.journal_path =
            expand_path(&self.journal_path).context("Failed to expand journal_path")?;
        Ok(())
    }
}

/// Expand `~` and environment variables in a path
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .with_context(|| format!("Failed to expand path {raw}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Pick the config path from an environment variable, falling back to a default
pub fn resolve_config_path(env_var: &str, default: &str) -> PathBuf {
    match std::env::var(env_var) {
        Ok(path) if !path.trim().is_empty() => {
            debug!("Using config path from {}: {}", env_var, path);
            PathBuf::from(path)
        }
        _ => PathBuf::from(default),
    }
}

/// Load a configuration value from a base file, an optional environment
/// overlay and prefixed environment variables
pub fn load_layered<T: DeserializeOwned>(
    base_path: &Path,
    environment: Option<&str>,
    env_prefix: &str,
) -> Result<T> {
    let mut builder = Config::builder().add_source(File::from(base_path).required(true));

    // Add environment-specific overrides if specified
    if let Some(env) = environment {
        let env_file = base_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("environments")
            .join(format!("{}.toml", env));

        if env_file.exists() {
            info!("Loading environment config: {:?}", env_file);
            builder = builder.add_source(File::from(env_file));
        } else {
            warn!("Environment config not found: {:?}", env_file);
        }
    }

    // Override with environment variables
    builder = builder.add_source(
        Environment::with_prefix(env_prefix)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .with_context(|| format!("Failed to build configuration from {:?}", base_path))?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}
