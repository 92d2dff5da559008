//! Strategy configuration utilities

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Load configuration from a single TOML file
///
/// Services that need environment overlays use
/// `confluence_config::load_layered` instead.
pub fn load_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {:?}", path))?;
    Ok(config)
}
