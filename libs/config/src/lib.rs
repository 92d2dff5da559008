//! # Confluence Centralized Configuration
//!
//! This crate provides configuration loading and shared defaults for all
//! Confluence services.
//!
//! ## Features
//!
//! - **Layered Loading**: base TOML, optional environment overlay, then
//!   `CONFLUENCE_`-prefixed environment variables
//! - **Path Expansion**: `~` and `$VARS` in configured paths
//! - **Service Defaults**: poll intervals, timeouts and queue sizes
//!
//! ## Usage
//!
//! ```rust,no_run
//! use confluence_config::{load_layered, service, GlobalConfig};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Deserialize)]
//! struct MyConfig {
//!     global: GlobalConfig,
//! }
//!
//! let config: MyConfig = load_layered(
//!     Path::new("configs/smc_strategy.toml"),
//!     Some("production"),
//!     service::ENV_PREFIX,
//! )
//! .unwrap();
//! let interval = service::scheduler::FOREX_POLL_INTERVAL_SECS;
//! # let _ = (config, interval);
//! ```

pub mod service;
pub mod service_config;

// Re-export commonly used types
pub use service_config::{expand_path, load_layered, resolve_config_path, GlobalConfig};
