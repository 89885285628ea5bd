//! Command handler modules for pks-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod simulate;

use anyhow::{Context, Result};
use pks_config::{load_layered_yaml, LoadedConfig};

/// Merge the given YAML files in order. No paths means the empty config.
pub fn load_config(paths: &[String]) -> Result<LoadedConfig> {
    if paths.is_empty() {
        return LoadedConfig::empty();
    }
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    load_layered_yaml(&path_refs).context("load layered config failed")
}
