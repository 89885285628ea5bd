//! Typed daemon configuration extracted from the merged config JSON.
//!
//! Every key is optional; absent keys fall back to the defaults below.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::LoadedConfig;

/// Env override for the HTTP bind address.
pub const ENV_DAEMON_ADDR: &str = "PKS_DAEMON_ADDR";

/// Comma-separated YAML paths, merged left to right.
pub const ENV_CONFIG_PATHS: &str = "PKS_CONFIG";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_AWAIT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_BUS_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct DaemonConfig {
    pub bind_addr: SocketAddr,
    /// How long `POST /run` waits for a result before answering "timeout".
    pub await_timeout: Duration,
    /// Dataset used when a submission leaves `datasetPath` blank.
    pub default_dataset_path: String,
    /// Broadcast bus buffer (messages) before slow subscribers lag.
    pub bus_capacity: usize,
    /// Seasonality month override (1..=12); `None` keeps the engine default.
    pub seasonality_month: Option<u32>,
    /// Seasonality boost fraction override; `None` keeps the engine default.
    pub seasonality_boost_fraction: Option<f64>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            await_timeout: Duration::from_secs(DEFAULT_AWAIT_TIMEOUT_SECS),
            default_dataset_path: pks_schemas::DEFAULT_DATASET_PATH.to_string(),
            bus_capacity: DEFAULT_BUS_CAPACITY,
            seasonality_month: None,
            seasonality_boost_fraction: None,
        }
    }
}

impl DaemonConfig {
    /// Build from canonical config JSON (produced by [`crate::load_layered_yaml`]).
    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        let bind_raw = cfg
            .pointer("/daemon/bind_addr")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_BIND_ADDR);
        let bind_addr: SocketAddr = bind_raw
            .parse()
            .with_context(|| format!("daemon.bind_addr is not a socket address: '{bind_raw}'"))?;

        let await_secs = read_u64(cfg, "/daemon/await_timeout_secs")?
            .unwrap_or(DEFAULT_AWAIT_TIMEOUT_SECS);
        if await_secs == 0 {
            bail!("daemon.await_timeout_secs must be > 0");
        }

        let bus_capacity = read_u64(cfg, "/daemon/bus_capacity")?
            .map(|v| usize::try_from(v).unwrap_or(usize::MAX))
            .unwrap_or(DEFAULT_BUS_CAPACITY);
        if bus_capacity == 0 {
            bail!("daemon.bus_capacity must be > 0");
        }

        let default_dataset_path = match cfg.pointer("/simulation/default_dataset_path") {
            None | Some(Value::Null) => pks_schemas::DEFAULT_DATASET_PATH.to_string(),
            Some(v) => v
                .as_str()
                .filter(|s| !s.trim().is_empty())
                .context("simulation.default_dataset_path must be a non-empty string")?
                .to_string(),
        };

        let seasonality_month = match read_u64(cfg, "/simulation/seasonality/month")? {
            None => None,
            Some(m @ 1..=12) => Some(m as u32),
            Some(m) => bail!("simulation.seasonality.month must be within 1..=12 (got {m})"),
        };

        let seasonality_boost_fraction = match cfg.pointer("/simulation/seasonality/boost_fraction")
        {
            None | Some(Value::Null) => None,
            Some(v) => {
                let f = v
                    .as_f64()
                    .context("simulation.seasonality.boost_fraction must be a number")?;
                if !f.is_finite() || f < 0.0 {
                    bail!("simulation.seasonality.boost_fraction must be finite and >= 0 (got {f})");
                }
                Some(f)
            }
        };

        Ok(Self {
            bind_addr,
            await_timeout: Duration::from_secs(await_secs),
            default_dataset_path,
            bus_capacity,
            seasonality_month,
            seasonality_boost_fraction,
        })
    }

    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        Self::from_config_json(&loaded.config_json)
    }

    /// Apply `PKS_DAEMON_ADDR` when it is set and parses.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(addr) = std::env::var(ENV_DAEMON_ADDR)
            .ok()
            .and_then(|s| s.parse::<SocketAddr>().ok())
        {
            self.bind_addr = addr;
        }
        self
    }
}

/// Paths listed in `PKS_CONFIG`, blanks dropped. Empty when unset.
pub fn config_paths_from_env() -> Vec<String> {
    std::env::var(ENV_CONFIG_PATHS)
        .map(|raw| split_config_paths(&raw))
        .unwrap_or_default()
}

fn split_config_paths(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_u64(cfg: &Value, ptr: &str) -> Result<Option<u64>> {
    match cfg.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .with_context(|| format!("config {ptr} must be a non-negative integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_path_list_splits_and_trims() {
        assert_eq!(
            split_config_paths(" base.yaml, ,overlay.yaml "),
            vec!["base.yaml".to_string(), "overlay.yaml".to_string()]
        );
        assert!(split_config_paths("").is_empty());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = DaemonConfig::from_config_json(&json!({})).unwrap();
        assert_eq!(cfg, DaemonConfig::default());
        assert_eq!(cfg.await_timeout, Duration::from_secs(20));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = DaemonConfig::from_config_json(&json!({"daemon": {"await_timeout_secs": 0}}))
            .unwrap_err();
        assert!(err.to_string().contains("await_timeout_secs"));
    }

    #[test]
    fn out_of_range_month_is_rejected() {
        let err = DaemonConfig::from_config_json(
            &json!({"simulation": {"seasonality": {"month": 13}}}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("1..=12"));
    }
}
