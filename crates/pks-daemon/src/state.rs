//! Shared runtime state for pks-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The run gateway is the
//! only thing they touch; the bus and workers behind it are owned by the
//! runtime tasks started in [`AppState::start`].

use std::sync::Arc;

use pks_config::DaemonConfig;
use pks_engine::{EngineConfig, SeasonalityPolicy, SimulationEngine};
use pks_feed::RecordFeed;
use pks_runtime::{start_runtime, RunGateway, RuntimeTasks};
use serde::Serialize;

/// Static build metadata, logged at boot.
#[derive(Clone, Debug, Serialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            service: "pks-daemon",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub gateway: RunGateway,
    pub config: DaemonConfig,
    pub build: BuildInfo,
}

impl AppState {
    /// Spawn the calculation worker and result listener, and return the state
    /// handlers need. Must be called inside a Tokio runtime.
    pub fn start(config: DaemonConfig, feed: Arc<dyn RecordFeed>) -> (Arc<Self>, RuntimeTasks) {
        let engine = SimulationEngine::new(EngineConfig {
            seasonality: seasonality_policy(&config),
        });
        let (gateway, tasks) = start_runtime(
            config.bus_capacity,
            feed,
            engine,
            config.default_dataset_path.clone(),
            config.await_timeout,
        );
        let state = Arc::new(Self {
            gateway,
            config,
            build: BuildInfo::current(),
        });
        (state, tasks)
    }
}

/// December / 20% unless the config says otherwise.
pub fn seasonality_policy(config: &DaemonConfig) -> SeasonalityPolicy {
    SeasonalityPolicy::DECEMBER_20_PCT
        .with_overrides(config.seasonality_month, config.seasonality_boost_fraction)
}
