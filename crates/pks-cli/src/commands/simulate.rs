//! `pks simulate`: the engine pipeline run in-process, no bus, no daemon.

use anyhow::{Context, Result};
use clap::Args;
use pks_config::{report_unused_keys, ConfigScope, DaemonConfig, UnusedKeyPolicy};
use pks_engine::{EngineConfig, SeasonalityPolicy, SimulationEngine};
use pks_feed::{CsvRecordFeed, RecordFeed};
use pks_schemas::{RunParameters, DEFAULT_MODE_LABEL};
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Sales CSV. Defaults to `simulation.default_dataset_path` from --config.
    #[arg(long)]
    pub dataset: Option<String>,

    /// Label echoed in the result
    #[arg(long, default_value = DEFAULT_MODE_LABEL)]
    pub mode: String,

    /// Apply the seasonality boost to the demand ranking
    #[arg(long, default_value_t = false)]
    pub seasonality: bool,

    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub max_skus_per_rack: i64,

    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub max_skus_per_station: i64,

    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub max_batch_lines: i64,

    /// Pick-to-order batching (default is pick-to-light)
    #[arg(long, default_value_t = false)]
    pub pick_to_order: bool,

    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub max_stations_open: i64,

    /// Print the full report (ranking, racks, batches, stations) instead of
    /// only the hit-rate result
    #[arg(long, default_value_t = false)]
    pub report: bool,

    /// Layered config paths in merge order (only `simulation.*` keys are read)
    #[arg(long = "config")]
    pub config_paths: Vec<String>,
}

impl SimulateArgs {
    pub fn params(&self) -> RunParameters {
        RunParameters {
            use_seasonality_boost: self.seasonality,
            max_skus_per_rack: self.max_skus_per_rack,
            max_skus_per_station: self.max_skus_per_station,
            max_batch_lines: self.max_batch_lines,
            use_pick_to_order: self.pick_to_order,
            max_stations_open: self.max_stations_open,
        }
    }
}

pub fn run(args: SimulateArgs) -> Result<()> {
    let loaded = super::load_config(&args.config_paths)?;
    let unused = report_unused_keys(ConfigScope::Cli, &loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !unused.is_clean() {
        warn!(unused = ?unused.unused_leaf_pointers, "config keys ignored by simulate");
    }
    // The simulation section shares its schema with the daemon's.
    let settings = DaemonConfig::from_loaded(&loaded).context("invalid simulation config")?;

    let dataset = args
        .dataset
        .clone()
        .unwrap_or_else(|| settings.default_dataset_path.clone());
    let engine = SimulationEngine::new(EngineConfig {
        seasonality: SeasonalityPolicy::DECEMBER_20_PCT
            .with_overrides(settings.seasonality_month, settings.seasonality_boost_fraction),
    });

    let feed = CsvRecordFeed::new();
    let lines = feed
        .load(&dataset)
        .with_context(|| format!("load dataset failed: {dataset}"))?;
    info!(dataset = %dataset, lines = lines.len(), "dataset loaded");

    let report = engine.simulate(&args.mode, &lines, &args.params());

    let json = if args.report {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string_pretty(&report.result)
    }
    .context("serialize result json failed")?;
    println!("{json}");

    Ok(())
}
