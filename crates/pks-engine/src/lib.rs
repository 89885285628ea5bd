//! pks-engine
//!
//! Pick-station simulation pipeline:
//!
//! SALES LINES -> DEMAND RANKING -> SLOTTING -> BATCHING -> STATIONS -> HIT RATE
//!
//! - Pure and synchronous: no I/O, no clocks, no shared state between runs
//! - Deterministic: same lines + parameters => identical `HitRateResult`
//! - Total: every stage returns a value; bad capacities are clamped to 1

pub mod batching;
pub mod demand;
pub mod hit_rate;
pub mod slotting;
pub mod stations;

use std::collections::BTreeMap;

use pks_schemas::{HitRateResult, RackId, RunParameters, SalesLine};
use serde::Serialize;

pub use batching::{build_batches, group_order_lines, Batch, BatchLimits, OrderLine, PickingPolicy};
pub use demand::{rank_demand, SeasonalityPolicy, SkuDemand};
pub use hit_rate::{evaluate_hit_rate, HitRateEvaluation};
pub use slotting::{slot_racks, Rack, RackMap};
pub use stations::{assign_round_robin, StationAssignment};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EngineConfig {
    pub seasonality: SeasonalityPolicy,
}

/// Everything one run derived, in pipeline order.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub ranking: Vec<SkuDemand>,
    pub racks: RackMap,
    pub batches: Vec<Batch>,
    pub stations: StationAssignment,
    pub result: HitRateResult,
    pub rack_item_totals: BTreeMap<RackId, i64>,
}

#[derive(Clone, Debug, Default)]
pub struct SimulationEngine {
    config: EngineConfig,
}

impl SimulationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn simulate(&self, mode: &str, lines: &[SalesLine], params: &RunParameters) -> SimulationReport {
        let p = params.clamped();

        let ranking = rank_demand(lines, p.use_seasonality_boost, &self.config.seasonality);
        let racks = slot_racks(&ranking, p.max_skus_per_rack);
        let batches = build_batches(
            lines,
            PickingPolicy::from_flag(p.use_pick_to_order),
            BatchLimits::new(p.max_batch_lines, p.max_skus_per_station),
        );
        let stations = assign_round_robin(batches.len(), p.max_stations_open);
        let HitRateEvaluation {
            result,
            rack_item_totals,
        } = evaluate_hit_rate(mode, &stations, &batches, &racks);

        tracing::debug!(
            mode,
            lines = lines.len(),
            skus = ranking.len(),
            racks = racks.len(),
            batches = batches.len(),
            stations = stations.station_count(),
            hit_rate = result.hit_rate,
            "simulation complete"
        );

        SimulationReport {
            ranking,
            racks,
            batches,
            stations,
            result,
            rack_item_totals,
        }
    }
}

/// Convenience wrapper using the default seasonality policy.
pub fn simulate(mode: &str, lines: &[SalesLine], params: &RunParameters) -> SimulationReport {
    SimulationEngine::default().simulate(mode, lines, params)
}
