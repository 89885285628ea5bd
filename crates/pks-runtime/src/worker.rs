//! Bus consumers: the calculation worker and the result listener.

use std::sync::Arc;

use anyhow::Context;
use futures_util::StreamExt;
use pks_engine::SimulationEngine;
use pks_feed::RecordFeed;
use pks_schemas::{HitRateCalculated, StartRunCommand};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::bus::{bus_stream, BusMsg, RunBus};
use crate::correlator::RunCorrelator;

/// Load the dataset and run the simulation for one command.
///
/// Blocking: call from the blocking pool.
pub fn calculate(
    feed: &dyn RecordFeed,
    engine: &SimulationEngine,
    cmd: &StartRunCommand,
) -> anyhow::Result<HitRateCalculated> {
    let lines = feed
        .load(&cmd.dataset_path)
        .with_context(|| format!("load dataset '{}' via {} feed", cmd.dataset_path, feed.source_name()))?;
    let report = engine.simulate(&cmd.mode, &lines, &cmd.params);
    Ok(HitRateCalculated {
        run_id: cmd.run_id,
        result: report.result,
    })
}

/// Consume `StartRun` messages, simulate each on the blocking pool, publish
/// `RunResult`.
///
/// Runs are independent: each gets its own task. A failed run is logged and
/// publishes nothing, so its caller times out.
///
/// The subscription is taken before this returns, so no command published
/// afterwards is missed.
pub fn spawn_calculation_worker(
    bus: RunBus,
    feed: Arc<dyn RecordFeed>,
    engine: SimulationEngine,
) -> JoinHandle<()> {
    let rx = bus.subscribe();
    tokio::spawn(async move {
        let stream = bus_stream(rx, "calculation_worker");
        tokio::pin!(stream);

        while let Some(msg) = stream.next().await {
            let BusMsg::StartRun(cmd) = msg else {
                continue;
            };
            let bus = bus.clone();
            let feed = Arc::clone(&feed);
            let engine = engine.clone();
            tokio::spawn(async move {
                let run_id = cmd.run_id;
                let joined =
                    tokio::task::spawn_blocking(move || calculate(feed.as_ref(), &engine, &cmd)).await;
                match joined {
                    Ok(Ok(calculated)) => {
                        info!(
                            %run_id,
                            hit_rate = calculated.result.hit_rate,
                            presentations = calculated.result.total_rack_presentations,
                            "run calculated"
                        );
                        bus.publish(BusMsg::RunResult(calculated));
                    }
                    Ok(Err(err)) => error!(%run_id, error = %format!("{err:#}"), "run failed"),
                    Err(join_err) => error!(%run_id, error = %join_err, "run task aborted"),
                }
            });
        }
    })
}

/// Consume `RunResult` messages and hand each to the correlator.
pub fn spawn_result_listener(bus: &RunBus, correlator: Arc<RunCorrelator>) -> JoinHandle<()> {
    let rx = bus.subscribe();
    tokio::spawn(async move {
        let stream = bus_stream(rx, "result_listener");
        tokio::pin!(stream);

        while let Some(msg) = stream.next().await {
            if let BusMsg::RunResult(HitRateCalculated { run_id, result }) = msg {
                correlator.resolve(run_id, result);
            }
        }
    })
}
