//! pks-runtime
//!
//! Asynchronous run plumbing around the simulation engine:
//!
//! CALLER -> RunGateway -> bus(StartRun) -> calculation worker
//!        <- RunCorrelator <- result listener <- bus(RunResult)
//!
//! The gateway registers with the correlator *before* publishing, so a result
//! can never arrive ahead of its waiter.

pub mod bus;
pub mod correlator;
pub mod worker;

use std::sync::Arc;
use std::time::Duration;

use pks_engine::SimulationEngine;
use pks_feed::RecordFeed;
use pks_schemas::StartRunCommand;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

pub use bus::{bus_stream, BusMsg, RunBus, DEFAULT_BUS_CAPACITY};
pub use correlator::{RunCorrelator, RunOutcome, WaitHandle};
pub use worker::{calculate, spawn_calculation_worker, spawn_result_listener};

/// Submit-and-wait front door shared by every synchronous caller.
#[derive(Clone, Debug)]
pub struct RunGateway {
    bus: RunBus,
    correlator: Arc<RunCorrelator>,
    default_dataset_path: String,
    await_timeout: Duration,
}

impl RunGateway {
    pub fn new(
        bus: RunBus,
        correlator: Arc<RunCorrelator>,
        default_dataset_path: impl Into<String>,
        await_timeout: Duration,
    ) -> Self {
        Self {
            bus,
            correlator,
            default_dataset_path: default_dataset_path.into(),
            await_timeout,
        }
    }

    pub fn correlator(&self) -> &Arc<RunCorrelator> {
        &self.correlator
    }

    pub fn await_timeout(&self) -> Duration {
        self.await_timeout
    }

    /// Normalize `cmd`, publish it, and wait for its result or the deadline.
    pub async fn submit_and_wait(&self, cmd: StartRunCommand) -> (Uuid, RunOutcome) {
        let cmd = cmd.normalized(&self.default_dataset_path);
        let run_id = cmd.run_id;
        let handle = self.correlator.begin(run_id);

        info!(
            %run_id,
            mode = %cmd.mode,
            dataset = %cmd.dataset_path,
            "run submitted"
        );
        if self.bus.publish(BusMsg::StartRun(cmd)) == 0 {
            warn!(%run_id, "no bus subscribers; run will time out");
        }

        let outcome = self.correlator.await_result(handle, self.await_timeout).await;
        match &outcome {
            RunOutcome::Completed(r) => info!(%run_id, hit_rate = r.hit_rate, "run completed"),
            RunOutcome::TimedOut => warn!(
                %run_id,
                timeout_ms = self.await_timeout.as_millis() as u64,
                "run timed out"
            ),
        }
        (run_id, outcome)
    }
}

/// Background tasks backing a [`RunGateway`].
#[derive(Debug)]
pub struct RuntimeTasks {
    pub worker: JoinHandle<()>,
    pub listener: JoinHandle<()>,
}

impl RuntimeTasks {
    pub fn abort(&self) {
        self.worker.abort();
        self.listener.abort();
    }
}

/// Wire a bus, worker, listener and correlator into a ready gateway.
///
/// Must be called inside a Tokio runtime.
pub fn start_runtime(
    bus_capacity: usize,
    feed: Arc<dyn RecordFeed>,
    engine: SimulationEngine,
    default_dataset_path: impl Into<String>,
    await_timeout: Duration,
) -> (RunGateway, RuntimeTasks) {
    let bus = RunBus::new(bus_capacity);
    let correlator = Arc::new(RunCorrelator::new());

    let listener = spawn_result_listener(&bus, Arc::clone(&correlator));
    let worker = spawn_calculation_worker(bus.clone(), feed, engine);

    let gateway = RunGateway::new(bus, correlator, default_dataset_path, await_timeout);
    (gateway, RuntimeTasks { worker, listener })
}
