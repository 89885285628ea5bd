//! In-process run bus.
//!
//! One `tokio::sync::broadcast` channel carries both directions: run
//! submissions towards the calculation worker and results back towards the
//! correlator. Every subscriber sees every message and ignores what it does
//! not handle.

use futures_util::{Stream, StreamExt};
use pks_schemas::{HitRateCalculated, StartRunCommand};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, warn};

pub const DEFAULT_BUS_CAPACITY: usize = 1024;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    StartRun(StartRunCommand),
    RunResult(HitRateCalculated),
}

impl BusMsg {
    pub fn kind(&self) -> &'static str {
        match self {
            BusMsg::StartRun(_) => "start_run",
            BusMsg::RunResult(_) => "run_result",
        }
    }
}

/// Cloneable publishing handle.
#[derive(Clone, Debug)]
pub struct RunBus {
    tx: broadcast::Sender<BusMsg>,
}

impl Default for RunBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl RunBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to all current subscribers. Returns how many received it; a
    /// message sent with nobody listening is dropped.
    pub fn publish(&self, msg: BusMsg) -> usize {
        let kind = msg.kind();
        match self.tx.send(msg) {
            Ok(n) => n,
            Err(_) => {
                debug!(kind, "bus message dropped: no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusMsg> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Turn a receiver into a stream that skips over lag.
///
/// A lagged receiver logs a WARN with the number of missed messages and keeps
/// going from the oldest message still buffered. The stream ends when every
/// sender is gone.
pub fn bus_stream(rx: broadcast::Receiver<BusMsg>, consumer: &'static str) -> impl Stream<Item = BusMsg> {
    BroadcastStream::new(rx).filter_map(move |msg| async move {
        match msg {
            Ok(m) => Some(m),
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                warn!(consumer, missed, "bus subscriber lagged; messages lost");
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pks_schemas::{HitRateResult, RunParameters};
    use uuid::Uuid;

    #[test]
    fn wire_shape_is_type_tagged() {
        let msg = BusMsg::RunResult(HitRateCalculated {
            run_id: Uuid::nil(),
            result: HitRateResult::empty("m"),
        });
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["type"], "run_result");
        assert_eq!(v["runId"], Uuid::nil().to_string());
        assert_eq!(v["result"]["mode"], "m");
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let bus = RunBus::new(4);
        let msg = BusMsg::StartRun(StartRunCommand::new("x.csv", "m", RunParameters::default()));
        assert_eq!(bus.publish(msg), 0);
    }

    #[tokio::test]
    async fn lagged_stream_skips_ahead() {
        let bus = RunBus::new(2);
        let rx = bus.subscribe();
        for i in 0..5 {
            bus.publish(BusMsg::StartRun(StartRunCommand::new(
                format!("d{i}.csv"),
                "m",
                RunParameters::default(),
            )));
        }
        drop(bus);

        let seen: Vec<BusMsg> = bus_stream(rx, "test").collect().await;
        let paths: Vec<String> = seen
            .into_iter()
            .filter_map(|m| match m {
                BusMsg::StartRun(c) => Some(c.dataset_path),
                BusMsg::RunResult(_) => None,
            })
            .collect();
        assert_eq!(paths, vec!["d3.csv", "d4.csv"]);
    }
}
