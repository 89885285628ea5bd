//! Round-robin station scheduling.

use std::collections::BTreeMap;

use pks_schemas::StationId;
use serde::Serialize;

/// Station id -> batch indices, in assignment order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StationAssignment {
    stations: BTreeMap<StationId, Vec<usize>>,
}

impl StationAssignment {
    /// Stations in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&StationId, &Vec<usize>)> {
        self.stations.iter()
    }

    pub fn batches_for(&self, station: StationId) -> Option<&[usize]> {
        self.stations.get(&station).map(Vec::as_slice)
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }
}

/// Batch `i` goes to station `S((i mod n) + 1)` with
/// `n = min(max_stations_open, max(1, batch_count))`.
///
/// Zero batches still open one (empty) station.
pub fn assign_round_robin(batch_count: usize, max_stations_open: usize) -> StationAssignment {
    let n = max_stations_open.max(1).min(batch_count.max(1));

    let mut stations: BTreeMap<StationId, Vec<usize>> =
        (0..n).map(|s| (StationId::from_index(s), Vec::new())).collect();

    for i in 0..batch_count {
        if let Some(list) = stations.get_mut(&StationId::from_index(i % n)) {
            list.push(i);
        }
    }

    StationAssignment { stations }
}
