//! Rack slotting: ranked SKUs fill racks in order, one rack at a time.

use std::collections::HashMap;

use pks_schemas::RackId;
use serde::Serialize;

use crate::demand::SkuDemand;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Rack {
    pub id: RackId,
    /// SKUs in rank order.
    pub skus: Vec<String>,
}

/// Racks in id order plus a SKU lookup.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RackMap {
    racks: Vec<Rack>,
    #[serde(skip)]
    sku_index: HashMap<String, RackId>,
}

impl RackMap {
    pub fn racks(&self) -> &[Rack] {
        &self.racks
    }

    /// Rack holding `sku`. When the same SKU text was ranked twice the first
    /// rack wins.
    pub fn rack_of(&self, sku: &str) -> Option<RackId> {
        self.sku_index.get(sku).copied()
    }

    pub fn len(&self) -> usize {
        self.racks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.racks.is_empty()
    }
}

/// Fill R1 with the top `max_skus_per_rack` entries, then R2, and so on.
/// `max_skus_per_rack` below 1 is treated as 1.
pub fn slot_racks(ranking: &[SkuDemand], max_skus_per_rack: usize) -> RackMap {
    let mut map = RackMap::default();

    for (i, chunk) in ranking.chunks(max_skus_per_rack.max(1)).enumerate() {
        let id = RackId::from_index(i);
        let skus: Vec<String> = chunk.iter().map(|d| d.sku.clone()).collect();
        for sku in &skus {
            map.sku_index.entry(sku.clone()).or_insert(id);
        }
        map.racks.push(Rack { id, skus });
    }

    map
}
