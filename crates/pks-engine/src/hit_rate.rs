//! Hit rate: items picked per rack presentation.

use std::collections::{BTreeMap, BTreeSet};

use pks_schemas::{HitRateResult, RackId};

use crate::batching::Batch;
use crate::slotting::RackMap;
use crate::stations::StationAssignment;

/// The published result plus the raw per-rack item totals behind `by_rack`.
#[derive(Clone, Debug, PartialEq)]
pub struct HitRateEvaluation {
    pub result: HitRateResult,
    pub rack_item_totals: BTreeMap<RackId, i64>,
}

/// Walk stations in id order and their batches in index order.
///
/// Each batch presents every distinct rack holding one of its SKUs once.
/// SKUs with no rack add items to the total but present nothing. Batch indices
/// outside `batches` are ignored.
pub fn evaluate_hit_rate(
    mode: &str,
    stations: &StationAssignment,
    batches: &[Batch],
    racks: &RackMap,
) -> HitRateEvaluation {
    let mut rack_items: BTreeMap<RackId, i64> = racks.racks().iter().map(|r| (r.id, 0)).collect();
    let mut total_items: i64 = 0;
    let mut presentations: i64 = 0;

    for (_, batch_ids) in stations.iter() {
        for batch in batch_ids.iter().filter_map(|&i| batches.get(i)) {
            let mut touched: BTreeSet<RackId> = BTreeSet::new();
            for line in &batch.lines {
                total_items += line.qty;
                if let Some(rack) = racks.rack_of(&line.sku) {
                    touched.insert(rack);
                    *rack_items.entry(rack).or_insert(0) += line.qty;
                }
            }
            presentations += touched.len() as i64;
        }
    }

    let per_presentation = |items: i64| {
        if presentations == 0 {
            0.0
        } else {
            items as f64 / presentations as f64
        }
    };

    let result = HitRateResult {
        mode: mode.to_string(),
        hit_rate: per_presentation(total_items),
        total_items_picked: total_items,
        total_rack_presentations: presentations,
        by_rack: rack_items
            .iter()
            .map(|(id, items)| (*id, per_presentation(*items)))
            .collect(),
    };

    HitRateEvaluation {
        result,
        rack_item_totals: rack_items,
    }
}
