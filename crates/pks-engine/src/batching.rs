//! Wave batch builder.
//!
//! Orders are walked in first-seen order, each order's SKUs in first-seen
//! order with quantities summed. The close check always runs before the
//! incoming line is appended, so a batch never exceeds its caps.

use std::collections::{BTreeSet, HashMap, HashSet};

use pks_schemas::SalesLine;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PickingPolicy {
    /// Lines bounded by count and by distinct SKUs per batch.
    PickToLight,
    /// Lines bounded by count only.
    PickToOrder,
}

impl PickingPolicy {
    pub fn from_flag(use_pick_to_order: bool) -> Self {
        if use_pick_to_order {
            Self::PickToOrder
        } else {
            Self::PickToLight
        }
    }
}

/// One SKU of one order, quantities summed across the order's sales lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub order_id: String,
    pub sku: String,
    pub qty: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Batch {
    pub lines: Vec<OrderLine>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn items(&self) -> i64 {
        self.lines.iter().map(|l| l.qty).sum()
    }

    pub fn distinct_skus(&self) -> BTreeSet<&str> {
        self.lines.iter().map(|l| l.sku.as_str()).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_batch_lines: usize,
    pub max_skus_per_station: usize,
}

impl BatchLimits {
    pub fn new(max_batch_lines: usize, max_skus_per_station: usize) -> Self {
        Self {
            max_batch_lines: max_batch_lines.max(1),
            max_skus_per_station: max_skus_per_station.max(1),
        }
    }
}

/// Collapse sales lines into order lines: one per `(order, sku)`, in
/// first-seen order of orders and, within an order, of SKUs.
pub fn group_order_lines(lines: &[SalesLine]) -> Vec<OrderLine> {
    let mut orders: Vec<Vec<OrderLine>> = Vec::new();
    let mut order_pos: HashMap<&str, usize> = HashMap::new();
    let mut line_pos: HashMap<(&str, &str), usize> = HashMap::new();

    for line in lines {
        let o = *order_pos.entry(line.order_id.as_str()).or_insert_with(|| {
            orders.push(Vec::new());
            orders.len() - 1
        });
        let key = (line.order_id.as_str(), line.sku.as_str());
        match line_pos.get(&key) {
            Some(&l) => orders[o][l].qty += line.qty,
            None => {
                line_pos.insert(key, orders[o].len());
                orders[o].push(OrderLine {
                    order_id: line.order_id.clone(),
                    sku: line.sku.clone(),
                    qty: line.qty,
                });
            }
        }
    }

    orders.into_iter().flatten().collect()
}

pub fn build_batches(lines: &[SalesLine], policy: PickingPolicy, limits: BatchLimits) -> Vec<Batch> {
    let limits = BatchLimits::new(limits.max_batch_lines, limits.max_skus_per_station);
    let mut batches = Vec::new();
    let mut current = Batch::default();
    // Distinct SKUs in `current`, kept in step with it.
    let mut current_skus: HashSet<String> = HashSet::new();

    for line in group_order_lines(lines) {
        if should_close(&current, &current_skus, &line, policy, limits) {
            batches.push(std::mem::take(&mut current));
            current_skus.clear();
        }
        if !current_skus.contains(&line.sku) {
            current_skus.insert(line.sku.clone());
        }
        current.lines.push(line);
    }

    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

fn should_close(
    current: &Batch,
    current_skus: &HashSet<String>,
    incoming: &OrderLine,
    policy: PickingPolicy,
    limits: BatchLimits,
) -> bool {
    if current.is_empty() {
        return false;
    }
    if current.len() >= limits.max_batch_lines {
        return true;
    }
    match policy {
        PickingPolicy::PickToOrder => false,
        PickingPolicy::PickToLight => {
            current_skus.len() >= limits.max_skus_per_station && !current_skus.contains(&incoming.sku)
        }
    }
}
