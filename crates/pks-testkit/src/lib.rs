//! Test fixtures shared by the workspace's unit and scenario tests.
//!
//! Not for production wiring: nothing outside `[dev-dependencies]` should
//! depend on this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use pks_feed::{FeedError, RecordFeed};
use pks_schemas::{RunParameters, SalesLine};

pub const DEFAULT_CATEGORY: &str = "General";
pub const DEFAULT_PRIORITY: &str = "Medium";

/// A small sales export in the production column layout.
///
/// Orders: A {Lamp x3, Desk x2}, B {Lamp x1}, C {Chair x4, Lamp x2} (C in December).
pub const SAMPLE_SALES_CSV: &str = include_str!("../fixtures/sample_sales.csv");

/// A sales line dated 2018-01-15 in the default category.
pub fn line(order_id: &str, sku: &str, qty: i64) -> SalesLine {
    line_on(order_id, sku, qty, 2018, 1, 15)
}

/// A sales line on a specific date in the default category.
pub fn line_on(order_id: &str, sku: &str, qty: i64, year: i32, month: u32, day: u32) -> SalesLine {
    SalesLine {
        order_id: order_id.to_string(),
        sku: sku.to_string(),
        category: DEFAULT_CATEGORY.to_string(),
        qty,
        order_date: NaiveDate::from_ymd_opt(year, month, day)
            .unwrap_or_else(|| panic!("invalid fixture date {year}-{month}-{day}")),
        priority: DEFAULT_PRIORITY.to_string(),
    }
}

/// Orders A {X:3, Y:2} and B {X:1}.
pub fn two_order_example() -> Vec<SalesLine> {
    vec![line("A", "X", 3), line("A", "Y", 2), line("B", "X", 1)]
}

/// Parameters for [`two_order_example`]: one SKU per rack, ten lines per batch,
/// pick-to-order, no boost.
pub fn two_order_example_params() -> RunParameters {
    RunParameters {
        use_seasonality_boost: false,
        max_skus_per_rack: 1,
        max_skus_per_station: 1,
        max_batch_lines: 10,
        use_pick_to_order: true,
        max_stations_open: 4,
    }
}

/// Deterministic pseudo-random sales lines (linear congruential, no deps).
///
/// `orders` orders with 1..=`max_lines_per_order` lines each, SKUs drawn from a
/// pool of `sku_pool` names, quantities 1..=9, dates spread across 2018.
pub fn generated_lines(
    seed: u64,
    orders: usize,
    max_lines_per_order: usize,
    sku_pool: usize,
) -> Vec<SalesLine> {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    let mut next = |bound: usize| -> usize {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((state >> 33) as usize) % bound.max(1)
    };

    let mut out = Vec::new();
    for o in 0..orders {
        let order_id = format!("O{o}");
        let month = 1 + next(12) as u32;
        let n_lines = 1 + next(max_lines_per_order);
        for _ in 0..n_lines {
            let sku = format!("SKU{}", next(sku_pool));
            let qty = 1 + next(9) as i64;
            out.push(line_on(&order_id, &sku, qty, 2018, month, 1 + next(28) as u32));
        }
    }
    out
}

/// In-memory [`RecordFeed`] keyed by source name. Unknown sources fail with
/// [`FeedError::Io`], like a missing file would.
#[derive(Debug, Default)]
pub struct InMemoryFeed {
    sources: HashMap<String, Vec<SalesLine>>,
    loads: AtomicUsize,
}

impl InMemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, name: &str, lines: Vec<SalesLine>) -> Self {
        self.sources.insert(name.to_string(), lines);
        self
    }

    /// How many `load` calls were made (successful or not).
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl RecordFeed for InMemoryFeed {
    fn source_name(&self) -> &'static str {
        "memory"
    }

    fn load(&self, source: &str) -> Result<Vec<SalesLine>, FeedError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.sources
            .get(source)
            .cloned()
            .ok_or_else(|| FeedError::Io(format!("unknown in-memory source '{source}'")))
    }
}
