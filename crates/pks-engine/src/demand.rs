//! Demand ranking: per-SKU aggregation, stable ordering, seasonality boost.

use std::collections::{HashMap, HashSet};

use chrono::Datelike;
use pks_schemas::SalesLine;
use serde::Serialize;

/// Aggregated demand for one `(sku, category)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkuDemand {
    pub sku: String,
    pub category: String,
    /// Units sold, plus the seasonality boost when enabled.
    pub total_units: i64,
    /// Distinct orders containing this SKU.
    pub order_count: usize,
}

/// Which month gets extra ranking weight, and how much.
///
/// The boost added to a SKU is `floor(month_units * boost_fraction)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeasonalityPolicy {
    /// Calendar month, 1..=12.
    pub month: u32,
    pub boost_fraction: f64,
}

impl SeasonalityPolicy {
    /// December demand counts 20% extra.
    pub const DECEMBER_20_PCT: Self = Self {
        month: 12,
        boost_fraction: 0.2,
    };

    pub fn new(month: u32, boost_fraction: f64) -> Self {
        Self {
            month,
            boost_fraction,
        }
    }

    /// This policy with whichever fields are given replaced.
    pub fn with_overrides(self, month: Option<u32>, boost_fraction: Option<f64>) -> Self {
        Self {
            month: month.unwrap_or(self.month),
            boost_fraction: boost_fraction.unwrap_or(self.boost_fraction),
        }
    }

    pub fn boost_for(&self, month_units: i64) -> i64 {
        (month_units as f64 * self.boost_fraction).floor() as i64
    }
}

impl Default for SeasonalityPolicy {
    fn default() -> Self {
        Self::DECEMBER_20_PCT
    }
}

/// Rank SKUs by total units, descending.
///
/// Ties keep first-seen order. With `boost` set, units sold in the policy month
/// are boosted per SKU and the ranking is re-sorted with the same stable rule.
/// Category and order count are never changed by the boost.
pub fn rank_demand(lines: &[SalesLine], boost: bool, policy: &SeasonalityPolicy) -> Vec<SkuDemand> {
    let mut ranking: Vec<SkuDemand> = Vec::new();
    let mut orders: Vec<HashSet<&str>> = Vec::new();
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();

    for line in lines {
        let key = (line.sku.as_str(), line.category.as_str());
        let i = *index.entry(key).or_insert_with(|| {
            ranking.push(SkuDemand {
                sku: line.sku.clone(),
                category: line.category.clone(),
                total_units: 0,
                order_count: 0,
            });
            orders.push(HashSet::new());
            ranking.len() - 1
        });
        ranking[i].total_units += line.qty;
        orders[i].insert(line.order_id.as_str());
    }

    for (entry, seen) in ranking.iter_mut().zip(&orders) {
        entry.order_count = seen.len();
    }

    sort_by_units_desc(&mut ranking);

    if boost {
        let mut month_units: HashMap<&str, i64> = HashMap::new();
        for line in lines.iter().filter(|l| l.order_date.month() == policy.month) {
            *month_units.entry(line.sku.as_str()).or_insert(0) += line.qty;
        }
        for entry in ranking.iter_mut() {
            if let Some(units) = month_units.get(entry.sku.as_str()) {
                entry.total_units += policy.boost_for(*units);
            }
        }
        sort_by_units_desc(&mut ranking);
    }

    ranking
}

// `sort_by` is stable: equal totals keep their current relative order.
fn sort_by_units_desc(ranking: &mut [SkuDemand]) {
    ranking.sort_by(|a, b| b.total_units.cmp(&a.total_units));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pks_testkit::{line, line_on};

    #[test]
    fn aggregates_units_and_distinct_orders() {
        let lines = vec![
            line("A", "X", 3),
            line("A", "X", 2),
            line("B", "X", 1),
            line("B", "Y", 4),
        ];
        let ranking = rank_demand(&lines, false, &SeasonalityPolicy::default());
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].sku, "X");
        assert_eq!(ranking[0].total_units, 6);
        assert_eq!(ranking[0].order_count, 2);
        assert_eq!(ranking[1].sku, "Y");
        assert_eq!(ranking[1].order_count, 1);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let lines = vec![line("A", "C", 2), line("A", "B", 2), line("B", "A", 2)];
        let ranking = rank_demand(&lines, false, &SeasonalityPolicy::default());
        let skus: Vec<&str> = ranking.iter().map(|d| d.sku.as_str()).collect();
        assert_eq!(skus, vec!["C", "B", "A"]);
    }

    #[test]
    fn december_boost_reorders_ranking() {
        // Q: 9 units, all in December -> 9 + floor(1.8) = 10.
        // R: 9 units, 5 in December -> 9 + 1 = 10. Ties keep the prior order.
        let lines = vec![
            line_on("A", "P", 10, 2018, 6, 1),
            line_on("B", "Q", 9, 2018, 12, 3),
            line_on("C", "R", 4, 2018, 3, 3),
            line_on("C", "R", 5, 2018, 12, 24),
            line_on("D", "S", 11, 2018, 1, 1),
        ];
        let plain = rank_demand(&lines, false, &SeasonalityPolicy::default());
        let plain_skus: Vec<&str> = plain.iter().map(|d| d.sku.as_str()).collect();
        assert_eq!(plain_skus, vec!["S", "P", "Q", "R"]);

        let boosted = rank_demand(&lines, true, &SeasonalityPolicy::default());
        let boosted: Vec<(&str, i64)> = boosted
            .iter()
            .map(|d| (d.sku.as_str(), d.total_units))
            .collect();
        assert_eq!(boosted, vec![("S", 11), ("P", 10), ("Q", 10), ("R", 10)]);
    }

    #[test]
    fn boost_is_floored_and_leaves_other_months_alone() {
        let lines = vec![line_on("A", "X", 4, 2018, 12, 1), line_on("A", "Y", 4, 2018, 11, 1)];
        let boosted = rank_demand(&lines, true, &SeasonalityPolicy::default());
        // floor(4 * 0.2) = 0: no change for X, and Y is untouched.
        assert!(boosted.iter().all(|d| d.total_units == 4));

        let big = vec![line_on("A", "X", 5, 2018, 12, 1), line_on("A", "Y", 5, 2018, 11, 1)];
        let boosted = rank_demand(&big, true, &SeasonalityPolicy::default());
        assert_eq!(boosted[0].sku, "X");
        assert_eq!(boosted[0].total_units, 6);
        assert_eq!(boosted[1].total_units, 5);
    }

    #[test]
    fn custom_policy_month_is_honoured() {
        let lines = vec![line_on("A", "X", 10, 2018, 11, 1), line_on("B", "Y", 11, 2018, 1, 1)];
        let november = SeasonalityPolicy::new(11, 0.5);
        let ranking = rank_demand(&lines, true, &november);
        assert_eq!(ranking[0].sku, "X");
        assert_eq!(ranking[0].total_units, 15);
    }

    #[test]
    fn same_sku_under_two_categories_is_two_entries() {
        let mut a = line("A", "X", 1);
        a.category = "Office".to_string();
        let b = line("B", "X", 2);
        let ranking = rank_demand(&[a, b], false, &SeasonalityPolicy::default());
        assert_eq!(ranking.len(), 2);
    }

    #[test]
    fn empty_input_gives_empty_ranking() {
        assert!(rank_demand(&[], true, &SeasonalityPolicy::default()).is_empty());
    }
}
