//! pks-schemas
//!
//! Shared data types for the pick-station simulator: the sales-line records
//! the feed produces, the run parameters a caller submits, the hit-rate result
//! the engine computes, and the two bus messages that carry them.
//!
//! Wire names are camelCase so payloads stay compatible with existing
//! submission clients. No business logic lives here beyond the capacity clamp.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Dataset used when a submission leaves `datasetPath` blank.
pub const DEFAULT_DATASET_PATH: &str = "/app/data/DataSetClean.csv";

/// Mode label used when a submission omits `mode` or sends it as null.
pub const DEFAULT_MODE_LABEL: &str = "default";

// ---------------------------------------------------------------------------
// SalesLine
// ---------------------------------------------------------------------------

/// One historical sales line as produced by a record feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesLine {
    pub order_id: String,
    pub sku: String,
    pub category: String,
    pub qty: i64,
    pub order_date: NaiveDate,
    pub priority: String,
}

// ---------------------------------------------------------------------------
// RunParameters
// ---------------------------------------------------------------------------

/// Caller-supplied knobs for one simulation run.
///
/// Capacity fields are kept signed exactly as received; use [`RunParameters::clamped`]
/// before feeding them to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunParameters {
    pub use_seasonality_boost: bool,
    pub max_skus_per_rack: i64,
    pub max_skus_per_station: i64,
    pub max_batch_lines: i64,
    #[serde(alias = "usePto")]
    pub use_pick_to_order: bool,
    pub max_stations_open: i64,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            use_seasonality_boost: false,
            max_skus_per_rack: 1,
            max_skus_per_station: 1,
            max_batch_lines: 1,
            use_pick_to_order: false,
            max_stations_open: 1,
        }
    }
}

/// Run parameters with every capacity floored at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampedParameters {
    pub use_seasonality_boost: bool,
    pub max_skus_per_rack: usize,
    pub max_skus_per_station: usize,
    pub max_batch_lines: usize,
    pub use_pick_to_order: bool,
    pub max_stations_open: usize,
}

impl RunParameters {
    /// Raise zero or negative capacities to 1. Never fails.
    pub fn clamped(&self) -> ClampedParameters {
        ClampedParameters {
            use_seasonality_boost: self.use_seasonality_boost,
            max_skus_per_rack: floor_one(self.max_skus_per_rack),
            max_skus_per_station: floor_one(self.max_skus_per_station),
            max_batch_lines: floor_one(self.max_batch_lines),
            use_pick_to_order: self.use_pick_to_order,
            max_stations_open: floor_one(self.max_stations_open),
        }
    }
}

fn floor_one(v: i64) -> usize {
    usize::try_from(v.max(1)).unwrap_or(usize::MAX)
}

// ---------------------------------------------------------------------------
// RackId / StationId
// ---------------------------------------------------------------------------

/// Error returned when a `R<n>` / `S<n>` label cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelParseError {
    pub expected_prefix: char,
    pub raw: String,
}

impl fmt::Display for LabelParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid label '{}': expected '{}' followed by a positive integer",
            self.raw, self.expected_prefix
        )
    }
}

impl std::error::Error for LabelParseError {}

fn parse_label(raw: &str, prefix: char) -> Result<u32, LabelParseError> {
    let err = || LabelParseError {
        expected_prefix: prefix,
        raw: raw.to_string(),
    };
    let digits = raw.strip_prefix(prefix).ok_or_else(err)?;
    match digits.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(err()),
    }
}

macro_rules! sequential_label {
    ($name:ident, $prefix:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            /// Build from a 1-based sequence number.
            pub fn new(n: u32) -> Self {
                Self(n.max(1))
            }

            /// Build from a 0-based position.
            pub fn from_index(i: usize) -> Self {
                Self::new(u32::try_from(i).unwrap_or(u32::MAX - 1) + 1)
            }

            pub fn number(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = LabelParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_label(s, $prefix).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

sequential_label!(
    RackId,
    'R',
    "Storage rack label (`R1`, `R2`, ...). Orders numerically, so `R2 < R10`."
);
sequential_label!(
    StationId,
    'S',
    "Pick station label (`S1`, `S2`, ...). Orders numerically."
);

// ---------------------------------------------------------------------------
// HitRateResult
// ---------------------------------------------------------------------------

/// Aggregate and per-rack presentation metrics for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitRateResult {
    /// Opaque label supplied by the caller, echoed back.
    pub mode: String,
    pub hit_rate: f64,
    pub total_items_picked: i64,
    pub total_rack_presentations: i64,
    /// Items attributed to each rack divided by the global presentation count.
    pub by_rack: BTreeMap<RackId, f64>,
}

impl HitRateResult {
    /// Result of a run with nothing to pick.
    pub fn empty(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            hit_rate: 0.0,
            total_items_picked: 0,
            total_rack_presentations: 0,
            by_rack: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Bus messages
// ---------------------------------------------------------------------------

/// Run submission. Every field is optional on the wire, and an explicit
/// `null` reads the same as an absent field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartRunCommand {
    /// Nil when the caller did not pick one; see [`StartRunCommand::normalized`].
    #[serde(deserialize_with = "null_as_default")]
    pub run_id: Uuid,
    #[serde(deserialize_with = "null_as_default")]
    pub dataset_path: String,
    /// Echoed back as sent, empty string included.
    #[serde(deserialize_with = "mode_or_default_label")]
    pub mode: String,
    #[serde(deserialize_with = "null_as_default")]
    pub params: RunParameters,
}

impl Default for StartRunCommand {
    fn default() -> Self {
        Self::new("", DEFAULT_MODE_LABEL, RunParameters::default())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn mode_or_default_label<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(|| DEFAULT_MODE_LABEL.to_string()))
}

impl StartRunCommand {
    pub fn new(dataset_path: impl Into<String>, mode: impl Into<String>, params: RunParameters) -> Self {
        Self {
            run_id: Uuid::nil(),
            dataset_path: dataset_path.into(),
            mode: mode.into(),
            params,
        }
    }

    /// Fill in a generated run id and the default dataset wherever the caller
    /// left them blank. `mode` is an opaque label and is left untouched.
    pub fn normalized(mut self, default_dataset_path: &str) -> Self {
        if self.run_id.is_nil() {
            self.run_id = Uuid::new_v4();
        }
        if self.dataset_path.trim().is_empty() {
            self.dataset_path = default_dataset_path.to_string();
        }
        self
    }
}

/// Result published by the calculation side for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitRateCalculated {
    pub run_id: Uuid,
    pub result: HitRateResult,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_raises_non_positive_capacities_to_one() {
        let p = RunParameters {
            use_seasonality_boost: true,
            max_skus_per_rack: 0,
            max_skus_per_station: -4,
            max_batch_lines: 7,
            use_pick_to_order: true,
            max_stations_open: i64::MIN,
        };
        let c = p.clamped();
        assert_eq!(c.max_skus_per_rack, 1);
        assert_eq!(c.max_skus_per_station, 1);
        assert_eq!(c.max_batch_lines, 7);
        assert_eq!(c.max_stations_open, 1);
        assert!(c.use_seasonality_boost);
        assert!(c.use_pick_to_order);
    }

    #[test]
    fn rack_ids_order_numerically_and_round_trip_as_labels() {
        let r2 = RackId::new(2);
        let r10 = RackId::new(10);
        assert!(r2 < r10);
        assert_eq!(r10.to_string(), "R10");
        assert_eq!("R10".parse::<RackId>().unwrap(), r10);
        assert_eq!(RackId::from_index(0), RackId::new(1));
        assert!("S1".parse::<RackId>().is_err());
        assert!("R0".parse::<RackId>().is_err());
        assert!("R".parse::<RackId>().is_err());
    }

    #[test]
    fn by_rack_serializes_with_string_keys_in_numeric_order() {
        let mut res = HitRateResult::empty("ptl");
        res.by_rack.insert(RackId::new(10), 0.5);
        res.by_rack.insert(RackId::new(2), 1.5);
        let json = serde_json::to_string(&res).unwrap();
        assert!(json.contains(r#""byRack":{"R2":1.5,"R10":0.5}"#), "{json}");

        let back: HitRateResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, res);
    }

    #[test]
    fn submission_accepts_legacy_pto_flag_and_ignores_rack_geometry() {
        let body = r#"{
            "mode": "pto",
            "params": {
                "useSeasonalityBoost": false,
                "maxSkusPerRack": 4,
                "maxSkusPerStation": 2,
                "maxBatchLines": 10,
                "usePto": true,
                "maxStationsOpen": 3,
                "racksLevels": 5,
                "slotsPerLevel": 8
            }
        }"#;
        let cmd: StartRunCommand = serde_json::from_str(body).unwrap();
        assert!(cmd.run_id.is_nil());
        assert!(cmd.params.use_pick_to_order);
        assert_eq!(cmd.params.max_stations_open, 3);
    }

    #[test]
    fn normalized_fills_blank_fields_only() {
        let cmd = StartRunCommand::new("  ", "", RunParameters::default()).normalized("/data/x.csv");
        assert!(!cmd.run_id.is_nil());
        assert_eq!(cmd.dataset_path, "/data/x.csv");
        assert_eq!(cmd.mode, "");

        let id = Uuid::new_v4();
        let mut keep = StartRunCommand::new("/mine.csv", "ptl", RunParameters::default());
        keep.run_id = id;
        let keep = keep.normalized("/data/x.csv");
        assert_eq!(keep.run_id, id);
        assert_eq!(keep.dataset_path, "/mine.csv");
        assert_eq!(keep.mode, "ptl");
    }

    #[test]
    fn explicit_nulls_read_as_absent_fields() {
        let body = r#"{"runId": null, "datasetPath": null, "mode": null, "params": null}"#;
        let cmd: StartRunCommand = serde_json::from_str(body).unwrap();
        assert_eq!(cmd, StartRunCommand::default());
        assert_eq!(cmd.mode, DEFAULT_MODE_LABEL);

        let empty: StartRunCommand = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, cmd);
    }

    #[test]
    fn present_mode_is_echoed_even_when_blank() {
        for sent in ["", "   ", "ptl"] {
            let body = serde_json::json!({ "mode": sent }).to_string();
            let cmd: StartRunCommand = serde_json::from_str(&body).unwrap();
            assert_eq!(cmd.normalized("/d.csv").mode, sent);
        }
    }

    #[test]
    fn null_dataset_path_falls_back_to_default_dataset() {
        let cmd: StartRunCommand = serde_json::from_str(r#"{"datasetPath": null, "mode": "m"}"#).unwrap();
        let cmd = cmd.normalized("/data/x.csv");
        assert_eq!(cmd.dataset_path, "/data/x.csv");
        assert_eq!(cmd.mode, "m");
    }
}
