//! Response types for the pks-daemon HTTP endpoints.
//!
//! The request body for `/run` is `pks_schemas::StartRunCommand` as-is.

use pks_schemas::HitRateResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const STATUS_TIMEOUT: &str = "timeout";

// ---------------------------------------------------------------------------
// POST /run
// ---------------------------------------------------------------------------

/// The run finished inside the deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCompletedResponse {
    pub run_id: Uuid,
    pub result: HitRateResult,
}

/// No result arrived before the deadline. Not an HTTP error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTimeoutResponse {
    pub run_id: Uuid,
    /// Always [`STATUS_TIMEOUT`].
    pub status: String,
}

impl RunTimeoutResponse {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            status: STATUS_TIMEOUT.to_string(),
        }
    }
}
