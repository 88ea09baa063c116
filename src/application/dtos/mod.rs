use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Device, Metric};

/// Diagnostic summary of a completed setup run, printed by the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupReport {
    pub index: String,
    pub host: String,
    pub index_created: bool,
    pub index_ready: bool,
    pub dimension: Option<u32>,
    pub metric: Metric,
    pub deployment: Option<String>,
    pub dense_model: String,
    pub dense_dimensions: usize,
    pub device: Device,
    pub sparse_fitted: bool,
    pub elapsed_secs: f64,
    pub completed_at: DateTime<Utc>,
}

/// Error payload printed when setup fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupFailure {
    pub stage: String,
    pub error: String,
}
