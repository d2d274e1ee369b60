use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Strategy comparison run by `squirrel simulate`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDto {
    /// Power usage effectiveness of the data center.
    pub pue: f64,
    pub zones: Vec<String>,

    /// First submit date; one submission round per hour follows.
    pub start: DateTime<Utc>,
    pub days: u32,

    /// Length of the timetable every submission round schedules into.
    pub lookahead_hours: u32,

    /// Schedule on the stored forecast and account the footprint with the observed values.
    #[serde(default)]
    pub forecasted: bool,

    pub baseline: StrategyRunDto,
    pub benchmark: StrategyRunDto,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyRunDto {
    pub strategy: String,
    #[serde(default = "default_balance_grade")]
    pub balance_grade: f64,
    #[serde(default = "default_switch_threshold")]
    pub switch_threshold: f64,
    pub jobs: Vec<JobSubmissionDto>,
}

fn default_balance_grade() -> f64 {
    10.0
}

fn default_switch_threshold() -> f64 {
    0.25
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmissionDto {
    pub id: String,
    pub partitions: Vec<String>,
    pub reserved_hours: usize,
    #[serde(default)]
    pub num_gpus: Option<u32>,
    #[serde(default)]
    pub gpu_name: Option<String>,

    /// Measured power draw in watts per node, one value per reserved hour.
    pub power_draws: HashMap<String, Vec<f64>>,
}
