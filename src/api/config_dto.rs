use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root of the `squirrel.json` configuration file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SquirrelConfigDto {
    pub local: LocalPathsDto,
    pub forecast: ForecastDto,
    pub influxdb: InfluxDbDto,
    #[serde(default)]
    pub scheduler: SchedulerDto,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalPathsDto {
    /// Persisted timetable (CSV).
    pub schedule: PathBuf,

    /// Output of `sinfo --json`. If missing, `sinfo` is executed.
    #[serde(default)]
    pub sinfo_json: Option<PathBuf>,

    /// Per-node TDP information.
    pub cluster_meta: Option<PathBuf>,

    /// Directory for simulation results.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDto {
    pub forecast_days: u32,
    pub lookback_days: u32,

    /// Use the builtin lookback-median forecaster instead of reading a forecast series from the store.
    #[serde(default = "default_true")]
    pub use_builtin: bool,

    /// Grid zone the scheduler optimizes for.
    pub zone: String,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfluxDbDto {
    pub url: String,
    pub org: String,
    pub token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub history: SeriesDto,
    pub forecast: SeriesDto,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesDto {
    pub bucket: String,
    pub measurement: String,
    pub field: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerDto {
    /// Name of the planning strategy, see `PlanningStrategy::from_str`.
    pub strategy: String,
    pub balance_grade: f64,
    pub switch_threshold: f64,

    /// Attempts to persist the timetable before giving up.
    pub write_retries: u32,
}

impl Default for SchedulerDto {
    fn default() -> Self {
        SchedulerDto { strategy: "SpatiotemporalShifting".to_string(), balance_grade: 10.0, switch_threshold: 0.25, write_retries: 3 }
    }
}
