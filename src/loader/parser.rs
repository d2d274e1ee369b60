use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::cluster_meta_dto::ClusterMetaDto;
use crate::api::config_dto::SquirrelConfigDto;
use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_PATH: &str = "squirrel.json";
pub const CONFIG_ENV_VAR: &str = "SQUIRREL_CONFIG";

/// Parses a JSON file into a given type `T`.
///
/// Errors are automatically converted into `crate::error::Error` variants:
/// - `Error::IoError` if the file cannot be read.
/// - `Error::DeserializationError` if the JSON is malformed.
pub fn parse_json_file<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let data = fs::read_to_string(file_path)?;

    let parsed_data: T = serde_json::from_str(&data)?;

    Ok(parsed_data)
}

/// Location of the configuration: the explicit path, else `$SQUIRREL_CONFIG`, else
/// `squirrel.json` in the working directory.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => std::env::var(CONFIG_ENV_VAR).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
    }
}

pub fn load_config(path: &Path) -> Result<SquirrelConfigDto> {
    let config: SquirrelConfigDto = parse_json_file(path).map_err(|e| Error::ConfigurationError(format!("'{}': {}", path.display(), e)))?;

    if config.forecast.forecast_days == 0 || config.forecast.lookback_days == 0 {
        return Err(Error::ConfigurationError("forecastDays and lookbackDays must be at least 1.".to_string()));
    }

    log::debug!("Loaded configuration from '{}'.", path.display());
    Ok(config)
}

/// Cluster meta file; without one, every node is treated as a blackbox node.
pub fn load_cluster_meta(path: Option<&Path>) -> Result<ClusterMetaDto> {
    match path {
        Some(path) => parse_json_file(path),
        None => {
            log::warn!("No cluster meta file configured, TDP information is unavailable.");
            Ok(ClusterMetaDto::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("squirrel.json");
        fs::write(
            &path,
            r#"{
                "local": {"schedule": "schedule.csv", "clusterMeta": "cluster.json"},
                "forecast": {"forecastDays": 2, "lookbackDays": 7, "zone": "DE"},
                "influxdb": {
                    "url": "http://localhost:8086", "org": "squirrel", "token": "secret",
                    "history": {"bucket": "gci", "measurement": "gci", "field": "value"},
                    "forecast": {"bucket": "gci_forecast", "measurement": "gci", "field": "value"}
                }
            }"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();

        assert!(config.forecast.use_builtin);
        assert_eq!(config.scheduler.strategy, "SpatiotemporalShifting");
        assert_eq!(config.influxdb.timeout_secs, 30);
        assert_eq!(config.local.results_dir, PathBuf::from("results"));
    }

    #[test]
    fn test_missing_config_is_a_configuration_error() {
        let result = load_config(Path::new("/nonexistent/squirrel.json"));
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_explicit_config_path_wins() {
        assert_eq!(config_path(Some(Path::new("/etc/squirrel.json"))), PathBuf::from("/etc/squirrel.json"));
    }
}
