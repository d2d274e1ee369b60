use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::config_dto::SquirrelConfigDto;
use crate::domain::forecast::forecaster::floor_hour;
use crate::domain::gci_store::gci_store_trait::{GciStore, SeriesTags, zone_tags};
use crate::domain::gci_store::influxdb::InfluxDbStore;
use crate::domain::schedule::timetable::Timetable;
use crate::error::Result;

const RETRY_BACKOFF_MS: u64 = 200;

/// Loads the persisted timetable of one zone and keeps its horizon filled with GCI values.
#[derive(Debug, Clone)]
pub struct TimetableLoader {
    pub schedule_path: PathBuf,
    pub history_store: Arc<dyn GciStore>,

    /// Series written by `forecast to-store`; read when the builtin forecaster is disabled.
    pub forecast_store: Arc<dyn GciStore>,
    pub tags: SeriesTags,
    pub forecast_days: u32,
    pub lookback_days: u32,
    pub use_builtin: bool,
}

impl TimetableLoader {
    pub fn new(schedule_path: PathBuf, history_store: Arc<dyn GciStore>, forecast_store: Arc<dyn GciStore>, zone: &str) -> Self {
        TimetableLoader { schedule_path, history_store, forecast_store, tags: zone_tags(zone), forecast_days: 2, lookback_days: 7, use_builtin: true }
    }

    /// Loader backed by the InfluxDB series of the configuration.
    pub fn from_config(config: &SquirrelConfigDto) -> Result<Self> {
        let history_store = Arc::new(InfluxDbStore::new(&config.influxdb, config.influxdb.history.clone())?);
        let forecast_store = Arc::new(InfluxDbStore::new(&config.influxdb, config.influxdb.forecast.clone())?);

        let mut loader = TimetableLoader::new(config.local.schedule.clone(), history_store, forecast_store, &config.forecast.zone);
        loader.forecast_days = config.forecast.forecast_days;
        loader.lookback_days = config.forecast.lookback_days;
        loader.use_builtin = config.forecast.use_builtin;

        Ok(loader)
    }

    /// First slot start a job submitted at `now` may use: the next full hour.
    pub fn cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
        floor_hour(now) + Duration::hours(1)
    }

    /// Drops past timeslots and backfills the horizon up to `forecast_days` after the cutoff.
    ///
    /// Existing slots, and therefore committed reservations, are never replaced. On error the
    /// timetable is unchanged apart from the dropped past slots.
    pub async fn refresh(&self, timetable: &mut Timetable, now: DateTime<Utc>) -> Result<()> {
        let cutoff = Self::cutoff(now);
        timetable.truncate_history(cutoff);

        let appended = if self.use_builtin {
            timetable.append_forecast(self.history_store.as_ref(), &self.tags, cutoff, self.forecast_days, self.lookback_days).await?
        } else {
            timetable.append_stored_forecast(self.forecast_store.as_ref(), &self.tags, cutoff, self.forecast_days).await?
        };

        // Store lag can make the forecast start before the cutoff.
        timetable.truncate_history(cutoff);

        tracing::info!(appended, horizon = timetable.len(), %cutoff, "Refreshed timetable.");
        Ok(())
    }

    /// Reads the persisted timetable and refreshes it for a submission at `now`.
    pub async fn load(&self, now: DateTime<Utc>) -> Result<Timetable> {
        let mut timetable = Timetable::read_csv(&self.schedule_path)?;
        self.refresh(&mut timetable, now).await?;
        Ok(timetable)
    }

    pub async fn persist(&self, timetable: &Timetable, attempts: u32) -> Result<()> {
        persist_with_retry(timetable, &self.schedule_path, attempts).await
    }
}

/// Writes `timetable` to `path`, retrying retryable failures with a linear backoff. The last
/// error is returned once `attempts` are used up.
pub async fn persist_with_retry(timetable: &Timetable, path: &Path, attempts: u32) -> Result<()> {
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match timetable.write_csv(path) {
            Ok(()) => return Ok(()),
            Err(e) if e.is_retryable() && attempt < attempts => {
                log::warn!("Persisting timetable to '{}' failed (attempt {}/{}): {}", path.display(), attempt, attempts, e);
                tokio::time::sleep(std::time::Duration::from_millis(RETRY_BACKOFF_MS * u64::from(attempt))).await;
                attempt += 1;
            }
            Err(e) => {
                log::error!("Giving up persisting timetable to '{}': {}", path.display(), e);
                return Err(e);
            }
        }
    }
}

/// Delay between `now` and the reserved `start`, never negative.
pub fn begin_offset(start: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (start - now).max(Duration::zero())
}
