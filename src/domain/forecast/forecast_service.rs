use chrono::{DateTime, Duration, Utc};

use crate::domain::forecast::forecaster::forecast;
use crate::domain::gci_store::gci_store_trait::{GciPoint, GciStore, SeriesTags};
use crate::error::{Error, Result};

/// Reads `lookback_days` days (plus one hour) of history before `at` and forecasts the following
/// `forecast_days` days.
pub async fn forecast_at(history_store: &dyn GciStore, tags: &SeriesTags, at: DateTime<Utc>, forecast_days: u32, lookback_days: u32) -> Result<Vec<GciPoint>> {
    let history_start = at - Duration::days(i64::from(lookback_days)) - Duration::hours(1);
    let history = history_store.get_history(history_start, at, tags).await?;

    if history.is_empty() {
        return Err(Error::InsufficientHistory { at });
    }

    forecast(&history, forecast_days, lookback_days)
}

/// Forecasts at `at` and writes the result into the forecast series.
pub async fn forecast_to_store(
    history_store: &dyn GciStore,
    forecast_store: &dyn GciStore,
    tags: &SeriesTags,
    at: DateTime<Utc>,
    forecast_days: u32,
    lookback_days: u32,
) -> Result<usize> {
    let points = forecast_at(history_store, tags, at, forecast_days, lookback_days).await?;
    forecast_store.write(&points, tags).await?;

    log::info!("Wrote {} forecast points for {:?} starting at {}.", points.len(), tags, at);
    Ok(points.len())
}

/// One daily forecast for each of `amount_days` days starting at `start`, each written into the
/// forecast series. Later forecasts overwrite overlapping hours of earlier ones.
pub async fn forecast_range_to_store(
    history_store: &dyn GciStore,
    forecast_store: &dyn GciStore,
    tags: &SeriesTags,
    start: DateTime<Utc>,
    amount_days: u32,
    forecast_days: u32,
    lookback_days: u32,
) -> Result<usize> {
    let mut written = 0;

    for day in 0..i64::from(amount_days) {
        let at = start + Duration::days(day);
        written += forecast_to_store(history_store, forecast_store, tags, at, forecast_days, lookback_days).await?;
    }

    Ok(written)
}
