use chrono::{DateTime, Duration, DurationRound, Utc};
use std::collections::BTreeMap;

use crate::domain::gci_store::gci_store_trait::GciPoint;
use crate::error::{Error, Result};

/// Truncates `time` to the start of its hour.
pub fn floor_hour(time: DateTime<Utc>) -> DateTime<Utc> {
    time.duration_trunc(Duration::hours(1)).unwrap_or(time)
}

/// Places `points` on an hourly grid between the earliest and the latest known point and forward
/// fills hours without a value. The grid starts at a known point, so there is never a leading gap
/// to backward fill. Points are snapped to their hour; on collisions the later point wins.
pub fn fill_hourly_gaps(points: &[GciPoint]) -> BTreeMap<DateTime<Utc>, f64> {
    let known: BTreeMap<DateTime<Utc>, f64> = points.iter().filter(|point| point.gci.is_finite()).map(|point| (floor_hour(point.time), point.gci)).collect();

    let (Some((&first, _)), Some((&last, _))) = (known.first_key_value(), known.last_key_value()) else {
        return BTreeMap::new();
    };

    let mut grid = BTreeMap::new();
    let mut previous: Option<f64> = None;
    let mut hour = first;

    while hour <= last {
        if let Some(value) = known.get(&hour) {
            previous = Some(*value);
        }
        if let Some(value) = previous {
            grid.insert(hour, value);
        }
        hour += Duration::hours(1);
    }

    grid
}

/// Median of `values`. For an even count, the mean of the two middle values.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;

    if values.len() % 2 == 0 {
        return Some((values[mid - 1] + values[mid]) / 2.0);
    }

    Some(values[mid])
}

/// Forecasts the grid carbon intensity of the `days * 24` hours following the latest point of
/// `history`.
///
/// Every hour `h` is predicted as the median of the values at `h - k days` for `k = 1..=lookback`.
/// Values inside the history are taken from it, values beyond it from the forecast produced so
/// far (the forecast is built strictly in chronological order). Missing points are skipped.
///
/// # Errors
/// `InsufficientHistory` if `history` is empty or an hour has no point to take the median of.
pub fn forecast(history: &[GciPoint], days: u32, lookback: u32) -> Result<Vec<GciPoint>> {
    let grid = fill_hourly_gaps(history);

    let Some((&latest, _)) = grid.last_key_value() else {
        return Err(Error::InsufficientHistory { at: history.iter().map(|point| point.time).max().unwrap_or_else(Utc::now) });
    };

    let mut forecasted: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();

    for hour in 1..=(i64::from(days) * 24) {
        let time_point = latest + Duration::hours(hour);

        let mut points: Vec<f64> = (1..=i64::from(lookback))
            .filter_map(|day_offset| {
                let past_time_point = time_point - Duration::days(day_offset);
                if past_time_point <= latest { grid.get(&past_time_point).copied() } else { forecasted.get(&past_time_point).copied() }
            })
            .collect();

        let Some(value) = median(&mut points) else {
            log::error!("No lookback point available to forecast {} (lookback: {} days).", time_point, lookback);
            return Err(Error::InsufficientHistory { at: time_point });
        };

        forecasted.insert(time_point, value);
    }

    log::debug!("Forecasted {} hours after {} with a lookback of {} days.", forecasted.len(), latest, lookback);

    Ok(forecasted.into_iter().map(|(time, gci)| GciPoint::new(time, gci)).collect())
}
