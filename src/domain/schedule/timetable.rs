use chrono::{DateTime, Duration, Utc};
use std::ops::Range;

use crate::domain::forecast::forecaster::{fill_hourly_gaps, forecast};
use crate::domain::gci_store::gci_store_trait::{GciPoint, GciStore, SeriesTags};
use crate::domain::schedule::timeslot::{Reservation, Timeslot};
use crate::domain::utils::id::JobId;
use crate::error::{Error, Result};

/// Ordered, contiguous sequence of timeslots forming the scheduling horizon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timetable {
    pub timeslots: Vec<Timeslot>,
}

impl Timetable {
    pub fn new() -> Self {
        Timetable { timeslots: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.timeslots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timeslots.is_empty()
    }

    /// End of the horizon, i.e. the end of the latest timeslot.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.timeslots.last().map(|slot| slot.end)
    }

    /// Appends `timeslot` after the latest timeslot.
    ///
    /// # Returns
    /// `false` (and leaves the timetable unchanged) if the timeslot does not start exactly where
    /// the latest timeslot ends.
    pub fn append(&mut self, timeslot: Timeslot) -> bool {
        if let Some(end) = self.end() {
            if end != timeslot.start {
                log::warn!("Rejected non-contiguous timeslot starting at {} (timetable ends at {}).", timeslot.start, end);
                return false;
            }
        }

        self.timeslots.push(timeslot);
        true
    }

    /// Discards all timeslots ending at or before `cutoff`.
    pub fn truncate_history(&mut self, cutoff: DateTime<Utc>) {
        let past = self.timeslots.iter().take_while(|slot| slot.end <= cutoff).count();

        if past > 0 {
            log::debug!("Dropping {} timeslots ending before {}.", past, cutoff);
            self.timeslots.drain(..past);
        }
    }

    /// Appends one hourly timeslot per point. Points starting before the current end of the
    /// timetable are skipped, so slots that already carry reservations are kept as they are.
    ///
    /// The whole batch is validated first; on error the timetable is unchanged.
    ///
    /// # Returns
    /// The number of appended timeslots.
    pub fn append_direct(&mut self, points: &[GciPoint]) -> Result<usize> {
        let mut expected_start = self.end();
        let mut new_slots = Vec::new();

        for point in points {
            if let Some(expected) = expected_start {
                if point.time < expected {
                    continue;
                }
                if point.time != expected {
                    return Err(Error::NonContiguousTimeslot { start: point.time, end: expected });
                }
            }

            let slot = Timeslot::hourly(point.time, point.gci);
            expected_start = Some(slot.end);
            new_slots.push(slot);
        }

        let appended = new_slots.len();
        self.timeslots.extend(new_slots);

        Ok(appended)
    }

    /// Backfills the timetable with the builtin forecast for `forecast_days` days starting at
    /// `start`, based on `lookback_days` days of history read from `store`.
    ///
    /// The forecast is computed completely before the timetable is touched; on any error the
    /// timetable is unchanged.
    pub async fn append_forecast(
        &mut self,
        store: &dyn GciStore,
        tags: &SeriesTags,
        start: DateTime<Utc>,
        forecast_days: u32,
        lookback_days: u32,
    ) -> Result<usize> {
        let history_start = start - Duration::days(i64::from(lookback_days)) - Duration::hours(1);
        let history = store.get_history(history_start, start, tags).await?;

        if history.is_empty() {
            log::error!("No GCI history available in [{}, {}) for {:?}.", history_start, start, tags);
            return Err(Error::InsufficientHistory { at: start });
        }

        let forecast = forecast(&history, forecast_days, lookback_days)?;
        let appended = self.append_direct(&forecast)?;

        log::info!("Appended {} forecast timeslots starting at {}.", appended, start);
        Ok(appended)
    }

    /// Same as [`Timetable::append_forecast`], but reads a forecast series that was written to
    /// `store` earlier instead of forecasting.
    pub async fn append_stored_forecast(&mut self, store: &dyn GciStore, tags: &SeriesTags, start: DateTime<Utc>, forecast_days: u32) -> Result<usize> {
        let stop = start + Duration::days(i64::from(forecast_days));
        let stored = store.get_history(start, stop, tags).await?;

        if stored.is_empty() {
            return Err(Error::InsufficientHistory { at: start });
        }

        let points = gap_free(&stored);
        self.append_direct(&points)
    }

    /// Appends ground-truth values of `[start, end)`. Used for evaluation, not for live
    /// scheduling.
    pub async fn append_historic(&mut self, store: &dyn GciStore, tags: &SeriesTags, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<usize> {
        let history = store.get_history(start, end, tags).await?;

        if history.is_empty() {
            return Err(Error::InsufficientHistory { at: start });
        }

        let points = gap_free(&history);
        self.append_direct(&points)
    }

    /// Slot index ranges of every window of `hours` consecutive timeslots, chronologically.
    pub fn windows(&self, hours: usize) -> Vec<Range<usize>> {
        let count = if hours == 0 || hours > self.len() { 0 } else { self.len() - hours + 1 };
        (0..count).map(|start| start..start + hours).collect()
    }

    /// Sum of the carbon intensity over the timeslots of `window`.
    pub fn window_weight(&self, window: &Range<usize>) -> f64 {
        self.timeslots[window.clone()].iter().map(|slot| slot.gci).sum()
    }

    /// All reservations of `job_id` together with the index of their timeslot.
    pub fn reservations_of(&self, job_id: &JobId) -> Vec<(usize, &Reservation)> {
        self.timeslots.iter().enumerate().filter_map(|(index, slot)| slot.get_reservation(job_id).map(|reservation| (index, reservation))).collect()
    }

    /// Removes every reservation of `job_id`. Returns the number of touched timeslots.
    pub fn remove_job(&mut self, job_id: &JobId) -> usize {
        self.timeslots.iter_mut().map(|slot| slot.remove(job_id)).filter(|removed| *removed).count()
    }
}

/// Fills hourly gaps of a ground-truth or stored series so it can be appended as timeslots.
fn gap_free(points: &[GciPoint]) -> Vec<GciPoint> {
    fill_hourly_gaps(points).into_iter().map(|(time, gci)| GciPoint::new(time, gci)).collect()
}
