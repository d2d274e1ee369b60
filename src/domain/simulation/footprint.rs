use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

use crate::api::scenario_dto::JobSubmissionDto;
use crate::domain::schedule::timetable::Timetable;
use crate::domain::utils::id::JobId;
use crate::error::{Error, Result};

/// Carbon footprint and delay of one scheduled job set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundOutcome {
    /// gCO2-eq, rounded to two decimals.
    pub footprint: f64,

    /// Mean slot index of all reserved hours; `None` if no job was placed.
    pub delay: Option<f64>,
}

/// Accounts the footprint of `jobs` as scheduled in `timetable`:
/// `gci * watts / 1000 * pue * reserved hours`, summed over all reservations.
///
/// The n-th reserved hour of a job uses the n-th power draw of its node. With `observed`, the
/// carbon intensity is taken from there instead of the (forecast) timetable values.
pub fn footprint(timetable: &Timetable, jobs: &[JobSubmissionDto], pue: f64, observed: Option<&BTreeMap<DateTime<Utc>, f64>>) -> Result<RoundOutcome> {
    let mut read_counters: HashMap<&str, usize> = HashMap::new();
    let mut total = 0.0;
    let mut delays: Vec<usize> = Vec::new();

    for (index, slot) in timetable.timeslots.iter().enumerate() {
        for job in jobs {
            let Some(reservation) = slot.get_reservation(&JobId::new(job.id.as_str())) else {
                continue;
            };

            let draws = job.power_draws.get(reservation.node.as_str()).ok_or_else(|| {
                Error::ConfigurationError(format!("Job {} has no power draws for node {}.", job.id, reservation.node))
            })?;

            let counter = read_counters.entry(job.id.as_str()).or_insert(0);
            let watts = draws.get(*counter).or(draws.last()).copied().unwrap_or(0.0);
            *counter += 1;

            let gci = match observed {
                Some(values) => *values.get(&slot.start).ok_or(Error::InsufficientHistory { at: slot.start })?,
                None => slot.gci,
            };

            let hours = (reservation.end - reservation.start).num_seconds() as f64 / 3600.0;
            total += gci * (watts / 1000.0) * pue * hours;
            delays.push(index);
        }
    }

    let delay = if delays.is_empty() { None } else { Some(delays.iter().sum::<usize>() as f64 / delays.len() as f64) };

    Ok(RoundOutcome { footprint: (total * 100.0).round() / 100.0, delay })
}
