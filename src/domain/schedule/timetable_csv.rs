use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use crate::domain::schedule::timeslot::{Reservation, Timeslot};
use crate::domain::schedule::timetable::Timetable;
use crate::domain::utils::id::ReservationId;
use crate::error::{Error, Result};

/// One CSV row per timeslot. Reservations are stored as a JSON object keyed by reservation id.
#[derive(Debug, Serialize, Deserialize)]
struct TimeslotRecord {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    gci: f64,
    reservations: String,
}

impl TryFrom<&Timeslot> for TimeslotRecord {
    type Error = Error;

    fn try_from(slot: &Timeslot) -> Result<Self> {
        Ok(TimeslotRecord { start: slot.start, end: slot.end, gci: slot.gci, reservations: serde_json::to_string(&slot.reservations)? })
    }
}

impl TryFrom<TimeslotRecord> for Timeslot {
    type Error = Error;

    fn try_from(record: TimeslotRecord) -> Result<Self> {
        if record.end <= record.start {
            return Err(Error::MalformedRecord(format!("Timeslot ends at {} before it starts at {}.", record.end, record.start)));
        }

        let reservations: BTreeMap<ReservationId, Reservation> = serde_json::from_str(&record.reservations)?;
        Ok(Timeslot { start: record.start, end: record.end, gci: record.gci, reservations })
    }
}

impl Timetable {
    /// Reads a timetable from CSV data with the header `start,end,gci,reservations`.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Timetable> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut timetable = Timetable::new();

        for record in csv_reader.deserialize::<TimeslotRecord>() {
            let slot = Timeslot::try_from(record?)?;
            let (start, end) = (slot.start, timetable.end());

            if !timetable.append(slot) {
                return Err(Error::NonContiguousTimeslot { start, end: end.unwrap_or(start) });
            }
        }

        Ok(timetable)
    }

    pub fn to_csv_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for slot in &self.timeslots {
            csv_writer.serialize(TimeslotRecord::try_from(slot)?)?;
        }

        // An empty timetable still gets its header.
        if self.timeslots.is_empty() {
            csv_writer.write_record(["start", "end", "gci", "reservations"])?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Loads the persisted timetable. A missing file yields an empty timetable.
    pub fn read_csv(path: &Path) -> Result<Timetable> {
        if !path.exists() {
            log::info!("No persisted timetable at '{}', starting with an empty one.", path.display());
            return Ok(Timetable::new());
        }

        let timetable = Timetable::from_csv_reader(fs::File::open(path)?)?;
        log::debug!("Loaded {} timeslots from '{}'.", timetable.len(), path.display());

        Ok(timetable)
    }

    /// Persists the timetable. The data is written to a temporary sibling file first and then
    /// renamed, so readers never observe a partially written timetable.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("csv.tmp");
        {
            let file = fs::File::create(&tmp_path)?;
            self.to_csv_writer(file)?;
        }
        fs::rename(&tmp_path, path)?;

        log::debug!("Persisted {} timeslots to '{}'.", self.len(), path.display());
        Ok(())
    }
}
