use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::domain::gci_store::gci_store_trait::{GciPoint, GciStore, zone_tags};
use crate::error::{Error, Result};

/// Row of an Electricity Maps history export. Columns not listed here are ignored.
#[derive(Debug, Deserialize)]
struct HistoryRecord {
    #[serde(rename = "Zone Id")]
    zone: String,
    #[serde(rename = "Carbon Intensity gCO₂eq/kWh (LCA)")]
    gci: Option<f64>,
    #[serde(rename = "Datetime (UTC)")]
    time: String,
}

/// Accepts RFC 3339 timestamps as well as naive ones like `2023-08-01 00:00:00`, which are read as UTC.
fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Ok(time.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::MalformedRecord(format!("Unreadable datetime '{}' in Electricity Maps export.", value)))
}

/// Parses an Electricity Maps history export. The export must cover exactly one zone.
///
/// Rows without a carbon intensity value are skipped.
pub fn parse_history_csv<R: Read>(reader: R) -> Result<(String, Vec<GciPoint>)> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut zone: Option<String> = None;
    let mut points = Vec::new();

    for record in csv_reader.deserialize::<HistoryRecord>() {
        let record = record?;

        match &zone {
            None => zone = Some(record.zone.clone()),
            Some(known) if *known != record.zone => {
                return Err(Error::MalformedRecord(format!("Electricity Maps export contains more than one zone ({} and {}).", known, record.zone)));
            }
            Some(_) => {}
        }

        let time = parse_time(&record.time)?;
        match record.gci {
            Some(gci) => points.push(GciPoint::new(time, gci)),
            None => log::warn!("No carbon intensity for zone {} at {}, skipping row.", record.zone, time),
        }
    }

    let zone = zone.ok_or_else(|| Error::MalformedRecord("Electricity Maps export contains no rows.".to_string()))?;
    Ok((zone, points))
}

/// Writes the export read from `reader` into `store`, tagged with its zone.
/// Returns the zone and the number of points written.
pub async fn ingest_history<R: Read>(reader: R, store: &dyn GciStore) -> Result<(String, usize)> {
    let (zone, points) = parse_history_csv(reader)?;

    store.write(&points, &zone_tags(&zone)).await?;
    log::info!("Ingested {} Electricity Maps history points for zone {}.", points.len(), zone);

    Ok((zone, points.len()))
}

pub async fn ingest_history_file(path: &Path, store: &dyn GciStore) -> Result<(String, usize)> {
    ingest_history(File::open(path)?, store).await
}
