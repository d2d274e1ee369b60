use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::time::Duration;

use crate::api::config_dto::{InfluxDbDto, SeriesDto};
use crate::domain::gci_store::gci_store_trait::{GciPoint, GciStore, SeriesTags};
use crate::error::{Error, Result};

/// Store talking to the InfluxDB v2 HTTP API. One instance addresses one configured series
/// (bucket, measurement, field); per-call tags are merged over the configured ones.
#[derive(Debug, Clone)]
pub struct InfluxDbStore {
    client: reqwest::Client,
    url: String,
    org: String,
    series: SeriesDto,
}

impl InfluxDbStore {
    pub fn new(dto: &InfluxDbDto, series: SeriesDto) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let token = HeaderValue::from_str(&format!("Token {}", dto.token))
            .map_err(|e| Error::ConfigurationError(format!("InfluxDB token is not a valid header value: {}", e)))?;
        headers.insert(AUTHORIZATION, token);

        let client = reqwest::Client::builder().default_headers(headers).timeout(Duration::from_secs(dto.timeout_secs)).build()?;

        Ok(InfluxDbStore { client, url: dto.url.trim_end_matches('/').to_string(), org: dto.org.clone(), series })
    }

    fn merged_tags(&self, tags: &SeriesTags) -> SeriesTags {
        let mut merged = self.series.tags.clone();
        merged.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    pub fn build_query(&self, start: DateTime<Utc>, stop: DateTime<Utc>, tags: &SeriesTags) -> String {
        let mut query = format!(
            "from(bucket: \"{}\")\n  |> range(start: {}, stop: {})\n  |> filter(fn: (r) => r[\"_measurement\"] == \"{}\")\n  |> filter(fn: (r) => r[\"_field\"] == \"{}\")\n",
            self.series.bucket,
            start.to_rfc3339_opts(SecondsFormat::Secs, true),
            stop.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.series.measurement,
            self.series.field,
        );

        for (tag, value) in self.merged_tags(tags) {
            query.push_str(&format!("  |> filter(fn: (r) => r[\"{}\"] == \"{}\")\n", tag, value));
        }

        query.push_str("  |> keep(columns: [\"_time\", \"_value\"])\n  |> sort(columns: [\"_time\"])\n");
        query
    }

    pub fn build_line_protocol(&self, series: &[GciPoint], tags: &SeriesTags) -> String {
        let tag_set: String = self
            .merged_tags(tags)
            .iter()
            .map(|(key, value)| format!(",{}={}", escape_line_protocol(key), escape_line_protocol(value)))
            .collect();

        series
            .iter()
            .map(|point| {
                format!(
                    "{}{} {}={} {}",
                    escape_line_protocol(&self.series.measurement),
                    tag_set,
                    escape_line_protocol(&self.series.field),
                    point.gci,
                    point.time.timestamp()
                )
            })
            .collect::<Vec<String>>()
            .join("\n")
    }
}

#[async_trait]
impl GciStore for InfluxDbStore {
    async fn get_history(&self, start: DateTime<Utc>, stop: DateTime<Utc>, tags: &SeriesTags) -> Result<Vec<GciPoint>> {
        let query = self.build_query(start, stop, tags);
        log::debug!("Querying InfluxDB bucket {} for [{}, {}).", self.series.bucket, start, stop);

        let response = self
            .client
            .post(format!("{}/api/v2/query", self.url))
            .query(&[("org", self.org.as_str())])
            .header(ACCEPT, "application/csv")
            .header(CONTENT_TYPE, "application/vnd.flux")
            .body(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::StoreResponseError { status: status.as_u16(), body });
        }

        parse_query_csv(&body)
    }

    async fn write(&self, series: &[GciPoint], tags: &SeriesTags) -> Result<()> {
        if series.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(format!("{}/api/v2/write", self.url))
            .query(&[("org", self.org.as_str()), ("bucket", self.series.bucket.as_str()), ("precision", "s")])
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(self.build_line_protocol(series, tags))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(Error::StoreResponseError { status: status.as_u16(), body });
        }

        log::info!("Wrote {} points to InfluxDB bucket {}.", series.len(), self.series.bucket);
        Ok(())
    }
}

/// Parses the CSV answer of the query endpoint. Every table repeats its header row, tables are
/// separated by empty lines and annotation rows start with `#`.
pub fn parse_query_csv(body: &str) -> Result<Vec<GciPoint>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(body.as_bytes());

    let mut columns: Option<(usize, usize)> = None;
    let mut points = Vec::new();

    for record in reader.records() {
        let record = record?;

        if record.iter().all(|field| field.trim().is_empty()) || record.get(0).is_some_and(|field| field.starts_with('#')) {
            continue;
        }

        let time_column = record.iter().position(|field| field == "_time");
        let value_column = record.iter().position(|field| field == "_value");
        if let (Some(time), Some(value)) = (time_column, value_column) {
            columns = Some((time, value));
            continue;
        }

        let Some((time_column, value_column)) = columns else {
            return Err(Error::MalformedRecord("InfluxDB answer has no header with _time and _value columns.".to_string()));
        };

        let time = record.get(time_column).unwrap_or_default();
        let value = record.get(value_column).unwrap_or_default();

        let time = DateTime::parse_from_rfc3339(time)
            .map_err(|e| Error::MalformedRecord(format!("Invalid timestamp '{}': {}", time, e)))?
            .with_timezone(&Utc);
        let gci = value.parse::<f64>().map_err(|e| Error::MalformedRecord(format!("Invalid GCI value '{}': {}", value, e)))?;

        points.push(GciPoint::new(time, gci));
    }

    points.sort_by_key(|point| point.time);
    points.dedup_by_key(|point| point.time);

    Ok(points)
}

fn escape_line_protocol(value: &str) -> String {
    value.replace('\\', "\\\\").replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}
