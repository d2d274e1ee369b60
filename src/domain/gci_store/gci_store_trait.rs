use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;

/// One observed or forecast grid carbon intensity value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GciPoint {
    pub time: DateTime<Utc>,
    pub gci: f64,
}

impl GciPoint {
    pub fn new(time: DateTime<Utc>, gci: f64) -> Self {
        GciPoint { time, gci }
    }
}

/// Tags selecting one series in the store. Contains at least a `zone` entry.
pub type SeriesTags = BTreeMap<String, String>;

pub const ZONE_TAG: &str = "zone";

pub fn zone_tags(zone: &str) -> SeriesTags {
    let mut tags = SeriesTags::new();
    tags.insert(ZONE_TAG.to_string(), zone.to_string());
    tags
}

/// Abstract contract of the time-series store holding GCI history and forecasts.
#[async_trait]
pub trait GciStore: Send + Sync + std::fmt::Debug {
    /// Returns the points of the series selected by `tags` with `start <= time < stop`,
    /// ordered by time.
    async fn get_history(&self, start: DateTime<Utc>, stop: DateTime<Utc>, tags: &SeriesTags) -> Result<Vec<GciPoint>>;

    /// Writes `series` into the series selected by `tags`, replacing points with equal timestamps.
    async fn write(&self, series: &[GciPoint], tags: &SeriesTags) -> Result<()>;
}
