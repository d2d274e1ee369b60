use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::domain::gci_store::gci_store_trait::{GciPoint, GciStore, SeriesTags};
use crate::error::Result;

/// Store backed by process memory. Used by the simulation and by tests.
#[derive(Debug, Default)]
pub struct InMemoryGciStore {
    series: RwLock<HashMap<SeriesTags, BTreeMap<DateTime<Utc>, f64>>>,
}

impl InMemoryGciStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_series(series: &[GciPoint], tags: &SeriesTags) -> Result<Self> {
        let store = Self::new();
        store.write(series, tags).await?;
        Ok(store)
    }
}

#[async_trait]
impl GciStore for InMemoryGciStore {
    async fn get_history(&self, start: DateTime<Utc>, stop: DateTime<Utc>, tags: &SeriesTags) -> Result<Vec<GciPoint>> {
        let guard = self.series.read().await;

        let points = match guard.get(tags) {
            Some(series) if start < stop => series.range(start..stop).map(|(time, gci)| GciPoint::new(*time, *gci)).collect(),
            _ => Vec::new(),
        };

        Ok(points)
    }

    async fn write(&self, series: &[GciPoint], tags: &SeriesTags) -> Result<()> {
        let mut guard = self.series.write().await;
        let entry = guard.entry(tags.clone()).or_default();

        for point in series {
            entry.insert(point.time, point.gci);
        }

        Ok(())
    }
}
