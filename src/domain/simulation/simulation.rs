use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::api::scenario_dto::{ScenarioDto, StrategyRunDto};
use crate::domain::cluster::topology::ClusterTopology;
use crate::domain::forecast::forecaster::fill_hourly_gaps;
use crate::domain::gci_store::gci_store_trait::{GciPoint, GciStore, zone_tags};
use crate::domain::schedule::timetable::Timetable;
use crate::domain::scheduler::scheduler::Scheduler;
use crate::domain::simulation::footprint::{RoundOutcome, footprint};
use crate::domain::strategy::planning_strategy::PlanningStrategy;
use crate::domain::utils::id::{JobId, PartitionName};
use crate::error::{ConversionError, Error, Result};

/// One row of `results.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub zone: String,
    pub submit_date: DateTime<Utc>,
    pub footprint_baseline: f64,
    pub delay_baseline: Option<f64>,
    pub footprint_benchmark: f64,
    pub delay_benchmark: Option<f64>,
}

/// Compares two strategies over hourly submission rounds, one task per zone.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub scenario: Arc<ScenarioDto>,
    pub topology: ClusterTopology,
    pub history_store: Arc<dyn GciStore>,
    pub forecast_store: Arc<dyn GciStore>,
}

impl Simulation {
    pub fn new(scenario: ScenarioDto, topology: ClusterTopology, history_store: Arc<dyn GciStore>, forecast_store: Arc<dyn GciStore>) -> Self {
        Simulation { scenario: Arc::new(scenario), topology, history_store, forecast_store }
    }

    /// Runs every zone concurrently and returns the results sorted by zone and submit date.
    pub async fn run(&self) -> Result<Vec<SimulationResult>> {
        let baseline = Arc::new(build_scheduler(&self.scenario.baseline, &self.topology)?);
        let benchmark = Arc::new(build_scheduler(&self.scenario.benchmark, &self.topology)?);

        let (tx, mut rx) = mpsc::channel::<Vec<SimulationResult>>(self.scenario.zones.len().max(1));
        let mut workers = Vec::new();

        for zone in &self.scenario.zones {
            let worker = ZoneWorker {
                zone: zone.clone(),
                scenario: self.scenario.clone(),
                baseline: baseline.clone(),
                benchmark: benchmark.clone(),
                history_store: self.history_store.clone(),
                forecast_store: self.forecast_store.clone(),
            };
            let tx = tx.clone();

            workers.push(tokio::spawn(async move {
                let rows = worker.run().await?;
                tx.send(rows).await.map_err(|e| Error::ChannelClosed(e.to_string()))
            }));
        }
        drop(tx);

        for outcome in join_all(workers).await {
            outcome.map_err(|e| Error::ChannelClosed(format!("Zone worker failed: {}", e)))??;
        }

        let mut results = Vec::new();
        while let Some(rows) = rx.recv().await {
            results.extend(rows);
        }

        results.sort_by(|a, b| a.zone.cmp(&b.zone).then(a.submit_date.cmp(&b.submit_date)));
        log::info!("Simulation finished with {} rows over {} zones.", results.len(), self.scenario.zones.len());

        Ok(results)
    }
}

fn build_scheduler(run: &StrategyRunDto, topology: &ClusterTopology) -> std::result::Result<Scheduler, ConversionError> {
    let strategy = match run.strategy.parse::<PlanningStrategy>()? {
        PlanningStrategy::SpatialShifting { .. } => PlanningStrategy::SpatialShifting { balance_grade: run.balance_grade },
        PlanningStrategy::SpatiotemporalShifting { .. } => PlanningStrategy::SpatiotemporalShifting { switch_threshold: run.switch_threshold },
        other => other,
    };

    Ok(Scheduler::new(strategy, topology.clone()))
}

#[derive(Debug)]
struct ZoneWorker {
    zone: String,
    scenario: Arc<ScenarioDto>,
    baseline: Arc<Scheduler>,
    benchmark: Arc<Scheduler>,
    history_store: Arc<dyn GciStore>,
    forecast_store: Arc<dyn GciStore>,
}

impl ZoneWorker {
    async fn run(&self) -> Result<Vec<SimulationResult>> {
        let scenario = &self.scenario;
        let lookahead = i64::from(scenario.lookahead_hours);
        let rounds = i64::from(scenario.days) * 24;
        let stop = scenario.start + Duration::hours(rounds + lookahead + 1);
        let tags = zone_tags(&self.zone);

        tracing::info!(zone = %self.zone, rounds, "Zone simulation started.");

        let observed = fill_hourly_gaps(&self.history_store.get_history(scenario.start, stop, &tags).await?);
        let planned = if scenario.forecasted { fill_hourly_gaps(&self.forecast_store.get_history(scenario.start, stop, &tags).await?) } else { observed.clone() };

        let mut rows = Vec::with_capacity(rounds as usize);

        for round in 0..rounds {
            let submit_date = scenario.start + Duration::hours(round);
            let timetable = lookahead_timetable(&planned, submit_date, lookahead)?;
            let accounting = scenario.forecasted.then_some(&observed);

            let baseline = self.schedule_round(&self.baseline, &scenario.baseline, timetable.clone(), accounting)?;
            let benchmark = self.schedule_round(&self.benchmark, &scenario.benchmark, timetable, accounting)?;

            rows.push(SimulationResult {
                zone: self.zone.clone(),
                submit_date,
                footprint_baseline: baseline.footprint,
                delay_baseline: baseline.delay,
                footprint_benchmark: benchmark.footprint,
                delay_benchmark: benchmark.delay,
            });
        }

        tracing::info!(zone = %self.zone, "Zone simulation finished.");
        Ok(rows)
    }

    fn schedule_round(
        &self,
        scheduler: &Scheduler,
        run: &StrategyRunDto,
        mut timetable: Timetable,
        observed: Option<&BTreeMap<DateTime<Utc>, f64>>,
    ) -> Result<RoundOutcome> {
        for job in &run.jobs {
            let partitions: Vec<PartitionName> = job.partitions.iter().map(PartitionName::new).collect();
            let result = scheduler.schedule(&JobId::new(job.id.as_str()), job.reserved_hours, &mut timetable, &partitions, job.num_gpus, job.gpu_name.as_deref());

            if let Err(e) = result {
                log::warn!("[{}] {}: job {} not scheduled: {}", self.zone, scheduler.strategy, job.id, e);
            }
        }

        footprint(&timetable, &run.jobs, self.scenario.pue, observed)
    }
}

/// Timetable of the hours `(submit_date, submit_date + lookahead]`.
fn lookahead_timetable(values: &BTreeMap<DateTime<Utc>, f64>, submit_date: DateTime<Utc>, lookahead: i64) -> Result<Timetable> {
    let first = submit_date + Duration::hours(1);
    let last = submit_date + Duration::hours(lookahead);

    let points: Vec<GciPoint> = values.range(first..=last).map(|(time, gci)| GciPoint::new(*time, *gci)).collect();

    let mut timetable = Timetable::new();
    timetable.append_direct(&points)?;

    if timetable.is_empty() {
        return Err(Error::InsufficientHistory { at: first });
    }

    Ok(timetable)
}

/// Writes `results` to `<results_dir>/data/results.csv`.
pub fn write_results(results: &[SimulationResult], results_dir: &Path) -> Result<PathBuf> {
    let data_dir = results_dir.join("data");
    std::fs::create_dir_all(&data_dir)?;

    let path = data_dir.join("results.csv");
    let mut writer = csv::Writer::from_path(&path)?;
    for row in results {
        writer.serialize(row)?;
    }
    writer.flush()?;

    log::info!("Wrote {} simulation results to '{}'.", results.len(), path.display());
    Ok(path)
}
