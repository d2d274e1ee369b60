use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use squirrel::api::config_dto::SquirrelConfigDto;
use squirrel::api::scenario_dto::ScenarioDto;
use squirrel::domain::cluster::batch_system_trait::{BatchSystem, SubmitRequest};
use squirrel::domain::cluster::slurm::slurm_cli::SlurmCli;
use squirrel::domain::forecast::forecast_service::{forecast_at, forecast_range_to_store, forecast_to_store};
use squirrel::domain::forecast::forecaster::floor_hour;
use squirrel::domain::gci_store::electricity_maps::ingest_history_file;
use squirrel::domain::gci_store::gci_store_trait::{GciStore, zone_tags};
use squirrel::domain::gci_store::influxdb::InfluxDbStore;
use squirrel::domain::scheduler::scheduler::{JobRequest, Scheduler};
use squirrel::domain::scheduler::timetable_actor::TimetableActor;
use squirrel::domain::scheduler::timetable_loader::{TimetableLoader, begin_offset};
use squirrel::domain::simulation::simulation::{Simulation, write_results};
use squirrel::domain::strategy::planning_strategy::PlanningStrategy;
use squirrel::domain::utils::id::PartitionName;
use squirrel::loader::parser::{config_path, load_config, parse_json_file};
use squirrel::{load_topology, logger};

#[derive(Debug, Parser)]
#[command(name = "squirrel", version, about = "Carbon-aware job scheduling for Slurm clusters")]
struct Cli {
    /// Configuration file (defaults to $SQUIRREL_CONFIG or ./squirrel.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Schedule a job carbon-aware and submit it with sbatch.
    Submit(SubmitArgs),

    /// Schedule a job as if it was submitted at the given date, without calling sbatch.
    SimulateSubmit {
        #[command(flatten)]
        job: SubmitArgs,

        /// Submission date (ISO 8601), defaults to now.
        #[arg(long)]
        submit_date: Option<DateTime<Utc>>,
    },

    #[command(subcommand)]
    Forecast(ForecastCommand),

    #[command(subcommand)]
    Electricitymaps(ElectricityMapsCommand),

    /// Compare two planning strategies as described in a scenario file.
    Simulate { scenario: PathBuf },
}

#[derive(Debug, clap::Args)]
struct SubmitArgs {
    /// Batch script or command passed to sbatch.
    command: String,

    /// Runtime in hours.
    runtime: usize,

    /// Comma separated list of partitions.
    #[arg(long, value_delimiter = ',', default_value = "jinx")]
    partition: Vec<String>,

    /// Number of GPUs per node.
    #[arg(long)]
    gpus: Option<u32>,

    /// GPU model, e.g. a100.
    #[arg(long)]
    gpu_name: Option<String>,
}

#[derive(Debug, Subcommand)]
enum ForecastCommand {
    /// Print the forecast for now.
    Demo { forecast_days: u32, lookback_days: u32 },

    /// Forecast from now as configured and write the result to the forecast series.
    ToStore,

    /// One daily forecast per day of a date range, written to the forecast series.
    RangeToStore {
        start: DateTime<Utc>,
        amount_days: u32,
        zone: String,
        #[arg(long)]
        forecast_days: Option<u32>,
        #[arg(long)]
        lookback_days: Option<u32>,
    },
}

#[derive(Debug, Subcommand)]
enum ElectricityMapsCommand {
    /// Write an Electricity Maps history export (one zone per file) into the history series.
    IngestHistory { csv: PathBuf },
}

fn history_store(config: &SquirrelConfigDto) -> anyhow::Result<Arc<dyn GciStore>> {
    Ok(Arc::new(InfluxDbStore::new(&config.influxdb, config.influxdb.history.clone())?))
}

fn forecast_store(config: &SquirrelConfigDto) -> anyhow::Result<Arc<dyn GciStore>> {
    Ok(Arc::new(InfluxDbStore::new(&config.influxdb, config.influxdb.forecast.clone())?))
}

async fn submit(config: &SquirrelConfigDto, args: SubmitArgs, submit_date: Option<DateTime<Utc>>, dry_run: bool) -> anyhow::Result<()> {
    let slurm = SlurmCli::new(config.local.sinfo_json.clone());
    let topology = load_topology(config, &slurm).await.context("Failed to load cluster topology")?;
    let strategy = PlanningStrategy::from_dto(&config.scheduler)?;

    let (handle, actor) = TimetableActor::new(TimetableLoader::from_config(config)?, Scheduler::new(strategy, topology), config.scheduler.write_retries).spawn();

    let now = submit_date.unwrap_or_else(Utc::now);
    let partitions = args.partition.iter().map(PartitionName::new).collect();
    let request = JobRequest::new(args.runtime, partitions).with_gpus(args.gpus, args.gpu_name.clone());
    let job_id = request.job_id.clone();

    let allocation = handle.schedule(request, now).await?;
    let offset = begin_offset(allocation.start, now);
    println!("{} job on node {} in {} seconds.", "Scheduled".green().bold(), allocation.node.to_string().cyan(), offset.num_seconds());

    if !dry_run {
        let request = SubmitRequest { command: args.command.trim().to_string(), runtime_hours: args.runtime, begin_offset: offset, node: allocation.node, exclusive: true };

        match slurm.submit(&request).await {
            Ok(answer) => println!("{}", answer.trim()),
            Err(e) => {
                log::error!("sbatch rejected job {}, releasing its reservations.", job_id);
                handle.remove(job_id, now).await?;
                handle.shutdown().await;
                return Err(e.into());
            }
        }
    }

    handle.shutdown().await;
    actor.await?;
    Ok(())
}

async fn forecast(config: &SquirrelConfigDto, command: ForecastCommand) -> anyhow::Result<()> {
    let history = history_store(config)?;

    match command {
        ForecastCommand::Demo { forecast_days, lookback_days } => {
            let now = floor_hour(Utc::now());
            let points = forecast_at(history.as_ref(), &zone_tags(&config.forecast.zone), now, forecast_days, lookback_days).await?;
            for point in points {
                println!("{}  {:>8.2}", point.time.to_rfc3339().dimmed(), point.gci);
            }
        }
        ForecastCommand::ToStore => {
            let now = floor_hour(Utc::now());
            let written = forecast_to_store(
                history.as_ref(),
                forecast_store(config)?.as_ref(),
                &zone_tags(&config.forecast.zone),
                now,
                config.forecast.forecast_days,
                config.forecast.lookback_days,
            )
            .await?;
            println!("{} {} forecast points.", "Wrote".green(), written);
        }
        ForecastCommand::RangeToStore { start, amount_days, zone, forecast_days, lookback_days } => {
            let written = forecast_range_to_store(
                history.as_ref(),
                forecast_store(config)?.as_ref(),
                &zone_tags(&zone),
                start,
                amount_days,
                forecast_days.unwrap_or(config.forecast.forecast_days),
                lookback_days.unwrap_or(config.forecast.lookback_days),
            )
            .await?;
            println!("{} {} forecast points for zone {}.", "Wrote".green(), written, zone);
        }
    }

    Ok(())
}

async fn electricity_maps(config: &SquirrelConfigDto, command: ElectricityMapsCommand) -> anyhow::Result<()> {
    match command {
        ElectricityMapsCommand::IngestHistory { csv } => {
            let (zone, written) = ingest_history_file(&csv, history_store(config)?.as_ref()).await.with_context(|| format!("Failed to ingest '{}'", csv.display()))?;
            println!("{} {} history points for zone {}.", "Wrote".green(), written, zone);
        }
    }

    Ok(())
}

async fn simulate(config: &SquirrelConfigDto, scenario_path: PathBuf) -> anyhow::Result<()> {
    let scenario: ScenarioDto = parse_json_file(&scenario_path).with_context(|| format!("Failed to read scenario '{}'", scenario_path.display()))?;
    let topology = load_topology(config, &SlurmCli::new(config.local.sinfo_json.clone())).await?;

    let simulation = Simulation::new(scenario, topology, history_store(config)?, forecast_store(config)?);
    let results = simulation.run().await?;
    let path = write_results(&results, &config.local.results_dir)?;

    println!("{} results written to {}.", "Simulation finished:".green().bold(), path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init();

    let cli = Cli::parse();
    let path = config_path(cli.config.as_deref());
    let config = load_config(&path)?;

    match cli.command {
        Command::Submit(args) => submit(&config, args, None, false).await,
        Command::SimulateSubmit { job, submit_date } => submit(&config, job, submit_date, true).await,
        Command::Forecast(command) => forecast(&config, command).await,
        Command::Electricitymaps(command) => electricity_maps(&config, command).await,
        Command::Simulate { scenario } => simulate(&config, scenario).await,
    }
}
