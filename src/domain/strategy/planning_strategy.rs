use chrono::{DateTime, Utc};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::api::config_dto::SchedulerDto;
use crate::domain::cluster::node_info::NodeInfo;
use crate::domain::schedule::timetable::Timetable;
use crate::domain::schedule::window_transaction::reserve_window;
use crate::domain::strategy::{fifo, spatial, spatial_greedy, spatiotemporal, temporal};
use crate::domain::utils::id::{JobId, NodeName};
use crate::error::ConversionError;

pub const DEFAULT_BALANCE_GRADE: f64 = 10.0;
pub const DEFAULT_SWITCH_THRESHOLD: f64 = 0.25;

/// Window and node a job was committed to.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// Slot indices of the reserved window.
    pub window: Range<usize>,
    pub node: NodeName,

    /// Start of the first reserved timeslot.
    pub start: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanningStrategy {
    CarbonAgnosticFifo,
    TemporalShifting,
    SpatialGreedyShifting,
    SpatialShifting { balance_grade: f64 },
    SpatiotemporalShifting { switch_threshold: f64 },
}

impl FromStr for PlanningStrategy {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CarbonAgnosticFifo" => Ok(PlanningStrategy::CarbonAgnosticFifo),
            "TemporalShifting" => Ok(PlanningStrategy::TemporalShifting),
            "SpatialGreedyShifting" => Ok(PlanningStrategy::SpatialGreedyShifting),
            "SpatialShifting" => Ok(PlanningStrategy::SpatialShifting { balance_grade: DEFAULT_BALANCE_GRADE }),
            "SpatiotemporalShifting" => Ok(PlanningStrategy::SpatiotemporalShifting { switch_threshold: DEFAULT_SWITCH_THRESHOLD }),
            _ => Err(ConversionError::UnknownPlanningStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for PlanningStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlanningStrategy::CarbonAgnosticFifo => "CarbonAgnosticFifo",
            PlanningStrategy::TemporalShifting => "TemporalShifting",
            PlanningStrategy::SpatialGreedyShifting => "SpatialGreedyShifting",
            PlanningStrategy::SpatialShifting { .. } => "SpatialShifting",
            PlanningStrategy::SpatiotemporalShifting { .. } => "SpatiotemporalShifting",
        };
        write!(f, "{}", name)
    }
}

impl PlanningStrategy {
    /// Strategy named in the scheduler section of the configuration, with its tuning values.
    pub fn from_dto(dto: &SchedulerDto) -> Result<Self, ConversionError> {
        let strategy = match dto.strategy.parse::<PlanningStrategy>()? {
            PlanningStrategy::SpatialShifting { .. } => PlanningStrategy::SpatialShifting { balance_grade: dto.balance_grade },
            PlanningStrategy::SpatiotemporalShifting { .. } => PlanningStrategy::SpatiotemporalShifting { switch_threshold: dto.switch_threshold },
            other => other,
        };

        Ok(strategy)
    }

    /// Reserves one of `nodes` for `hours` consecutive timeslots of `timetable`.
    ///
    /// `nodes` is expected in resolver order (weight, then name). On `None` the timetable holds
    /// no reservation of `job_id` that was not there before.
    pub fn allocate(&self, job_id: &JobId, hours: usize, timetable: &mut Timetable, nodes: &[NodeInfo], uses_gpu: bool) -> Option<Allocation> {
        if hours == 0 || hours > timetable.len() || nodes.is_empty() {
            return None;
        }

        let allocation = match self {
            PlanningStrategy::CarbonAgnosticFifo => fifo::allocate(job_id, hours, timetable, nodes),
            PlanningStrategy::TemporalShifting => temporal::allocate(job_id, hours, timetable, nodes),
            PlanningStrategy::SpatialGreedyShifting => spatial_greedy::allocate(job_id, hours, timetable, nodes, uses_gpu),
            PlanningStrategy::SpatialShifting { balance_grade } => spatial::allocate(job_id, hours, timetable, nodes, uses_gpu, *balance_grade),
            PlanningStrategy::SpatiotemporalShifting { switch_threshold } => spatiotemporal::allocate(job_id, hours, timetable, nodes, uses_gpu, *switch_threshold),
        };

        match &allocation {
            Some(allocation) => log::info!("{}: job {} -> node {} at {} (slots {:?}).", self, job_id, allocation.node, allocation.start, allocation.window),
            None => log::warn!("{}: no window of {}h available for job {}.", self, hours, job_id),
        }

        allocation
    }
}

/// Tries `candidates` in order on `window` and commits the first node the whole window accepts.
pub(crate) fn try_window<'a>(
    timetable: &mut Timetable,
    window: &Range<usize>,
    job_id: &JobId,
    candidates: impl IntoIterator<Item = &'a NodeName>,
) -> Option<Allocation> {
    for node in candidates {
        if reserve_window(timetable, window.clone(), job_id, node) {
            let start = timetable.timeslots[window.start].start;
            return Some(Allocation { window: window.clone(), node: node.clone(), start });
        }
    }

    None
}

/// Windows of `hours` slots ranked by their summed carbon intensity. The sort is stable, so
/// equally weighted windows stay in chronological order.
pub(crate) fn carbon_ranked_windows(timetable: &Timetable, hours: usize) -> Vec<Range<usize>> {
    let mut windows: Vec<(f64, Range<usize>)> = timetable.windows(hours).into_iter().map(|window| (timetable.window_weight(&window), window)).collect();
    windows.sort_by(|a, b| a.0.total_cmp(&b.0));

    windows.into_iter().map(|(_, window)| window).collect()
}
