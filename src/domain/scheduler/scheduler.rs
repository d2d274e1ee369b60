use serde::{Deserialize, Serialize};

use crate::domain::cluster::topology::ClusterTopology;
use crate::domain::schedule::timetable::Timetable;
use crate::domain::strategy::planning_strategy::{Allocation, PlanningStrategy};
use crate::domain::utils::id::{JobId, PartitionName};
use crate::error::{Result, SchedulingError};

/// Job as submitted by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub job_id: JobId,
    pub hours: usize,
    pub partitions: Vec<PartitionName>,
    #[serde(default)]
    pub gpu_count: Option<u32>,
    #[serde(default)]
    pub gpu_type: Option<String>,
}

impl JobRequest {
    /// Request with a freshly generated job id.
    pub fn new(hours: usize, partitions: Vec<PartitionName>) -> Self {
        JobRequest { job_id: JobId::generate(), hours, partitions, gpu_count: None, gpu_type: None }
    }

    pub fn with_gpus(mut self, gpu_count: Option<u32>, gpu_type: Option<String>) -> Self {
        self.gpu_count = gpu_count;
        self.gpu_type = gpu_type;
        self
    }
}

/// Entry point of a scheduling decision: validates the request, resolves the candidate nodes and
/// lets the configured strategy commit a window.
#[derive(Debug, Clone)]
pub struct Scheduler {
    pub strategy: PlanningStrategy,
    pub topology: ClusterTopology,
}

impl Scheduler {
    pub fn new(strategy: PlanningStrategy, topology: ClusterTopology) -> Self {
        Scheduler { strategy, topology }
    }

    /// Schedules a job of `hours` hours on one node of `partitions`.
    ///
    /// # Errors
    /// * `InvalidRequest` for zero hours.
    /// * `JobTooLong` if the job does not fit into the timetable horizon.
    /// * `NoSuitableNode` if no node satisfies the partition and GPU constraints.
    /// * `NoWindowAllocated` if every window is taken on all candidate nodes.
    ///
    /// On success `timetable` holds the reservations of the job; on error it is unchanged.
    pub fn schedule(
        &self,
        job_id: &JobId,
        hours: usize,
        timetable: &mut Timetable,
        partitions: &[PartitionName],
        gpu_count: Option<u32>,
        gpu_type: Option<&str>,
    ) -> Result<Allocation> {
        if hours == 0 {
            return Err(SchedulingError::InvalidRequest(format!("Job {} requests zero hours.", job_id)).into());
        }
        if hours > timetable.len() {
            return Err(SchedulingError::JobTooLong { hours, horizon: timetable.len() }.into());
        }

        let nodes = self.topology.resolve_nodes(partitions, gpu_count, gpu_type);
        if nodes.is_empty() {
            return Err(SchedulingError::NoSuitableNode { partitions: partitions.iter().map(|partition| partition.to_string()).collect() }.into());
        }

        let uses_gpu = gpu_count.is_some_and(|count| count > 0);

        self.strategy.allocate(job_id, hours, timetable, &nodes, uses_gpu).ok_or_else(|| SchedulingError::NoWindowAllocated { hours }.into())
    }

    pub fn schedule_request(&self, request: &JobRequest, timetable: &mut Timetable) -> Result<Allocation> {
        self.schedule(&request.job_id, request.hours, timetable, &request.partitions, request.gpu_count, request.gpu_type.as_deref())
    }
}
