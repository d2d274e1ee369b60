use async_trait::async_trait;
use chrono::Duration;
use std::fmt::Debug;

use crate::domain::cluster::slurm::sinfo_response::SinfoResponse;
use crate::domain::utils::id::NodeName;
use crate::error::Result;

/// Job submission pinned to the node and start time the scheduler decided on.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    /// Batch script or command passed to the batch system.
    pub command: String,
    pub runtime_hours: usize,

    /// Delay between submission and the reserved start of the job.
    pub begin_offset: Duration,
    pub node: NodeName,
    pub exclusive: bool,
}

#[async_trait]
pub trait BatchSystem: Send + Sync + Debug {
    /// Submits the job. Returns the raw answer of the batch system.
    async fn submit(&self, request: &SubmitRequest) -> Result<String>;

    async fn list_nodes(&self) -> Result<SinfoResponse>;
}
