use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::domain::schedule::timetable::Timetable;
use crate::domain::scheduler::scheduler::JobRequest;
use crate::domain::strategy::planning_strategy::Allocation;
use crate::domain::utils::id::JobId;
use crate::error::Result;

/// Requests handled by the task owning a schedule file.
#[derive(Debug)]
pub enum TimetableMessage {
    Schedule {
        request: JobRequest,
        now: DateTime<Utc>,
        reply_to: oneshot::Sender<Result<Allocation>>,
    },

    /// Drops every reservation of a job, e.g. after the batch system rejected it.
    Remove {
        job_id: JobId,
        now: DateTime<Utc>,
        reply_to: oneshot::Sender<Result<usize>>,
    },

    Snapshot {
        now: DateTime<Utc>,
        reply_to: oneshot::Sender<Result<Timetable>>,
    },

    Shutdown,
}
