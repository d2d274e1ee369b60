use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::domain::schedule::timetable::Timetable;
use crate::domain::scheduler::scheduler::{JobRequest, Scheduler};
use crate::domain::scheduler::timetable_loader::TimetableLoader;
use crate::domain::scheduler::timetable_message::TimetableMessage;
use crate::domain::strategy::planning_strategy::Allocation;
use crate::domain::utils::id::JobId;
use crate::error::{Error, Result};

const CHANNEL_CAPACITY: usize = 64;

/// Owns one schedule file. Every mutation of the timetable goes through this task, so
/// concurrent submissions are serialized.
#[derive(Debug)]
pub struct TimetableActor {
    loader: TimetableLoader,
    scheduler: Scheduler,
    write_retries: u32,
}

/// Cloneable sender side of a running [`TimetableActor`].
#[derive(Debug, Clone)]
pub struct TimetableHandle {
    tx: mpsc::Sender<TimetableMessage>,
}

impl TimetableActor {
    pub fn new(loader: TimetableLoader, scheduler: Scheduler, write_retries: u32) -> Self {
        TimetableActor { loader, scheduler, write_retries }
    }

    pub fn spawn(self) -> (TimetableHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel::<TimetableMessage>(CHANNEL_CAPACITY);

        let join_handle = tokio::spawn(async move {
            tracing::info!(schedule = %self.loader.schedule_path.display(), "Timetable actor started.");
            self.run_actor_loop(rx).await;
        });

        (TimetableHandle { tx }, join_handle)
    }

    async fn run_actor_loop(self, mut rx: mpsc::Receiver<TimetableMessage>) {
        while let Some(msg) = rx.recv().await {
            match msg {
                TimetableMessage::Schedule { request, now, reply_to } => {
                    let _ = reply_to.send(self.schedule(&request, now).await);
                }
                TimetableMessage::Remove { job_id, now, reply_to } => {
                    let _ = reply_to.send(self.remove(&job_id, now).await);
                }
                TimetableMessage::Snapshot { now, reply_to } => {
                    let _ = reply_to.send(self.loader.load(now).await);
                }
                TimetableMessage::Shutdown => break,
            }
        }

        tracing::info!("Timetable actor stopped.");
    }

    async fn schedule(&self, request: &JobRequest, now: DateTime<Utc>) -> Result<Allocation> {
        let mut timetable = self.loader.load(now).await?;
        let allocation = self.scheduler.schedule_request(request, &mut timetable)?;

        self.loader.persist(&timetable, self.write_retries).await?;
        tracing::info!(job = %request.job_id, node = %allocation.node, start = %allocation.start, "Job scheduled.");

        Ok(allocation)
    }

    async fn remove(&self, job_id: &JobId, now: DateTime<Utc>) -> Result<usize> {
        let mut timetable = Timetable::read_csv(&self.loader.schedule_path)?;
        timetable.truncate_history(TimetableLoader::cutoff(now));

        let removed = timetable.remove_job(job_id);
        if removed > 0 {
            self.loader.persist(&timetable, self.write_retries).await?;
        }

        Ok(removed)
    }
}

impl TimetableHandle {
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<Result<T>>) -> TimetableMessage) -> Result<T> {
        let (reply_to, reply) = oneshot::channel();

        self.tx.send(build(reply_to)).await.map_err(|e| Error::ChannelClosed(e.to_string()))?;
        reply.await.map_err(|e| Error::ChannelClosed(e.to_string()))?
    }

    pub async fn schedule(&self, request: JobRequest, now: DateTime<Utc>) -> Result<Allocation> {
        self.request(|reply_to| TimetableMessage::Schedule { request, now, reply_to }).await
    }

    pub async fn remove(&self, job_id: JobId, now: DateTime<Utc>) -> Result<usize> {
        self.request(|reply_to| TimetableMessage::Remove { job_id, now, reply_to }).await
    }

    pub async fn snapshot(&self, now: DateTime<Utc>) -> Result<Timetable> {
        self.request(|reply_to| TimetableMessage::Snapshot { now, reply_to }).await
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(TimetableMessage::Shutdown).await;
    }
}
