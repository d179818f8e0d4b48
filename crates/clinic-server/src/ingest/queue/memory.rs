//! Process-local job queue
//!
//! Delivery is apalis [`MemoryStorage`]: an unbounded channel whose receiver
//! is shared so the monitor can rebuild a worker. apalis keeps no status for
//! in-memory tasks, so a ledger records what the job API reports. It is
//! updated when a task is taken off the channel and again from the worker's
//! acknowledgement. Jobs do not survive a restart.

use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use apalis::layers::retry::RetryConfig;
use apalis::prelude::{
    Acknowledge, BoxDynError, Extensions, MemoryStorage, Parts, RandomId, Task, TaskBuilder, TaskId,
};
use apalis_core::backend::memory::MemorySink;
use async_trait::async_trait;
use chrono::Utc;
use futures::channel::mpsc::{self, SendError, UnboundedReceiver, UnboundedSender};
use futures::future::{ready, Ready};
use futures::{Sink, StreamExt};

use super::{check_max_attempts, JobChannel, JobSource, QueueError, QueueResult};
use crate::ingest::jobs::{
    AppointmentsFileJob, AppointmentsFilePayload, JobFailure, JobHandle, JobId, JobSnapshot,
    JobStatus, UpsertSummary,
};
use crate::ingest::worker::is_retryable;

type MemoryTask = Task<AppointmentsFileJob, Extensions, RandomId>;

/// Finished jobs kept for status lookups before the oldest are dropped
pub const DEFAULT_RETAINED_JOBS: usize = 10_000;

#[derive(Debug)]
struct Ledger {
    jobs: HashMap<JobId, JobSnapshot>,
    finished: VecDeque<JobId>,
    retain: usize,
}

impl Ledger {
    fn new(retain: usize) -> Self {
        Self {
            jobs: HashMap::new(),
            finished: VecDeque::new(),
            retain,
        }
    }

    fn start(&mut self, id: JobId) {
        if let Some(job) = self.jobs.get_mut(&id) {
            if job.status == JobStatus::Pending {
                job.status = JobStatus::Running;
            }
        }
    }

    fn record(&mut self, id: JobId, attempt: i32, result: &Result<UpsertSummary, BoxDynError>) {
        let Some(job) = self.jobs.get_mut(&id) else {
            return;
        };
        if job.status.is_terminal() {
            // Already failed through `mark_failed`
            job.attempts = attempt;
            return;
        }

        job.attempts = attempt;
        let finished = match result {
            Ok(_) => {
                job.status = JobStatus::Done;
                true
            },
            Err(e) => {
                job.last_error = Some(e.to_string());
                if attempt >= job.max_attempts || !is_retryable(e) {
                    job.status = JobStatus::Failed;
                    true
                } else {
                    false
                }
            },
        };

        if finished {
            job.finished_at = Some(Utc::now());
            self.finish(id);
        }
    }

    fn fail(&mut self, handle: &JobHandle, failure: &JobFailure) -> QueueResult<()> {
        let job = self
            .jobs
            .get_mut(&handle.id)
            .filter(|job| job.status == JobStatus::Running)
            .ok_or(QueueError::LockLost(handle.id))?;

        job.status = JobStatus::Failed;
        job.attempts = handle.attempt;
        job.last_error = Some(failure.to_string());
        job.finished_at = Some(Utc::now());
        self.finish(handle.id);
        Ok(())
    }

    fn finish(&mut self, id: JobId) {
        self.finished.push_back(id);
        while self.finished.len() > self.retain {
            if let Some(oldest) = self.finished.pop_front() {
                self.jobs.remove(&oldest);
            }
        }
    }
}

fn lock(ledger: &Mutex<Ledger>) -> MutexGuard<'_, Ledger> {
    ledger.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub struct InMemoryJobChannel {
    sender: UnboundedSender<MemoryTask>,
    receiver: Arc<futures::lock::Mutex<UnboundedReceiver<MemoryTask>>>,
    ledger: Arc<Mutex<Ledger>>,
}

impl Default for InMemoryJobChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryJobChannel {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETAINED_JOBS)
    }

    pub fn with_retention(retain: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded();
        Self {
            sender,
            receiver: Arc::new(futures::lock::Mutex::new(receiver)),
            ledger: Arc::new(Mutex::new(Ledger::new(retain))),
        }
    }

    pub fn source(self: &Arc<Self>) -> JobSource {
        JobSource::Memory(self.clone())
    }

    /// A fresh apalis storage over the shared channel.
    ///
    /// Only one storage should be polled at a time; a second one waits until
    /// the first is dropped.
    pub fn storage(&self) -> MemoryStorage<AppointmentsFileJob> {
        let sink: Box<dyn Sink<MemoryTask, Error = SendError> + Send + Sync + Unpin> =
            Box::new(self.sender.clone());
        let sink = MemorySink::new(Arc::new(futures::lock::Mutex::new(sink)));

        let ledger = self.ledger.clone();
        let tasks = futures::stream::unfold(self.receiver.clone(), |receiver| async move {
            let next = receiver.lock().await.next().await;
            next.map(|task| (task, receiver))
        })
        .map(move |task: MemoryTask| {
            if let Some(id) = task.parts.data.get::<JobId>() {
                lock(&ledger).start(*id);
            }
            task
        });

        MemoryStorage::new_with(sink, Box::pin(tasks))
    }

    /// Acknowledger that writes each delivery's outcome to the ledger
    pub fn ack(&self) -> LedgerAck {
        LedgerAck {
            ledger: self.ledger.clone(),
        }
    }

    /// Snapshots of every retained job, oldest first
    pub fn snapshots(&self) -> Vec<JobSnapshot> {
        let mut snapshots: Vec<_> = lock(&self.ledger).jobs.values().cloned().collect();
        snapshots.sort_by_key(|s| s.id);
        snapshots
    }

    pub fn len(&self) -> usize {
        lock(&self.ledger).jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct LedgerAck {
    ledger: Arc<Mutex<Ledger>>,
}

impl Acknowledge<UpsertSummary, Extensions, RandomId> for LedgerAck {
    type Error = Infallible;
    type Future = Ready<Result<(), Infallible>>;

    fn ack(
        &mut self,
        result: &Result<UpsertSummary, BoxDynError>,
        parts: &Parts<Extensions, RandomId>,
    ) -> Self::Future {
        if let Some(id) = parts.data.get::<JobId>() {
            let attempt = i32::try_from(parts.attempt.current()).unwrap_or(i32::MAX);
            lock(&self.ledger).record(*id, attempt, result);
        }
        ready(Ok(()))
    }
}

#[async_trait]
impl JobChannel for InMemoryJobChannel {
    async fn submit(
        &self,
        payload: AppointmentsFilePayload,
        max_attempts: i32,
    ) -> QueueResult<Option<JobId>> {
        check_max_attempts(max_attempts)?;

        let job = AppointmentsFileJob::new(payload);
        let id = job.job_id;
        lock(&self.ledger).jobs.insert(
            id,
            JobSnapshot {
                id,
                kind: AppointmentsFileJob::KIND.to_string(),
                status: JobStatus::Pending,
                attempts: 0,
                max_attempts,
                last_error: None,
                run_at: Utc::now(),
                finished_at: None,
            },
        );

        let task: MemoryTask = TaskBuilder::new(job)
            .with_task_id(TaskId::new(RandomId::default()))
            .data(id)
            .meta(RetryConfig {
                retries: max_attempts as usize,
            })
            .build();

        if let Err(e) = self.sender.unbounded_send(task) {
            lock(&self.ledger).jobs.remove(&id);
            return Err(QueueError::Submit(e.to_string()));
        }

        Ok(Some(id))
    }

    async fn mark_failed(&self, handle: &JobHandle, failure: &JobFailure) -> QueueResult<()> {
        lock(&self.ledger).fail(handle, failure)
    }

    async fn status(&self, id: JobId) -> QueueResult<Option<JobSnapshot>> {
        Ok(lock(&self.ledger).jobs.get(&id).cloned())
    }
}
