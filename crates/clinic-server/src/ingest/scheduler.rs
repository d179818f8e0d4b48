//! Job scheduler
//!
//! Runs the apalis monitor for the ingestion workers on whichever
//! [`JobSource`] the service was started with.
//!
//! - PostgreSQL: `apalis-postgres` fetches, locks, acknowledges and re-fetches
//!   failed jobs while `attempts < max_attempts`. Orphaned jobs are
//!   re-enqueued after the lease timeout.
//! - Memory: failed deliveries are retried in place by apalis's
//!   [`RetryPolicy`], bounded by the budget each task carries in its
//!   `RetryConfig`, and outcomes are written to the channel's ledger.

use apalis::layers::retry::RetryPolicy;
use apalis::prelude::*;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::config::IngestConfig;
use super::dispatcher::JobDispatcher;
use super::queue::JobSource;
use super::worker::{is_retryable, process_appointments_file, WORKER_NAME};

pub struct JobScheduler {
    config: IngestConfig,
    dispatcher: JobDispatcher,
}

impl JobScheduler {
    pub fn new(config: IngestConfig, dispatcher: JobDispatcher) -> Self {
        Self { config, dispatcher }
    }

    /// Start the workers.
    ///
    /// The returned handle resolves after `shutdown` is cancelled and the
    /// monitor has let in-flight jobs finish.
    pub fn start(self, source: JobSource, shutdown: CancellationToken) -> JoinHandle<()> {
        info!(
            backend = source.backend_name(),
            workers = self.config.worker_concurrency,
            poll_interval_ms = self.config.poll_interval_ms,
            max_attempts = self.config.max_attempts,
            "Starting job scheduler"
        );

        let concurrency = self.config.worker_concurrency;
        let fallback_retries = usize::try_from(self.config.max_attempts - 1).unwrap_or(0);
        let dispatcher = self.dispatcher;

        let monitor = match source {
            JobSource::Postgres(storage) => Monitor::new().register(move |_index| {
                WorkerBuilder::new(WORKER_NAME)
                    .backend(storage.clone())
                    .data(dispatcher.clone())
                    .concurrency(concurrency)
                    .build(process_appointments_file)
            }),
            JobSource::Memory(channel) => Monitor::new().register(move |_index| {
                WorkerBuilder::new(WORKER_NAME)
                    .backend(channel.storage())
                    .data(dispatcher.clone())
                    .concurrency(concurrency)
                    .retry(
                        RetryPolicy::retries(fallback_retries)
                            .retry_if(is_retryable)
                            .from_task_config(),
                    )
                    .ack_with(channel.ack())
                    .build(process_appointments_file)
            }),
        };

        tokio::spawn(async move {
            info!("Job worker started");
            let signal = async move {
                shutdown.cancelled().await;
                Ok::<(), std::io::Error>(())
            };
            if let Err(e) = monitor.run_with_signal(signal).await {
                error!(error = %e, "Job worker error");
            }
            info!("Job scheduler stopped");
        })
    }
}
