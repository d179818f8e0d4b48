//! PostgreSQL-backed job queue
//!
//! Jobs live in `apalis.jobs`. Enqueueing goes through the apalis sink and
//! workers fetch, lock and acknowledge through `apalis-postgres`; this type
//! only adds status lookups and terminal failures on top.

use apalis::prelude::{IntervalStrategy, StrategyBuilder, TaskBuilder, TaskId, TaskSink};
use apalis_core::backend::TaskSinkError;
use apalis_postgres::{Config, PgContext, PostgresStorage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;

use super::{check_max_attempts, map_status, JobChannel, JobSource, QueueError, QueueResult};
use crate::ingest::config::IngestConfig;
use crate::ingest::jobs::{
    AppointmentsFileJob, AppointmentsFilePayload, JobFailure, JobHandle, JobId, JobSnapshot,
};

#[derive(Clone)]
pub struct PgJobChannel {
    pool: PgPool,
    storage: PostgresStorage<AppointmentsFileJob>,
}

impl PgJobChannel {
    pub fn new(pool: &PgPool, config: &IngestConfig) -> Self {
        let poll = StrategyBuilder::new()
            .apply(IntervalStrategy::new(config.poll_interval()))
            .build();
        let apalis_config = Config::new(AppointmentsFileJob::KIND.as_str())
            .with_poll_interval(poll)
            .set_reenqueue_orphaned_after(config.lease_timeout());

        Self {
            pool: pool.clone(),
            storage: PostgresStorage::new_with_config(pool, &apalis_config),
        }
    }

    /// Create the `apalis` schema.
    ///
    /// Shares `_sqlx_migrations` with the service's own migrations, so each
    /// migrator ignores versions it does not know.
    pub async fn setup(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Setting up PostgreSQL storage for apalis");
        let mut migrator = PostgresStorage::<(), (), ()>::migrations();
        migrator.set_ignore_missing(true);
        migrator.run(pool).await
    }

    pub fn source(&self) -> JobSource {
        JobSource::Postgres(self.storage.clone())
    }
}

/// Columns of `apalis.jobs` the job API reports
#[derive(sqlx::FromRow)]
struct ApalisJobRow {
    id: String,
    job_type: String,
    status: String,
    attempts: i32,
    max_attempts: i32,
    last_result: Option<serde_json::Value>,
    run_at: DateTime<Utc>,
    done_at: Option<DateTime<Utc>>,
}

impl ApalisJobRow {
    fn into_snapshot(self, id: JobId) -> QueueResult<JobSnapshot> {
        let status = map_status(&self.status, self.attempts, self.max_attempts).ok_or_else(|| {
            QueueError::CorruptStatus {
                id: self.id.clone(),
                status: self.status.clone(),
            }
        })?;

        // apalis stores the handler result as `{"Ok": ..}` or `{"Err": "..."}`
        let last_error = self
            .last_result
            .as_ref()
            .and_then(|result| result.get("Err"))
            .and_then(|err| err.as_str())
            .map(str::to_string);

        Ok(JobSnapshot {
            id,
            kind: self.job_type,
            status,
            attempts: self.attempts,
            max_attempts: self.max_attempts,
            last_error,
            run_at: self.run_at,
            finished_at: self.done_at,
        })
    }
}

#[async_trait]
impl JobChannel for PgJobChannel {
    #[tracing::instrument(skip(self, payload))]
    async fn submit(
        &self,
        payload: AppointmentsFilePayload,
        max_attempts: i32,
    ) -> QueueResult<Option<JobId>> {
        check_max_attempts(max_attempts)?;

        let job = AppointmentsFileJob::new(payload);
        let id = job.job_id;
        let task = TaskBuilder::new(job)
            .with_task_id(TaskId::new(id))
            .with_ctx(PgContext::new().with_max_attempts(max_attempts))
            .build();

        let mut storage = self.storage.clone();
        storage.push_task(task).await.map_err(|e| match e {
            TaskSinkError::PushError(e) => QueueError::Sqlx(e),
            TaskSinkError::CodecError(e) => QueueError::Submit(e.to_string()),
        })?;

        Ok(Some(id))
    }

    /// Spend the rest of the job's budget so apalis never fetches it again.
    ///
    /// The acknowledgement that follows the failed delivery then leaves the
    /// row `Failed` with `attempts == max_attempts`.
    async fn mark_failed(&self, handle: &JobHandle, failure: &JobFailure) -> QueueResult<()> {
        let last_result = serde_json::json!({ "Err": failure.to_string() });

        let result = sqlx::query(
            r#"
            UPDATE apalis.jobs
            SET max_attempts = $3,
                last_result = $4
            WHERE id = $1 AND lock_by = $2 AND status = 'Running'
            "#,
        )
        .bind(handle.id.to_string())
        .bind(&handle.worker)
        .bind(handle.attempt)
        .bind(&last_result)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(QueueError::LockLost(handle.id));
        }
        Ok(())
    }

    async fn status(&self, id: JobId) -> QueueResult<Option<JobSnapshot>> {
        let row: Option<ApalisJobRow> = sqlx::query_as(
            r#"
            SELECT id, job_type, status, attempts, max_attempts,
                   last_result, run_at, done_at
            FROM apalis.jobs
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row.into_snapshot(id)).transpose()
    }
}
