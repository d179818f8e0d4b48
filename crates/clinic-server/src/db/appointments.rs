//! Appointment persistence

use async_trait::async_trait;
use sqlx::PgPool;

use super::{StoreError, StoreResult};
use crate::models::{AppointmentCandidate, AppointmentFilter, AppointmentRecord};

/// Storage for appointments.
///
/// `insert_if_absent` is the only write path. It must apply the whole batch as
/// one atomic conditional write keyed on `(doctor, patient_id,
/// appointment_date)` and return how many rows were actually created. Within a
/// batch the first occurrence of a key wins.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert_if_absent(&self, candidates: &[AppointmentCandidate]) -> StoreResult<u64>;

    /// Records matching `filter`, ordered by `id`
    async fn list(&self, filter: &AppointmentFilter) -> StoreResult<Vec<AppointmentRecord>>;

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<AppointmentRecord>>;

    /// Connectivity check for `/health`
    async fn ping(&self) -> StoreResult<()>;
}

const SELECT_COLUMNS: &str =
    "id, patient_id, doctor, appointment_date, reason, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgAppointmentStore {
    pool: PgPool,
}

impl PgAppointmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AppointmentStore for PgAppointmentStore {
    #[tracing::instrument(skip(self, candidates), fields(submitted = candidates.len()))]
    async fn insert_if_absent(&self, candidates: &[AppointmentCandidate]) -> StoreResult<u64> {
        if candidates.is_empty() {
            return Ok(0);
        }

        let mut patient_ids = Vec::with_capacity(candidates.len());
        let mut doctors = Vec::with_capacity(candidates.len());
        let mut dates = Vec::with_capacity(candidates.len());
        let mut reasons = Vec::with_capacity(candidates.len());
        for c in candidates {
            patient_ids.push(c.patient_id);
            doctors.push(c.doctor.clone());
            dates.push(c.appointment_date.clone());
            reasons.push(c.reason.clone());
        }

        // ORDER BY ord keeps the first in-batch occurrence of a duplicate key.
        let result = sqlx::query(
            r#"
            INSERT INTO appointments (patient_id, doctor, appointment_date, reason)
            SELECT t.patient_id, t.doctor, t.appointment_date, t.reason
            FROM UNNEST($1::BIGINT[], $2::TEXT[], $3::TEXT[], $4::TEXT[])
                 WITH ORDINALITY AS t(patient_id, doctor, appointment_date, reason, ord)
            ORDER BY t.ord
            ON CONFLICT (doctor, patient_id, appointment_date) DO NOTHING
            "#,
        )
        .bind(&patient_ids)
        .bind(&doctors)
        .bind(&dates)
        .bind(&reasons)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn list(&self, filter: &AppointmentFilter) -> StoreResult<Vec<AppointmentRecord>> {
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM appointments
            WHERE ($1::BIGINT IS NULL OR patient_id = $1)
              AND ($2::TEXT IS NULL OR doctor = $2)
            ORDER BY id
            "#
        );

        let rows = sqlx::query_as::<_, AppointmentRecord>(&sql)
            .bind(filter.patient_id)
            .bind(filter.doctor.as_deref())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<AppointmentRecord>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM appointments WHERE id = $1");

        sqlx::query_as::<_, AppointmentRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)
    }

    async fn ping(&self) -> StoreResult<()> {
        super::health_check(&self.pool).await
    }
}
