//! Patient persistence

use async_trait::async_trait;
use sqlx::PgPool;

use super::{StoreError, StoreResult};
use crate::models::{NewPatient, PatientRecord};

#[async_trait]
pub trait PatientStore: Send + Sync {
    async fn create(&self, patient: &NewPatient) -> StoreResult<PatientRecord>;

    /// All patients ordered by `id`
    async fn list(&self) -> StoreResult<Vec<PatientRecord>>;

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<PatientRecord>>;
}

#[derive(Debug, Clone)]
pub struct PgPatientStore {
    pool: PgPool,
}

impl PgPatientStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PatientStore for PgPatientStore {
    async fn create(&self, patient: &NewPatient) -> StoreResult<PatientRecord> {
        let record = sqlx::query_as::<_, PatientRecord>(
            r#"
            INSERT INTO patients (name, age, gender, contact)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, age, gender, contact, created_at, updated_at
            "#,
        )
        .bind(&patient.name)
        .bind(patient.age)
        .bind(patient.gender.as_str())
        .bind(&patient.contact)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list(&self) -> StoreResult<Vec<PatientRecord>> {
        sqlx::query_as::<_, PatientRecord>(
            r#"
            SELECT id, name, age, gender, contact, created_at, updated_at
            FROM patients
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<PatientRecord>> {
        sqlx::query_as::<_, PatientRecord>(
            r#"
            SELECT id, name, age, gender, contact, created_at, updated_at
            FROM patients
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)
    }
}
