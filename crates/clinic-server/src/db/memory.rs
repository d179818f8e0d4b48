//! In-memory stores
//!
//! Used with `STORE_BACKEND=memory` and throughout the test suite. Each store
//! holds its table behind a single lock, so a batch insert is atomic with
//! respect to other writers just like the SQL statement it stands in for.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{AppointmentStore, PatientStore, StoreResult};
use crate::models::{
    AppointmentCandidate, AppointmentFilter, AppointmentRecord, DedupKey, NewPatient,
    PatientRecord,
};

#[derive(Debug, Default)]
struct AppointmentTable {
    last_id: i64,
    rows: BTreeMap<i64, AppointmentRecord>,
    keys: HashSet<DedupKey>,
}

#[derive(Debug, Default)]
pub struct InMemoryAppointmentStore {
    table: RwLock<AppointmentTable>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn insert_if_absent(&self, candidates: &[AppointmentCandidate]) -> StoreResult<u64> {
        let mut table = self.table.write().await;
        let mut created = 0;

        for candidate in candidates {
            if !table.keys.insert(candidate.dedup_key()) {
                continue;
            }
            table.last_id += 1;
            let now = Utc::now();
            let record = AppointmentRecord {
                id: table.last_id,
                patient_id: candidate.patient_id,
                doctor: candidate.doctor.clone(),
                appointment_date: candidate.appointment_date.clone(),
                reason: candidate.reason.clone(),
                created_at: now,
                updated_at: now,
            };
            table.rows.insert(record.id, record);
            created += 1;
        }

        Ok(created)
    }

    async fn list(&self, filter: &AppointmentFilter) -> StoreResult<Vec<AppointmentRecord>> {
        let table = self.table.read().await;
        Ok(table.rows.values().filter(|r| filter.matches(r)).cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<AppointmentRecord>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PatientTable {
    last_id: i64,
    rows: BTreeMap<i64, PatientRecord>,
}

#[derive(Debug, Default)]
pub struct InMemoryPatientStore {
    table: RwLock<PatientTable>,
}

impl InMemoryPatientStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PatientStore for InMemoryPatientStore {
    async fn create(&self, patient: &NewPatient) -> StoreResult<PatientRecord> {
        let mut table = self.table.write().await;
        table.last_id += 1;
        let now = Utc::now();
        let record = PatientRecord {
            id: table.last_id,
            name: patient.name.clone(),
            age: patient.age,
            gender: patient.gender.as_str().to_string(),
            contact: patient.contact.clone(),
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list(&self) -> StoreResult<Vec<PatientRecord>> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<PatientRecord>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;

    fn candidate(patient_id: i64, doctor: &str, date: &str, reason: &str) -> AppointmentCandidate {
        AppointmentCandidate {
            patient_id,
            doctor: doctor.to_string(),
            appointment_date: date.to_string(),
            reason: reason.to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_occurrence_wins_within_batch() {
        let store = InMemoryAppointmentStore::new();
        let batch = vec![
            candidate(1, "Dr A", "2024-01-01T10:00", "first"),
            candidate(1, "Dr A", "2024-01-01T10:00", "second"),
        ];

        let created = store.insert_if_absent(&batch).await.unwrap();
        assert_eq!(created, 1);

        let rows = store.list(&AppointmentFilter::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].reason, "first");
    }

    #[tokio::test]
    async fn test_existing_rows_are_not_overwritten() {
        let store = InMemoryAppointmentStore::new();
        store
            .insert_if_absent(&[candidate(1, "Dr A", "2024-01-01T10:00", "original")])
            .await
            .unwrap();
        let created = store
            .insert_if_absent(&[candidate(1, "Dr A", "2024-01-01T10:00", "changed")])
            .await
            .unwrap();

        assert_eq!(created, 0);
        let row = store.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(row.reason, "original");
    }

    #[tokio::test]
    async fn test_ids_increase_and_list_is_ordered() {
        let store = InMemoryAppointmentStore::new();
        store
            .insert_if_absent(&[
                candidate(3, "Dr C", "2024-01-03T10:00", "x"),
                candidate(1, "Dr A", "2024-01-01T10:00", "y"),
            ])
            .await
            .unwrap();
        store
            .insert_if_absent(&[candidate(2, "Dr B", "2024-01-02T10:00", "z")])
            .await
            .unwrap();

        let ids: Vec<i64> = store
            .list(&AppointmentFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_find_missing_appointment() {
        let store = InMemoryAppointmentStore::new();
        assert!(store.find_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_patients_get_sequential_ids() {
        let store = InMemoryPatientStore::new();
        let new = NewPatient {
            name: "Jane Roe".to_string(),
            age: 34,
            gender: Gender::Female,
            contact: "+1(555)010-0000".to_string(),
        };

        let first = store.create(&new).await.unwrap();
        let second = store.create(&new).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.gender, "Female");
        assert_eq!(store.list().await.unwrap().len(), 2);
        assert!(store.find_by_id(3).await.unwrap().is_none());
    }
}
