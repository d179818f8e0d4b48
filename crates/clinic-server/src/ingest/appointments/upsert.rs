//! Idempotent appointment writes

use std::sync::Arc;

use tracing::{debug, Instrument, Span};

use crate::db::{AppointmentStore, StoreResult};
use crate::ingest::jobs::UpsertSummary;
use crate::models::AppointmentCandidate;

/// Writes validated batches through `AppointmentStore::insert_if_absent`.
///
/// Running the same batch any number of times leaves exactly one record per
/// dedup key; existing records are never modified.
#[derive(Clone)]
pub struct AppointmentUpserter {
    store: Arc<dyn AppointmentStore>,
    span: Span,
}

impl AppointmentUpserter {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self::with_span(store, tracing::info_span!("appointment_upsert"))
    }

    pub fn with_span(store: Arc<dyn AppointmentStore>, span: Span) -> Self {
        Self { store, span }
    }

    pub async fn upsert_many(&self, candidates: &[AppointmentCandidate]) -> StoreResult<UpsertSummary> {
        if candidates.is_empty() {
            return Ok(UpsertSummary::default());
        }

        let submitted = candidates.len() as u64;
        let created = self
            .store
            .insert_if_absent(candidates)
            .instrument(self.span.clone())
            .await?;

        self.span.in_scope(|| debug!(created, submitted, "Appointment batch written"));

        Ok(UpsertSummary { created, submitted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::InMemoryAppointmentStore;
    use crate::models::AppointmentFilter;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn candidate(patient_id: i64, doctor: &str, date: &str, reason: &str) -> AppointmentCandidate {
        AppointmentCandidate {
            patient_id,
            doctor: doctor.to_string(),
            appointment_date: date.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Store that fails the test if it is ever written to
    struct UntouchableStore;

    #[async_trait]
    impl AppointmentStore for UntouchableStore {
        async fn insert_if_absent(&self, _: &[AppointmentCandidate]) -> StoreResult<u64> {
            panic!("store must not be called for an empty batch");
        }
        async fn list(&self, _: &AppointmentFilter) -> StoreResult<Vec<crate::models::AppointmentRecord>> {
            Ok(Default::default())
        }
        async fn find_by_id(&self, _: i64) -> StoreResult<Option<crate::models::AppointmentRecord>> {
            Ok(Default::default())
        }
        async fn ping(&self) -> StoreResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_empty_batch_skips_the_store() {
        let upserter = AppointmentUpserter::new(Arc::new(UntouchableStore));
        let summary = upserter.upsert_many(&[]).await.unwrap();
        assert_eq!(summary, UpsertSummary { created: 0, submitted: 0 });
    }

    #[tokio::test]
    async fn test_same_key_different_reason_creates_one() {
        let store = Arc::new(InMemoryAppointmentStore::new());
        let upserter = AppointmentUpserter::new(store.clone());

        let summary = upserter
            .upsert_many(&[
                candidate(101, "Dr Smith", "2024-06-01T09:00:00Z", "Checkup"),
                candidate(101, "Dr Smith", "2024-06-01T09:00:00Z", "Follow-up"),
            ])
            .await
            .unwrap();

        assert_eq!(summary, UpsertSummary { created: 1, submitted: 2 });
        assert_eq!(summary.message(), "1 appointments created out of 2");
    }

    #[tokio::test]
    async fn test_second_run_creates_nothing() {
        let store = Arc::new(InMemoryAppointmentStore::new());
        let upserter = AppointmentUpserter::new(store.clone());
        let batch = vec![
            candidate(1, "Dr A", "2024-06-01T09:00", "x"),
            candidate(2, "Dr A", "2024-06-01T09:00", "x"),
            candidate(1, "Dr B", "2024-06-01T09:00", "x"),
        ];

        assert_eq!(upserter.upsert_many(&batch).await.unwrap().created, 3);
        assert_eq!(upserter.upsert_many(&batch).await.unwrap().created, 0);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_concurrent_batches_never_duplicate() {
        let store = Arc::new(InMemoryAppointmentStore::new());
        let batch: Vec<_> = (1..=20)
            .map(|i| candidate(i, "Dr Parallel", "2024-06-01T09:00", "x"))
            .collect();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let upserter = AppointmentUpserter::new(store.clone());
            let batch = batch.clone();
            handles.push(tokio::spawn(async move { upserter.upsert_many(&batch).await }));
        }

        let mut created = 0;
        for handle in handles {
            created += handle.await.unwrap().unwrap().created;
        }

        assert_eq!(created, 20);
        assert_eq!(store.len().await, 20);
    }

    fn arb_candidate() -> impl Strategy<Value = AppointmentCandidate> {
        (1i64..5, prop::sample::select(vec!["Dr A", "Dr B"]), 0u8..3, "[a-z]{1,6}").prop_map(
            |(patient_id, doctor, hour, reason)| {
                candidate(patient_id, doctor, &format!("2024-06-01T0{}:00", hour), &reason)
            },
        )
    }

    proptest! {
        #[test]
        fn prop_at_most_one_record_per_key(
            batches in prop::collection::vec(prop::collection::vec(arb_candidate(), 0..12), 1..5)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = Arc::new(InMemoryAppointmentStore::new());
                let upserter = AppointmentUpserter::new(store.clone());

                let mut distinct = HashSet::new();
                let mut total_created = 0;
                for batch in &batches {
                    let summary = upserter.upsert_many(batch).await.unwrap();
                    prop_assert_eq!(summary.submitted, batch.len() as u64);
                    total_created += summary.created;
                    distinct.extend(batch.iter().map(AppointmentCandidate::dedup_key));
                }

                let rows = store.list(&AppointmentFilter::default()).await.unwrap();
                let keys: HashSet<_> = rows.iter().map(|r| r.dedup_key()).collect();
                prop_assert_eq!(keys.len(), rows.len());
                prop_assert_eq!(rows.len(), distinct.len());
                prop_assert_eq!(total_created, distinct.len() as u64);
                Ok(())
            })?;
        }
    }
}
