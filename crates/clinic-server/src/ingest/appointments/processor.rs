//! Appointments file pipeline
//!
//! `read → decode → validate → upsert`, strictly in that order, for one job
//! delivery. Data-quality problems come back as [`JobFailure`]s; anything else
//! is an unclassified fault that the worker hands to the queue for retry.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn, Instrument, Span};

use super::{parser, upsert::AppointmentUpserter, validator};
use crate::db::AppointmentStore;
use crate::ingest::jobs::{AppointmentsFilePayload, JobFailure, UpsertSummary};

pub const CSV_EXTENSION: &str = ".csv";

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// Terminal, recorded on the job
    #[error(transparent)]
    Rejected(#[from] JobFailure),

    /// Retryable
    #[error(transparent)]
    Fault(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct AppointmentFileProcessor {
    upserter: AppointmentUpserter,
    span: Span,
}

impl AppointmentFileProcessor {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self::with_span(store, tracing::info_span!("appointments_file"))
    }

    pub fn with_span(store: Arc<dyn AppointmentStore>, span: Span) -> Self {
        let upserter = AppointmentUpserter::with_span(store, span.clone());
        Self { upserter, span }
    }

    pub async fn process(&self, payload: &AppointmentsFilePayload) -> Result<UpsertSummary, ProcessError> {
        self.run(payload).instrument(self.span.clone()).await
    }

    async fn run(&self, payload: &AppointmentsFilePayload) -> Result<UpsertSummary, ProcessError> {
        let filepath = payload.filepath.as_str();

        if !filepath.ends_with(CSV_EXTENSION) {
            warn!(filepath, "Rejecting non-CSV file");
            return Err(JobFailure::InvalidFileFormat.into());
        }

        let path = resolve_path(filepath);
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read appointments file {}", path.display()))?;
        let text = String::from_utf8_lossy(&bytes);

        let records = parser::decode(&text).map_err(|errors| {
            warn!(filepath, error_count = errors.len(), errors = %errors, "CSV decoding failed");
            JobFailure::InvalidCsvFile
        })?;

        let candidates = validator::validate(&records).map_err(|report| {
            error!(
                filepath,
                violation_count = report.violations.len(),
                failed_lines = report.failed_lines(),
                violations = %report,
                "Appointment records failed validation"
            );
            JobFailure::ValidationFailed
        })?;

        let summary = self
            .upserter
            .upsert_many(&candidates)
            .await
            .context("Failed to write appointments")?;

        info!(
            filepath,
            created = summary.created,
            submitted = summary.submitted,
            "{}",
            summary.message()
        );

        Ok(summary)
    }
}

/// Expand a leading `~/` to the current user's home directory
pub fn resolve_path(filepath: &str) -> PathBuf {
    match filepath.strip_prefix("~/") {
        Some(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => PathBuf::from(filepath),
        },
        None => PathBuf::from(filepath),
    }
}
