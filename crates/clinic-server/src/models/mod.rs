//! Domain models
//!
//! Types shared by the ingestion pipeline, the stores and the HTTP features.
//! Database rows derive `FromRow`; the `*View` types are the public projections
//! returned over the API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// Appointments
// ============================================================================

/// A validated appointment row, ready to be written.
///
/// Only the record validator constructs these from CSV input, so every
/// candidate already satisfies the field rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentCandidate {
    pub patient_id: i64,
    pub doctor: String,
    pub appointment_date: String,
    pub reason: String,
}

impl AppointmentCandidate {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            doctor: self.doctor.clone(),
            patient_id: self.patient_id,
            appointment_date: self.appointment_date.clone(),
        }
    }
}

/// Identity of an appointment for deduplication.
///
/// `appointment_date` is compared as the exact submitted string, so two
/// spellings of the same instant are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey {
    pub doctor: String,
    pub patient_id: i64,
    pub appointment_date: String,
}

/// Stored appointment
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AppointmentRecord {
    pub id: i64,
    pub patient_id: i64,
    pub doctor: String,
    pub appointment_date: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentRecord {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            doctor: self.doctor.clone(),
            patient_id: self.patient_id,
            appointment_date: self.appointment_date.clone(),
        }
    }
}

/// Public projection of an appointment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentView {
    pub id: i64,
    pub patient_id: i64,
    pub doctor: String,
    pub appointment_date: String,
    pub reason: String,
}

impl From<AppointmentRecord> for AppointmentView {
    fn from(record: AppointmentRecord) -> Self {
        Self {
            id: record.id,
            patient_id: record.patient_id,
            doctor: record.doctor,
            appointment_date: record.appointment_date,
            reason: record.reason,
        }
    }
}

/// Exact-match listing filter. Absent fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentFilter {
    pub patient_id: Option<i64>,
    pub doctor: Option<String>,
}

impl AppointmentFilter {
    pub fn matches(&self, record: &AppointmentRecord) -> bool {
        self.patient_id.map_or(true, |id| record.patient_id == id)
            && self.doctor.as_deref().map_or(true, |d| record.doctor == d)
    }
}

// ============================================================================
// Patients
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    NotSpecified,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 4] = [Gender::Male, Gender::Female, Gender::NotSpecified, Gender::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::NotSpecified => "NotSpecified",
            Gender::Other => "Other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gender::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| format!("Unknown gender '{}'", s))
    }
}

/// Validated input for a new patient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPatient {
    pub name: String,
    pub age: i32,
    pub gender: Gender,
    pub contact: String,
}

/// Stored patient
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PatientRecord {
    pub id: i64,
    pub name: String,
    pub age: i32,
    pub gender: String,
    pub contact: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public projection of a patient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientView {
    pub id: i64,
    pub name: String,
    pub age: i32,
    pub gender: String,
    pub contact: String,
}

impl From<PatientRecord> for PatientView {
    fn from(record: PatientRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            age: record.age,
            gender: record.gender,
            contact: record.contact,
        }
    }
}
