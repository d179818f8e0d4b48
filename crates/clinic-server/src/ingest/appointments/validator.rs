//! Record validation
//!
//! All-or-nothing: a file produces candidates only when every record passes
//! every rule. Otherwise the caller gets the full list of violations.

use std::fmt;

use super::parser::RawRecord;
use crate::features::shared::validation::{
    parse_patient_id, validate_appointment_date, validate_person_name, validate_required,
};
use crate::models::AppointmentCandidate;

pub const PATIENT_ID: &str = "patient_id";
pub const DOCTOR: &str = "doctor";
pub const APPOINTMENT_DATE: &str = "appointment_date";
pub const REASON: &str = "reason";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub line: u64,
    pub field: &'static str,
    pub value: Option<String>,
    pub message: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.field, self.message)?;
        if let Some(value) = &self.value {
            write!(f, " (got {:?})", value)?;
        }
        Ok(())
    }
}

/// Every violation found in a batch, in source order. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub violations: Vec<FieldViolation>,
}

impl ValidationReport {
    /// Number of distinct lines with at least one violation
    pub fn failed_lines(&self) -> usize {
        let mut lines: Vec<u64> = self.violations.iter().map(|v| v.line).collect();
        lines.dedup();
        lines.len()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

pub fn validate(records: &[RawRecord]) -> Result<Vec<AppointmentCandidate>, ValidationReport> {
    let mut candidates = Vec::with_capacity(records.len());
    let mut violations = Vec::new();

    for record in records {
        match validate_record(record) {
            Ok(candidate) => candidates.push(candidate),
            Err(mut found) => violations.append(&mut found),
        }
    }

    if violations.is_empty() {
        Ok(candidates)
    } else {
        Err(ValidationReport { violations })
    }
}

/// Check one record against every field rule
pub fn validate_record(record: &RawRecord) -> Result<AppointmentCandidate, Vec<FieldViolation>> {
    let mut violations = Vec::new();
    let mut violation = |field: &'static str, value: Option<&str>, message: String| {
        violations.push(FieldViolation {
            line: record.line,
            field,
            value: value.map(str::to_string),
            message,
        })
    };

    let patient_id = record.get(PATIENT_ID);
    let doctor = record.get(DOCTOR);
    let appointment_date = record.get(APPOINTMENT_DATE);
    let reason = record.get(REASON);

    let parsed_id = match patient_id.map(parse_patient_id) {
        Some(Ok(id)) => Some(id),
        Some(Err(e)) => {
            violation(PATIENT_ID, patient_id, e.to_string());
            None
        },
        None => {
            violation(PATIENT_ID, None, missing(PATIENT_ID));
            None
        },
    };

    match doctor {
        Some(value) => {
            if let Err(e) = validate_person_name(value, DOCTOR) {
                violation(DOCTOR, Some(value), e.to_string());
            }
        },
        None => violation(DOCTOR, None, missing(DOCTOR)),
    }

    match appointment_date {
        Some(value) => {
            if let Err(e) = validate_appointment_date(value) {
                violation(APPOINTMENT_DATE, Some(value), e.to_string());
            }
        },
        None => violation(APPOINTMENT_DATE, None, missing(APPOINTMENT_DATE)),
    }

    match reason {
        Some(value) => {
            if let Err(e) = validate_required(value, REASON) {
                violation(REASON, Some(value), e.to_string());
            }
        },
        None => violation(REASON, None, missing(REASON)),
    }

    match (parsed_id, doctor, appointment_date, reason) {
        (Some(patient_id), Some(doctor), Some(appointment_date), Some(reason))
            if violations.is_empty() =>
        {
            Ok(AppointmentCandidate {
                patient_id,
                doctor: doctor.to_string(),
                appointment_date: appointment_date.to_string(),
                reason: reason.to_string(),
            })
        },
        _ => Err(violations),
    }
}

fn missing(field: &str) -> String {
    format!("missing column '{}'", field)
}
