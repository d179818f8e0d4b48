//! Shared validation utilities
//!
//! Field rules used by the CSV record validator, the listing filters and the
//! patient commands. Each rule returns a small error enum whose `Display` is
//! the message reported back to the client or written to the ingestion log.
//!
//! # Examples
//!
//! ```rust,ignore
//! use clinic_server::features::shared::validation::{parse_patient_id, validate_person_name};
//!
//! let id = parse_patient_id(" 101 ")?;
//! validate_person_name("Dr Smith", "doctor")?;
//! ```

use chrono::NaiveDateTime;
use thiserror::Error;

/// Errors for positive integer identifiers
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatientIdValidationError {
    #[error("Patient ID is required")]
    Required,

    #[error("Patient ID must be a positive integer.")]
    NotPositiveInteger,
}

/// Errors for person names (doctors, patients)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersonNameValidationError {
    #[error("{field} is required and cannot be empty")]
    Required { field: String },

    #[error("Name should not contain digits.")]
    ContainsDigits,
}

/// Errors for the appointment date-time
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppointmentDateValidationError {
    #[error("Appointment date is required")]
    Required,

    #[error("Appointment date must be in valid ISO 8601 format.")]
    InvalidFormat,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field} is required and cannot be empty")]
pub struct RequiredFieldError {
    pub field: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgeValidationError {
    #[error("Age cannot be less than 0.")]
    Negative,

    #[error("Age cannot be greater than {max}.")]
    TooHigh { max: i32 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContactValidationError {
    #[error("Contact is required and cannot be empty")]
    Required,

    #[error("Contact should only contain digits, parenthesis, hyphens and a plus sign.")]
    InvalidCharacters,
}

pub const MAX_PATIENT_AGE: i32 = 120;

/// Parse a patient id from raw text.
///
/// Surrounding whitespace is tolerated; the remainder must be an integer
/// greater than zero.
pub fn parse_patient_id(raw: &str) -> Result<i64, PatientIdValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PatientIdValidationError::Required);
    }

    let id: i64 = trimmed
        .parse()
        .map_err(|_| PatientIdValidationError::NotPositiveInteger)?;
    validate_patient_id(id)?;
    Ok(id)
}

pub fn validate_patient_id(id: i64) -> Result<(), PatientIdValidationError> {
    if id <= 0 {
        return Err(PatientIdValidationError::NotPositiveInteger);
    }
    Ok(())
}

/// Validate a person's name
///
/// # Rules
/// - Must not be empty
/// - Must not contain ASCII digits
pub fn validate_person_name(value: &str, field: &str) -> Result<(), PersonNameValidationError> {
    if value.is_empty() {
        return Err(PersonNameValidationError::Required {
            field: field.to_string(),
        });
    }

    if contains_digit(value) {
        return Err(PersonNameValidationError::ContainsDigits);
    }

    Ok(())
}

/// Digit check used by both the name rule and the listing filter
#[inline]
pub fn contains_digit(value: &str) -> bool {
    value.bytes().any(|b| b.is_ascii_digit())
}

pub fn validate_required(value: &str, field: &str) -> Result<(), RequiredFieldError> {
    if value.is_empty() {
        return Err(RequiredFieldError {
            field: field.to_string(),
        });
    }
    Ok(())
}

pub fn validate_appointment_date(value: &str) -> Result<(), AppointmentDateValidationError> {
    if value.is_empty() {
        return Err(AppointmentDateValidationError::Required);
    }

    if !is_iso8601_datetime(value) {
        return Err(AppointmentDateValidationError::InvalidFormat);
    }

    Ok(())
}

/// Strict ISO-8601 date-time check.
///
/// Accepts `YYYY-MM-DDTHH:MM`, optionally followed by `:SS` (00-59), then
/// `.fff…`, then an optional zone: `Z`, `z`, `±HH`, `±HHMM` or `±HH:MM`. The
/// separator must be an uppercase `T` and the date must exist in the
/// calendar. Date-only values are rejected.
pub fn is_iso8601_datetime(value: &str) -> bool {
    if !value.is_ascii() || value.len() < 16 {
        return false;
    }

    let (local, offset) = split_offset(value);
    if let Some(offset) = offset {
        if !is_valid_offset(offset) {
            return false;
        }
    }

    let bytes = local.as_bytes();
    if bytes.len() < 16 {
        return false;
    }

    let fixed_shape = bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes[10] == b'T'
        && bytes[13] == b':'
        && [0, 1, 2, 3, 5, 6, 8, 9, 11, 12, 14, 15]
            .iter()
            .all(|&i| bytes[i].is_ascii_digit());
    if !fixed_shape {
        return false;
    }

    let seconds = &local[16..];
    let format = if seconds.is_empty() {
        "%Y-%m-%dT%H:%M"
    } else if is_valid_seconds(seconds) {
        "%Y-%m-%dT%H:%M:%S%.f"
    } else {
        return false;
    };

    NaiveDateTime::parse_from_str(local, format).is_ok()
}

// Everything after the minutes is `:SS.fff`, so the first zone character
// past that point starts the offset
fn split_offset(value: &str) -> (&str, Option<&str>) {
    match value[16..].find(['Z', 'z', '+', '-']) {
        Some(at) => (&value[..16 + at], Some(&value[16 + at..])),
        None => (value, None),
    }
}

fn is_valid_offset(offset: &str) -> bool {
    if offset == "Z" || offset == "z" {
        return true;
    }

    let Some(rest) = offset.strip_prefix(['+', '-']) else {
        return false;
    };
    let (hours, minutes) = match rest.len() {
        2 => (rest, "00"),
        4 => (&rest[..2], &rest[2..]),
        5 if rest.as_bytes()[2] == b':' => (&rest[..2], &rest[3..]),
        _ => return false,
    };

    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    digits(hours)
        && digits(minutes)
        && hours.parse::<u8>().map_or(false, |h| h <= 23)
        && minutes.parse::<u8>().map_or(false, |m| m <= 59)
}

// `:SS` optionally followed by `.` and at least one digit
fn is_valid_seconds(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    if bytes.len() < 3 || bytes[0] != b':' || !bytes[1].is_ascii_digit() || !bytes[2].is_ascii_digit() {
        return false;
    }

    // chrono reads `60` as a leap second
    if bytes[1] > b'5' {
        return false;
    }

    match &bytes[3..] {
        [] => true,
        [b'.', fraction @ ..] => !fraction.is_empty() && fraction.iter().all(u8::is_ascii_digit),
        _ => false,
    }
}

pub fn validate_age(age: i32) -> Result<(), AgeValidationError> {
    if age < 0 {
        return Err(AgeValidationError::Negative);
    }
    if age > MAX_PATIENT_AGE {
        return Err(AgeValidationError::TooHigh {
            max: MAX_PATIENT_AGE,
        });
    }
    Ok(())
}

/// Validate a contact phone number
///
/// Only digits, `+`, `-`, `(` and `)` are allowed.
pub fn validate_contact(value: &str) -> Result<(), ContactValidationError> {
    if value.is_empty() {
        return Err(ContactValidationError::Required);
    }

    if !value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')'))
    {
        return Err(ContactValidationError::InvalidCharacters);
    }

    Ok(())
}
