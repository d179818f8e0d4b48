//! CSV decoding
//!
//! Turns the raw text of an appointments file into header-keyed records. The
//! decoder is structural only: it knows nothing about field rules, which live
//! in the validator.

use std::collections::{HashMap, HashSet};
use std::fmt;

use csv::{ReaderBuilder, StringRecord};

/// One data row keyed by header name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-based line in the source text where the row starts
    pub line: u64,
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn new(line: u64, fields: HashMap<String, String>) -> Self {
        Self { line, fields }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDecodeError {
    pub line: Option<u64>,
    pub message: String,
}

impl fmt::Display for CsvDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Every structural error found in a file. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDecodeErrors(Vec<CsvDecodeError>);

impl CsvDecodeErrors {
    fn single(line: Option<u64>, message: impl Into<String>) -> Self {
        Self(vec![CsvDecodeError {
            line,
            message: message.into(),
        }])
    }

    pub fn errors(&self) -> &[CsvDecodeError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CsvDecodeErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for CsvDecodeErrors {}

fn line_of(error: &csv::Error) -> Option<u64> {
    error.position().map(|p| p.line())
}

/// Decode CSV text with a header row.
///
/// Blank lines are skipped. A row whose field count differs from the header
/// is an error, as is input with no header at all. Decoding continues past
/// bad rows so that every error in the file is reported at once.
pub fn decode(text: &str) -> Result<Vec<RawRecord>, CsvDecodeErrors> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers: StringRecord = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => return Err(CsvDecodeErrors::single(line_of(&e), e.to_string())),
    };

    if headers.is_empty() {
        return Err(CsvDecodeErrors::single(None, "missing header row"));
    }

    let mut seen = HashSet::new();
    for name in headers.iter() {
        if !seen.insert(name) {
            return Err(CsvDecodeErrors::single(
                Some(1),
                format!("duplicate column '{}' in header row", name),
            ));
        }
    }

    let mut records = Vec::new();
    let mut errors = Vec::new();

    for row in reader.records() {
        match row {
            Ok(row) => {
                let line = row.position().map_or(0, |p| p.line());
                let fields = headers
                    .iter()
                    .zip(row.iter())
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect();
                records.push(RawRecord::new(line, fields));
            },
            Err(e) => errors.push(CsvDecodeError {
                line: line_of(&e),
                message: e.to_string(),
            }),
        }
    }

    if !errors.is_empty() {
        return Err(CsvDecodeErrors(errors));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "patient_id,doctor,appointment_date,reason";

    #[test]
    fn test_decode_maps_header_to_values() {
        let text = format!("{HEADER}\n101,Dr Smith,2024-06-01T09:00:00Z,Checkup\n");
        let records = decode(&text).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].line, 2);
        assert_eq!(records[0].get("patient_id"), Some("101"));
        assert_eq!(records[0].get("doctor"), Some("Dr Smith"));
        assert_eq!(records[0].get("reason"), Some("Checkup"));
        assert_eq!(records[0].get("missing"), None);
    }

    #[test]
    fn test_header_only_file_has_no_records() {
        assert!(decode(&format!("{HEADER}\n")).unwrap().is_empty());
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let errors = decode("").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.to_string().contains("missing header row"));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let text = format!(
            "{HEADER}\n\n101,Dr Smith,2024-06-01T09:00,Checkup\n\n102,Dr Jones,2024-06-02T09:00,Flu\n"
        );
        let records = decode(&text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("patient_id"), Some("102"));
    }

    #[test]
    fn test_field_count_mismatch_reports_every_bad_row() {
        let text = format!(
            "{HEADER}\n101,Dr Smith\n102,Dr Jones,2024-06-02T09:00,Flu\n103,a,b,c,d\n"
        );
        let errors = decode(&text).unwrap_err();

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.errors()[0].line, Some(2));
        assert_eq!(errors.errors()[1].line, Some(4));
    }

    #[test]
    fn test_quoted_fields_keep_commas_and_newlines() {
        let text = format!("{HEADER}\n101,\"Smith, John\",2024-06-01T09:00,\"line one\nline two\"\n");
        let records = decode(&text).unwrap();

        assert_eq!(records[0].get("doctor"), Some("Smith, John"));
        assert_eq!(records[0].get("reason"), Some("line one\nline two"));
    }

    #[test]
    fn test_values_are_not_trimmed() {
        let text = format!("{HEADER}\n 101 , Dr Smith ,2024-06-01T09:00, Checkup \n");
        let records = decode(&text).unwrap();
        assert_eq!(records[0].get("patient_id"), Some(" 101 "));
        assert_eq!(records[0].get("reason"), Some(" Checkup "));
    }

    #[test]
    fn test_byte_order_mark_is_ignored() {
        let text = format!("\u{feff}{HEADER}\n101,Dr Smith,2024-06-01T09:00,Checkup\n");
        let records = decode(&text).unwrap();
        assert_eq!(records[0].get("patient_id"), Some("101"));
    }

    #[test]
    fn test_duplicate_header_is_rejected() {
        let errors = decode("doctor,doctor\na,b\n").unwrap_err();
        assert!(errors.to_string().contains("duplicate column 'doctor'"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = format!("{HEADER}\r\n101,Dr Smith,2024-06-01T09:00,Checkup\r\n");
        let records = decode(&text).unwrap();
        assert_eq!(records[0].get("reason"), Some("Checkup"));
    }
}
