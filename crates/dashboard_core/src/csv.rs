//! Comma-separated hospital table parsing.
//!
//! The field splitter is a quote-toggle state machine: `"` flips the
//! "inside quotes" flag and is dropped, a `,` outside quotes ends the field.
//! Numeric columns fall back to 0 through [`coerce_numeric`], which keeps
//! the fallback visible to callers instead of hiding it inline.

use std::collections::{BTreeMap, HashSet};

use shared::{
    domain::{
        HospitalId, HospitalRecord, COLUMN_CITY, COLUMN_COUNTRY, COLUMN_COUNTRY_CODE,
        COLUMN_HOSPITAL_ID, COLUMN_HOSPITAL_NAME, COLUMN_LATITUDE, COLUMN_LONGITUDE,
        COLUMN_TOTAL_PATIENTS, COLUMN_TOTAL_PATIENT_RECORDS, REQUIRED_COLUMNS,
    },
    error::ErrorCode,
};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CsvError {
    #[error("hospital table is empty")]
    Empty,
    #[error("hospital table is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Outcome of coercing one numeric cell.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericField {
    Parsed(f64),
    /// The cell was empty or not a finite number; the value is 0.
    Defaulted { raw: String },
}

impl NumericField {
    pub fn value(&self) -> f64 {
        match self {
            NumericField::Parsed(value) => *value,
            NumericField::Defaulted { .. } => 0.0,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, NumericField::Defaulted { .. })
    }
}

pub fn coerce_numeric(raw: &str) -> NumericField {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => NumericField::Parsed(value),
        _ => NumericField::Defaulted {
            raw: trimmed.to_string(),
        },
    }
}

/// Splits one line into raw (untrimmed) fields.
pub fn parse_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }

    fields.push(current);
    fields
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFallback {
    /// 1-based line number in the source text, header included.
    pub line: usize,
    pub column: &'static str,
    pub raw: String,
}

impl FieldFallback {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::ParseFallback
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedHospitals {
    pub records: Vec<HospitalRecord>,
    pub fallbacks: Vec<FieldFallback>,
    pub skipped_rows: usize,
    /// Rows kept whose id already appeared earlier; lookups by id resolve
    /// to the first one.
    pub duplicate_ids: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ColumnRule {
    Id,
    Name,
    Country,
    CountryCode,
    City,
    Latitude,
    Longitude,
    TotalPatients,
    TotalPatientRecords,
    Extra(String),
}

impl ColumnRule {
    fn for_header(header: &str) -> Self {
        match header {
            COLUMN_HOSPITAL_ID => ColumnRule::Id,
            COLUMN_HOSPITAL_NAME => ColumnRule::Name,
            COLUMN_COUNTRY => ColumnRule::Country,
            COLUMN_COUNTRY_CODE => ColumnRule::CountryCode,
            COLUMN_CITY => ColumnRule::City,
            COLUMN_LATITUDE => ColumnRule::Latitude,
            COLUMN_LONGITUDE => ColumnRule::Longitude,
            COLUMN_TOTAL_PATIENTS => ColumnRule::TotalPatients,
            COLUMN_TOTAL_PATIENT_RECORDS => ColumnRule::TotalPatientRecords,
            other => ColumnRule::Extra(other.to_string()),
        }
    }
}

#[derive(Default)]
struct RowBuilder {
    id: String,
    name: String,
    country: String,
    country_code: String,
    city: String,
    latitude: f64,
    longitude: f64,
    total_patients: f64,
    total_patient_records: f64,
    extra: BTreeMap<String, String>,
}

pub fn parse_hospitals(text: &str) -> Result<ParsedHospitals, CsvError> {
    let mut lines = text
        .trim_start_matches('\u{feff}')
        .trim()
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .enumerate()
        .map(|(index, line)| (index + 1, line));

    let (_, header_line) = lines.next().ok_or(CsvError::Empty)?;
    if header_line.trim().is_empty() {
        return Err(CsvError::Empty);
    }
    let headers: Vec<String> = parse_line(header_line)
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !headers.iter().any(|header| header == *required))
        .map(|required| required.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(CsvError::MissingColumns(missing));
    }

    let rules: Vec<ColumnRule> = headers
        .iter()
        .map(|header| ColumnRule::for_header(header))
        .collect();

    let mut parsed = ParsedHospitals::default();
    let mut seen_ids = HashSet::new();
    for (line_number, line) in lines {
        if line.trim().is_empty() {
            continue;
        }

        let values = parse_line(line);
        let mut row = RowBuilder::default();
        for (index, rule) in rules.iter().enumerate() {
            let raw = values.get(index).map(String::as_str).unwrap_or("");
            let mut numeric = |column: &'static str| {
                let field = coerce_numeric(raw);
                if let NumericField::Defaulted { raw } = &field {
                    debug!(line = line_number, column, raw = %raw, "numeric field defaulted to 0");
                    parsed.fallbacks.push(FieldFallback {
                        line: line_number,
                        column,
                        raw: raw.clone(),
                    });
                }
                field.value()
            };

            match rule {
                ColumnRule::Id => row.id = raw.trim().to_string(),
                ColumnRule::Name => row.name = raw.trim().to_string(),
                ColumnRule::Country => row.country = raw.trim().to_string(),
                ColumnRule::CountryCode => row.country_code = raw.trim().to_string(),
                ColumnRule::City => row.city = raw.trim().to_string(),
                ColumnRule::Latitude => row.latitude = numeric(COLUMN_LATITUDE),
                ColumnRule::Longitude => row.longitude = numeric(COLUMN_LONGITUDE),
                ColumnRule::TotalPatients => row.total_patients = numeric(COLUMN_TOTAL_PATIENTS),
                ColumnRule::TotalPatientRecords => {
                    row.total_patient_records = numeric(COLUMN_TOTAL_PATIENT_RECORDS)
                }
                ColumnRule::Extra(header) => {
                    row.extra.insert(header.clone(), raw.trim().to_string());
                }
            }
        }

        let Some(id) = HospitalId::normalize(&row.id) else {
            warn!(line = line_number, "skipping hospital row without an id");
            parsed.skipped_rows += 1;
            continue;
        };
        if !seen_ids.insert(id.clone()) {
            warn!(line = line_number, hospital_id = %id, "duplicate hospital id");
            parsed.duplicate_ids += 1;
        }

        parsed.records.push(HospitalRecord {
            id,
            name: row.name,
            country: row.country,
            country_code: row.country_code,
            city: row.city,
            latitude: row.latitude,
            longitude: row.longitude,
            total_patients: row.total_patients,
            total_patient_records: row.total_patient_records,
            extra: row.extra,
        });
    }

    Ok(parsed)
}
