use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// Hospital identifier in normalized form: trimmed and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct HospitalId(String);

impl HospitalId {
    /// Trims `raw` and rejects blank input. Every identifier that enters the
    /// store, a view or a lookup goes through here.
    pub fn normalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HospitalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HospitalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub const COLUMN_HOSPITAL_ID: &str = "hospital_id";
pub const COLUMN_HOSPITAL_NAME: &str = "hospital_name";
pub const COLUMN_COUNTRY: &str = "country";
pub const COLUMN_COUNTRY_CODE: &str = "country_code";
pub const COLUMN_CITY: &str = "city";
pub const COLUMN_LATITUDE: &str = "latitude";
pub const COLUMN_LONGITUDE: &str = "longitude";
pub const COLUMN_TOTAL_PATIENTS: &str = "total_patients";
pub const COLUMN_TOTAL_PATIENT_RECORDS: &str = "total_patient_records";

pub const REQUIRED_COLUMNS: [&str; 9] = [
    COLUMN_HOSPITAL_ID,
    COLUMN_HOSPITAL_NAME,
    COLUMN_COUNTRY,
    COLUMN_COUNTRY_CODE,
    COLUMN_CITY,
    COLUMN_LATITUDE,
    COLUMN_LONGITUDE,
    COLUMN_TOTAL_PATIENTS,
    COLUMN_TOTAL_PATIENT_RECORDS,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HospitalRecord {
    #[serde(rename = "hospital_id")]
    pub id: HospitalId,
    #[serde(rename = "hospital_name")]
    pub name: String,
    pub country: String,
    pub country_code: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub total_patients: f64,
    pub total_patient_records: f64,
    /// Columns the loader does not know about, keyed by trimmed header.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl HospitalRecord {
    /// "City, Country" line used by the list rows and the detail card.
    pub fn location_label(&self) -> String {
        match (self.city.is_empty(), self.country.is_empty()) {
            (false, false) => format!("{}, {}", self.city, self.country),
            (false, true) => self.city.clone(),
            (true, false) => self.country.clone(),
            (true, true) => String::new(),
        }
    }

    /// Case-insensitive substring match over name, city and country.
    /// `needle` must already be lowercased.
    pub fn matches_search(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.city.to_lowercase().contains(needle)
            || self.country.to_lowercase().contains(needle)
    }
}

/// Immutable record collection produced by one successful load.
pub type HospitalCollection = Arc<[HospitalRecord]>;

pub fn find_hospital<'a>(
    hospitals: &'a [HospitalRecord],
    id: &HospitalId,
) -> Option<&'a HospitalRecord> {
    hospitals.iter().find(|hospital| &hospital.id == id)
}

/// Screen-space coordinates in pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
