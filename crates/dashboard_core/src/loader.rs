use std::{cell::RefCell, rc::Rc};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use shared::{
    domain::{
        find_hospital, HospitalCollection, HospitalId, HospitalRecord, COLUMN_CITY,
        COLUMN_COUNTRY, COLUMN_COUNTRY_CODE, COLUMN_HOSPITAL_ID, COLUMN_HOSPITAL_NAME,
        COLUMN_LATITUDE, COLUMN_LONGITUDE, COLUMN_TOTAL_PATIENTS, COLUMN_TOTAL_PATIENT_RECORDS,
    },
    error::DashboardError,
    geo::{Feature, FeatureCollection},
    protocol::DashboardEvent,
};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    csv::{parse_hospitals, CsvError, ParsedHospitals},
    source::HospitalSource,
    store::EventBus,
};

pub const LOAD_FAILURE_MESSAGE: &str =
    "Failed to load hospital data. Please check your internet connection and try again.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error("failed to read hospital table: {0}")]
    Io(String),
    #[error(transparent)]
    Format(#[from] CsvError),
}

impl LoadError {
    /// Text shown to the user next to the retry action.
    pub fn user_message(&self) -> String {
        match self {
            LoadError::Format(err) => {
                format!("Hospital data could not be read ({err}). Please try again later.")
            }
            _ => LOAD_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl From<LoadError> for DashboardError {
    fn from(value: LoadError) -> Self {
        DashboardError::LoadFailure(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub count: usize,
    pub defaulted_fields: usize,
    pub skipped_rows: usize,
    pub duplicate_ids: usize,
    pub loaded_at: DateTime<Utc>,
}

/// Fetches the hospital table, owns the parsed collection and announces
/// every load outcome on the bus.
pub struct DataLoader {
    bus: Rc<EventBus>,
    source: Box<dyn HospitalSource>,
    hospitals: RefCell<HospitalCollection>,
}

impl DataLoader {
    pub fn new(bus: Rc<EventBus>, source: Box<dyn HospitalSource>) -> Self {
        Self {
            bus,
            source,
            hospitals: RefCell::new(HospitalCollection::from(Vec::new())),
        }
    }

    /// Runs one fetch and publishes exactly one of `DataLoaded` or
    /// `DataLoadError`. A failure keeps the previous collection.
    pub async fn load(&self) -> Result<LoadSummary, LoadError> {
        info!(source = %self.source.describe(), "loading hospital data");

        let parsed = match self.fetch_and_parse().await {
            Ok(parsed) => parsed,
            Err(err) => {
                error!(
                    source = %self.source.describe(),
                    error = %err,
                    "hospital data load failed"
                );
                self.bus.publish(DashboardEvent::DataLoadError {
                    error: err.to_string(),
                    message: err.user_message(),
                });
                return Err(err);
            }
        };

        let summary = LoadSummary {
            count: parsed.records.len(),
            defaulted_fields: parsed.fallbacks.len(),
            skipped_rows: parsed.skipped_rows,
            duplicate_ids: parsed.duplicate_ids,
            loaded_at: Utc::now(),
        };
        if summary.defaulted_fields > 0 || summary.skipped_rows > 0 || summary.duplicate_ids > 0 {
            warn!(
                defaulted_fields = summary.defaulted_fields,
                skipped_rows = summary.skipped_rows,
                duplicate_ids = summary.duplicate_ids,
                "hospital table had unreadable cells"
            );
        }

        let hospitals = HospitalCollection::from(parsed.records);
        *self.hospitals.borrow_mut() = HospitalCollection::clone(&hospitals);
        info!(count = summary.count, "hospital data loaded");

        self.bus.publish(DashboardEvent::DataLoaded {
            count: hospitals.len(),
            hospitals,
        });
        Ok(summary)
    }

    async fn fetch_and_parse(&self) -> Result<ParsedHospitals, LoadError> {
        let text = self.source.fetch().await?;
        Ok(parse_hospitals(&text)?)
    }

    pub fn hospitals(&self) -> HospitalCollection {
        HospitalCollection::clone(&self.hospitals.borrow())
    }

    pub fn hospital_count(&self) -> usize {
        self.hospitals.borrow().len()
    }

    pub fn find(&self, raw_id: &str) -> Option<HospitalRecord> {
        let id = HospitalId::normalize(raw_id)?;
        find_hospital(&self.hospitals.borrow(), &id).cloned()
    }

    pub fn to_geojson(&self) -> FeatureCollection {
        hospitals_to_geojson(&self.hospitals.borrow())
    }
}

/// Point feature per hospital at `[longitude, latitude]`, every record field
/// copied into the properties.
pub fn hospitals_to_geojson(hospitals: &[HospitalRecord]) -> FeatureCollection {
    FeatureCollection {
        features: hospitals
            .iter()
            .map(|hospital| {
                Feature::point(
                    hospital.longitude,
                    hospital.latitude,
                    hospital_properties(hospital),
                )
            })
            .collect(),
    }
}

fn hospital_properties(hospital: &HospitalRecord) -> Map<String, Value> {
    let mut properties: Map<String, Value> = hospital
        .extra
        .iter()
        .map(|(key, value)| (key.clone(), Value::from(value.as_str())))
        .collect();

    properties.insert(COLUMN_HOSPITAL_ID.into(), Value::from(hospital.id.as_str()));
    properties.insert(COLUMN_HOSPITAL_NAME.into(), Value::from(hospital.name.as_str()));
    properties.insert(COLUMN_COUNTRY.into(), Value::from(hospital.country.as_str()));
    properties.insert(
        COLUMN_COUNTRY_CODE.into(),
        Value::from(hospital.country_code.as_str()),
    );
    properties.insert(COLUMN_CITY.into(), Value::from(hospital.city.as_str()));
    properties.insert(COLUMN_LATITUDE.into(), Value::from(hospital.latitude));
    properties.insert(COLUMN_LONGITUDE.into(), Value::from(hospital.longitude));
    properties.insert(COLUMN_TOTAL_PATIENTS.into(), Value::from(hospital.total_patients));
    properties.insert(
        COLUMN_TOTAL_PATIENT_RECORDS.into(),
        Value::from(hospital.total_patient_records),
    );
    properties
}

#[cfg(test)]
#[path = "tests/loader_tests.rs"]
mod tests;
