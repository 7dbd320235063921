//! State store, data loading and GeoJSON projection for the hospital map
//! dashboard.

pub mod csv;
pub mod loader;
pub mod source;
pub mod store;

pub use loader::{hospitals_to_geojson, DataLoader, LoadError, LoadSummary};
pub use source::{source_for_location, FileCsvSource, HospitalSource, HttpCsvSource};
pub use store::{EventBus, PublishReport, SubscriptionId};
