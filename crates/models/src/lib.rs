//! Persistence layer for carto: document store clients, the generic record
//! repository and the GeoJSON feature model.

pub mod errors;
pub mod store;
pub mod record;
pub mod feature;

pub use errors::{ModelError, StoreError};
pub use feature::{Category, Feature, FeatureCollection};
pub use record::{OnMissing, Page, Record, RecordConfig, Repository};
pub use store::{query::Query, DocumentStore};

#[cfg(test)]
mod tests;
