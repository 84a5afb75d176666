//! Service layer providing business-oriented CRUD operations on top of models.
//! - Separates business rules (empty listings, existence checks) from data access.
//! - Reuses validation and record definitions in the `models` crate.
//!
//! ```
//! use std::sync::Arc;
//! use models::{store::LocalStore, Category, Feature, RecordConfig, Repository};
//! use service::FeatureService;
//!
//! let repo = Repository::new(Arc::new(LocalStore::in_memory()), RecordConfig::new("features", 25));
//! let svc = FeatureService::new(Arc::new(repo));
//! let saved = tokio_test::block_on(svc.create(Feature::new("Pier", Category::Reefer, 4.4, 51.9))).unwrap();
//! assert_eq!(saved.properties.version, 1);
//! ```

pub mod errors;
pub mod features;
pub mod pagination;

pub use errors::ServiceError;
pub use features::{FeatureFilter, FeatureService};
pub use pagination::{PageRequest, SortField};
