pub mod filter;
pub mod service;

pub use filter::FeatureFilter;
pub use service::FeatureService;
