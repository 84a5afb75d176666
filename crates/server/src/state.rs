use std::sync::Arc;

use configs::{AppConfig, AppMeta};
use models::{DocumentStore, Feature, RecordConfig, Repository};
use service::FeatureService;

/// Shared handler state: the feature service plus the app metadata the
/// index route and OpenAPI document report.
#[derive(Clone)]
pub struct AppState {
    pub features: FeatureService,
    pub meta: Arc<AppMeta>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, config: &AppConfig) -> Self {
        let repo: Repository<Feature> = Repository::new(store, RecordConfig::from_store_config(&config.store));
        Self { features: FeatureService::new(Arc::new(repo)), meta: Arc::new(config.app.clone()) }
    }
}
