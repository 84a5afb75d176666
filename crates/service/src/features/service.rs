use std::sync::Arc;

use models::record::Repository;
use models::{Feature, FeatureCollection, Page, Query, Record};
use serde_json::{Map, Value};
use tracing::{info, instrument};

use crate::errors::ServiceError;
use crate::pagination::{PageRequest, SortField};

/// Application service encapsulating feature business rules on top of the
/// generic record repository.
#[derive(Clone)]
pub struct FeatureService {
    repo: Arc<Repository<Feature>>,
}

impl FeatureService {
    pub fn new(repo: Arc<Repository<Feature>>) -> Self {
        Self { repo }
    }

    /// Features matching `query`. An empty result is `NotFound`.
    #[instrument(skip(self, query), fields(filtered = query.is_some()))]
    pub async fn list(&self, query: Option<&Query>, limit: usize) -> Result<Vec<Feature>, ServiceError> {
        let features = self.repo.fetch(query, limit).await?;
        if features.is_empty() {
            return Err(ServiceError::not_found("features"));
        }
        Ok(features)
    }

    /// One sorted window over the matching features.
    #[instrument(skip(self, query), fields(limit = req.limit, offset = req.offset))]
    pub async fn page(&self, query: Option<&Query>, req: PageRequest) -> Result<Page<Feature>, ServiceError> {
        let PageRequest { limit, offset, order_by, descending } = req.normalize();
        let page = match order_by {
            SortField::Key => {
                self.repo.paginate(query, limit, offset, |f: &Feature| f.key().to_string(), descending).await?
            }
            SortField::Name => {
                self.repo.paginate(query, limit, offset, |f: &Feature| f.properties.name.clone(), descending).await?
            }
            SortField::Category => {
                self.repo.paginate(query, limit, offset, |f: &Feature| f.properties.category, descending).await?
            }
            SortField::Version => {
                self.repo.paginate(query, limit, offset, |f: &Feature| f.version(), descending).await?
            }
        };
        Ok(page)
    }

    /// Matching features wrapped as a GeoJSON collection; may be empty.
    pub async fn collection(&self, query: Option<&Query>, limit: usize) -> Result<FeatureCollection, ServiceError> {
        let features = self.repo.fetch(query, limit).await?;
        Ok(FeatureCollection::from(features))
    }

    pub async fn find(&self, key: &str) -> Result<Feature, ServiceError> {
        Ok(self.repo.get(key).await?)
    }

    /// Validate and store a new feature. An existing key is overwritten.
    #[instrument(skip(self, feature), fields(key = %feature.key))]
    pub async fn create(&self, mut feature: Feature) -> Result<Feature, ServiceError> {
        let stored = self.repo.save(&mut feature).await?;
        info!(event = "feature_created", key = %stored.key(), version = stored.version());
        Ok(stored)
    }

    /// Merge `fields` into the stored feature under `key`.
    #[instrument(skip(self, fields))]
    pub async fn update(&self, key: &str, fields: Map<String, Value>) -> Result<Feature, ServiceError> {
        let current = self.repo.get(key).await?;
        let updated = self.repo.update(&current, fields).await?;
        info!(event = "feature_updated", key = %updated.key(), version = updated.version());
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let doomed = self.repo.get(key).await?;
        self.repo.delete(&doomed).await?;
        info!(event = "feature_deleted", key = %key);
        Ok(())
    }

    /// Delete every feature in `keys`. All keys must exist before anything
    /// is deleted; the deletes then run in order and stop at the first
    /// failure. Returns how many distinct features were deleted.
    #[instrument(skip(self, keys), fields(count = keys.len()))]
    pub async fn delete_many(&self, keys: &[String]) -> Result<usize, ServiceError> {
        let mut doomed: Vec<Feature> = Vec::with_capacity(keys.len());
        for key in keys {
            if doomed.iter().any(|f| f.key() == key) {
                continue;
            }
            doomed.push(self.repo.get(key).await?);
        }
        self.repo.delete_many(&doomed).await?;
        info!(event = "features_deleted", deleted = doomed.len());
        Ok(doomed.len())
    }
}
