use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use models::record::DEFAULT_FETCH_LIMIT;
use models::{Category, Feature, FeatureCollection};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use service::{FeatureFilter, PageRequest, ServiceError, SortField};
use tracing::info;

use crate::errors::JsonApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Maximum number of features to return.
    pub limit: Option<usize>,
    /// Skip this many features after sorting; switches to a paginated envelope.
    pub offset: Option<usize>,
    /// `key`, `name`, `category` or `version`; switches to a paginated envelope.
    pub order_by: Option<String>,
    pub desc: Option<bool>,
    /// `Reefer`, `Tobacco` or `Other`.
    pub category: Option<String>,
    pub name_prefix: Option<String>,
}

impl ListParams {
    fn filter(&self) -> Result<FeatureFilter, ServiceError> {
        let category = self
            .category
            .as_deref()
            .map(str::parse::<Category>)
            .transpose()
            .map_err(ServiceError::from)?;
        Ok(FeatureFilter { category, name_prefix: self.name_prefix.clone() })
    }

    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_FETCH_LIMIT)
    }

    fn page_request(&self) -> Result<Option<PageRequest>, ServiceError> {
        if self.offset.is_none() && self.order_by.is_none() {
            return Ok(None);
        }
        let order_by = match self.order_by.as_deref() {
            Some(s) => s.parse::<SortField>()?,
            None => SortField::default(),
        };
        Ok(Some(PageRequest {
            limit: self.limit(),
            offset: self.offset.unwrap_or(0),
            order_by,
            descending: self.desc.unwrap_or(false),
        }))
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct BatchDeleteRequest {
    pub keys: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct BatchDeleteResponse {
    pub deleted: usize,
}

#[utoipa::path(
    get, path = "/features", tag = "features",
    params(ListParams),
    responses(
        (status = 200, description = "Features, or a paginated envelope when offset/order_by is given", body = [crate::openapi::FeatureDoc]),
        (status = 400, description = "Bad query parameters", body = crate::openapi::ErrorDoc),
        (status = 404, description = "No features stored", body = crate::openapi::ErrorDoc),
        (status = 503, description = "Document store unavailable", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Response, JsonApiError> {
    let Query(params) = params?;
    let query = params.filter()?.to_query();

    if let Some(req) = params.page_request()? {
        let page = state.features.page(query.as_ref(), req).await?;
        info!(event = "features_paged", returned = page.items.len(), total_fetched = page.total_fetched);
        return Ok(Json(page).into_response());
    }

    let features = state.features.list(query.as_ref(), params.limit()).await?;
    info!(event = "features_listed", count = features.len());
    Ok(Json(features).into_response())
}

#[utoipa::path(
    get, path = "/features/collection", tag = "features",
    params(ListParams),
    responses(
        (status = 200, description = "GeoJSON FeatureCollection", body = crate::openapi::FeatureCollectionDoc),
        (status = 503, description = "Document store unavailable", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn collection(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<FeatureCollection>, JsonApiError> {
    let Query(params) = params?;
    let query = params.filter()?.to_query();
    let fc = state.features.collection(query.as_ref(), params.limit()).await?;
    Ok(Json(fc))
}

#[utoipa::path(
    get, path = "/features/{key}", tag = "features",
    params(("key" = String, Path, description = "Feature key")),
    responses(
        (status = 200, description = "OK", body = crate::openapi::FeatureDoc),
        (status = 404, description = "Not Found", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn get(State(state): State<AppState>, Path(key): Path<String>) -> Result<Json<Feature>, JsonApiError> {
    Ok(Json(state.features.find(&key).await?))
}

#[utoipa::path(
    post, path = "/features", tag = "features",
    request_body = crate::openapi::FeatureDoc,
    responses(
        (status = 201, description = "Created", body = crate::openapi::FeatureDoc),
        (status = 400, description = "Validation Error", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<Feature>, JsonRejection>,
) -> Result<(StatusCode, Json<Feature>), JsonApiError> {
    let Json(feature) = payload?;
    let created = state.features.create(feature).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    patch, path = "/features/{key}", tag = "features",
    params(("key" = String, Path, description = "Feature key")),
    request_body = crate::openapi::FeaturePatchDoc,
    responses(
        (status = 200, description = "Updated", body = crate::openapi::FeatureDoc),
        (status = 400, description = "Validation Error", body = crate::openapi::ErrorDoc),
        (status = 404, description = "Not Found", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn update(
    State(state): State<AppState>,
    Path(key): Path<String>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Feature>, JsonApiError> {
    let Json(fields) = payload?;
    Ok(Json(state.features.update(&key, fields).await?))
}

#[utoipa::path(
    delete, path = "/features/{key}", tag = "features",
    params(("key" = String, Path, description = "Feature key")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Not Found", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn delete(State(state): State<AppState>, Path(key): Path<String>) -> Result<Json<&'static str>, JsonApiError> {
    state.features.delete(&key).await?;
    Ok(Json("OK"))
}

#[utoipa::path(
    post, path = "/features/batch-delete", tag = "features",
    request_body = BatchDeleteRequest,
    responses(
        (status = 200, description = "Deleted", body = BatchDeleteResponse),
        (status = 404, description = "A key was not found; nothing deleted", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn batch_delete(
    State(state): State<AppState>,
    payload: Result<Json<BatchDeleteRequest>, JsonRejection>,
) -> Result<Json<BatchDeleteResponse>, JsonApiError> {
    let Json(req) = payload?;
    let deleted = state.features.delete_many(&req.keys).await?;
    Ok(Json(BatchDeleteResponse { deleted }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_listing_without_window_params() {
        let p = ListParams { limit: Some(5), ..Default::default() };
        assert!(p.page_request().unwrap().is_none());
        assert_eq!(p.limit(), 5);
        assert_eq!(ListParams::default().limit(), DEFAULT_FETCH_LIMIT);
    }

    #[test]
    fn order_by_switches_to_paging() {
        let p = ListParams { order_by: Some("name".into()), desc: Some(true), ..Default::default() };
        let req = p.page_request().unwrap().unwrap();
        assert_eq!(req.order_by, SortField::Name);
        assert!(req.descending);
        assert_eq!(req.offset, 0);
    }

    #[test]
    fn unknown_category_is_rejected() {
        let p = ListParams { category: Some("Beer".into()), ..Default::default() };
        assert!(matches!(p.filter(), Err(ServiceError::Validation(_))));
    }
}
