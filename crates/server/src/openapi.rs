use serde::Serialize;
use utoipa::openapi::server::Server;
use utoipa::OpenApi;
use utoipa::ToSchema;
use utoipa_swagger_ui::SwaggerUi;

use crate::routes::features::{BatchDeleteRequest, BatchDeleteResponse};

#[derive(Serialize, ToSchema)]
pub enum CategoryDoc {
    Reefer,
    Tobacco,
    Other,
}

#[derive(Serialize, ToSchema)]
pub struct PointDoc {
    /// Always `Point`.
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: Vec<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct PropsDoc {
    pub name: String,
    pub category: CategoryDoc,
    pub description: Option<String>,
    pub version: u64,
}

#[derive(Serialize, ToSchema)]
pub struct FeatureDoc {
    /// Generated when omitted on create.
    pub key: Option<String>,
    /// Always `Feature`.
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: PointDoc,
    pub properties: PropsDoc,
}

/// Any subset of a feature; nested objects merge and `null` clears a field.
#[derive(Serialize, ToSchema)]
pub struct FeaturePatchDoc {
    pub geometry: Option<PointDoc>,
    pub properties: Option<PropsDoc>,
}

#[derive(Serialize, ToSchema)]
pub struct FeatureCollectionDoc {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<FeatureDoc>,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorDoc {
    pub error: String,
    pub detail: Option<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::features::list,
        crate::routes::features::collection,
        crate::routes::features::get,
        crate::routes::features::create,
        crate::routes::features::update,
        crate::routes::features::delete,
        crate::routes::features::batch_delete,
    ),
    components(
        schemas(
            CategoryDoc,
            PointDoc,
            PropsDoc,
            FeatureDoc,
            FeaturePatchDoc,
            FeatureCollectionDoc,
            ErrorDoc,
            BatchDeleteRequest,
            BatchDeleteResponse,
        )
    ),
    tags(
        (name = "features")
    )
)]
pub struct ApiDoc;

/// OpenAPI document for the feature routes mounted under `root_path`.
pub fn document(meta: &configs::AppMeta) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = meta.title.clone();
    doc.info.version = meta.version.clone();
    doc.info.description = Some(meta.description.clone());
    if !meta.root_path.is_empty() {
        doc.servers = Some(vec![Server::new(meta.root_path.clone())]);
    }
    doc
}

pub fn swagger_ui(meta: &configs::AppMeta) -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", document(meta))
}
