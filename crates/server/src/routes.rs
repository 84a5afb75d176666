pub mod features;

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::{Health, Welcome};

use crate::openapi;
use crate::state::AppState;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn index(State(state): State<AppState>) -> Json<Welcome> {
    Json(Welcome { message: format!("Welcome to the {} API!", state.meta.title) })
}

async fn metrics() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], common::metrics::render())
}

/// Build the full application router: index, health and metrics at the top
/// level, feature routes under the configured root path, plus API docs.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let meta = state.meta.clone();

    let feature_routes = Router::new()
        .route("/features", get(features::list).post(features::create))
        .route("/features/collection", get(features::collection))
        .route("/features/batch-delete", post(features::batch_delete))
        .route(
            "/features/:key",
            get(features::get).patch(features::update).delete(features::delete),
        );

    let api = if meta.root_path.is_empty() {
        feature_routes
    } else {
        Router::new().nest(&meta.root_path, feature_routes)
    };

    let public = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/metrics", get(metrics));

    public
        .merge(api)
        .with_state(state)
        .merge(openapi::swagger_ui(&meta))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
