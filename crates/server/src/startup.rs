use std::net::SocketAddr;

use axum::Router;
use configs::AppConfig;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::StartupError;
use crate::routes;
use crate::state::AppState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Connect the configured document store and wire the handler state.
pub async fn build_state(config: &AppConfig) -> Result<AppState, StartupError> {
    let store = models::store::connect(&config.store)
        .await
        .map_err(|e| StartupError::Store(e.to_string()))?;
    info!(
        event = "store_ready",
        backend = ?config.store.backend,
        base = %config.store.db_name,
        fetch_limit = config.store.fetch_limit,
        "document store configured"
    );
    Ok(AppState::new(store, config))
}

pub fn build_app(state: AppState) -> Router {
    routes::build_router(state, build_cors())
}

/// Public entry: build the app from an already validated config and serve it.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let state = build_state(&config).await?;
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    info!(
        %addr,
        env = config.operating_env().as_str(),
        root_path = %config.app.root_path,
        "starting {} server",
        config.app.title
    );
    axum::serve(listener, app).await?;
    Ok(())
}
