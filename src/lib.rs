pub mod cache;
pub mod config;
pub mod engine;
pub mod logging;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::engine::EngineConfig;
use crate::state::AppState;
use crate::store::{seed, InMemoryStore, StoreError};

/// Loads the configured snapshot, or the demo data when none is set.
/// A snapshot whose curricula fail validation is refused outright.
pub fn load_store(config: &Config) -> Result<InMemoryStore, StoreError> {
    match &config.snapshot_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading progress snapshot");
            InMemoryStore::from_path(path)
        }
        None => {
            tracing::info!("no SNAPSHOT_PATH set, serving demo snapshot");
            InMemoryStore::from_snapshot(seed::demo_snapshot())
        }
    }
}

pub fn create_app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub fn create_demo_app() -> Result<axum::Router, StoreError> {
    let store = InMemoryStore::from_snapshot(seed::demo_snapshot())?;
    let state = AppState::from_store(Arc::new(store), EngineConfig::default());
    Ok(create_app(state))
}
