use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use graphite_studio::state::JsonFileStorage;
use graphite_studio::{ModelStore, StudioConfig};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

mod ai;
mod routes;

const DEFAULT_BIND: &str = "0.0.0.0:3001";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ModelStore>,
    pub api_key: Option<String>,
}

/// Settings read from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind: String,
    pub api_key: Option<String>,
    pub data_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env(studio: &StudioConfig) -> Self {
        Self::from_lookup(studio, |name| std::env::var(name).ok())
    }

    fn from_lookup(studio: &StudioConfig, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            bind: non_empty("GRAPHITE_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            api_key: non_empty("GEMINI_API_KEY"),
            data_dir: non_empty("GRAPHITE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| studio.data_dir()),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/models", get(routes::list_models))
        .route("/api/models/generate", post(routes::generate))
        .route("/api/models/{id}", get(routes::get_model))
        .route("/api/models/{id}/image", get(routes::original_image))
        .route("/api/models/{id}/select", post(routes::select_model))
        .route("/api/models/{id}/steps", get(routes::steps))
        .route("/api/models/{id}/chat", get(routes::welcome).post(routes::chat))
        .route("/api/view", get(routes::get_view).patch(routes::update_view))
        .route("/api/scene", get(routes::scene))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("server=info,graphite_studio=info")),
        )
        .init();

    let studio = StudioConfig::load();
    let config = ServerConfig::from_env(&studio);
    if config.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY not set, generation and chat will fail");
    }

    let storage = Arc::new(JsonFileStorage::new(&config.data_dir));
    let store = Arc::new(ModelStore::new(storage, Arc::new(ai::GeminiClient::new())));
    store.load_models_from_storage();
    tracing::info!("Model storage at {}", config.data_dir.display());

    let state = AppState {
        store,
        api_key: config.api_key.clone(),
    };

    let addr: SocketAddr = config.bind.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server running on http://{addr}");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
