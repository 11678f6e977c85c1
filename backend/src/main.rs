use axum::{http::Method, routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod database;
mod error;
mod handlers;
mod pagination;
mod workflows;

use config::StorageBackend;
use workflows::{LoggingDispatcher, MemoryRepository, WorkflowRepository, WorkflowRuleStore};

#[cfg(test)]
mod tests;

pub struct AppState {
    pub store: WorkflowRuleStore,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { "Assistant Workflow API v0.1.0" }))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1/workflows", handlers::workflow_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

async fn open_repository(backend: StorageBackend) -> anyhow::Result<Arc<dyn WorkflowRepository>> {
    let repository: Arc<dyn WorkflowRepository> = match backend {
        StorageBackend::Postgres(url) => Arc::new(database::connect_repository(&url).await?),
        StorageBackend::SnapshotFile(path) => Arc::new(MemoryRepository::with_snapshot_file(path).await?),
        StorageBackend::Memory => {
            tracing::warn!("No DATABASE_URL or WORKFLOW_SNAPSHOT_PATH set; rules will not survive a restart");
            Arc::new(MemoryRepository::new())
        }
    };
    Ok(repository)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env()?;
    let repository = open_repository(config.storage_backend()).await?;

    let store = WorkflowRuleStore::new(repository, Arc::new(LoggingDispatcher));
    let app = build_router(Arc::new(AppState { store }));

    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;
    tracing::info!("Server running on {}", config.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
