//! HTTP router and server bootstrap.

use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::service::TodoService;

use super::tasks;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub todos: TodoService,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let todos = TodoService::from_config(&config);
        Self { config, todos }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .nest("/api/tasks", tasks::routes())
        .nest("/api/categories", tasks::category_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = config.bind_addr();
    let state = Arc::new(AppState::new(config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub enrichment: bool,
}

/// GET /api/health
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        enrichment: state.config.enrichment_enabled(),
    })
}
