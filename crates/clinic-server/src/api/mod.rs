//! HTTP surface: router assembly, health endpoints and the server loop

pub mod response;

use std::future::Future;
use std::net::SocketAddr;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use tower_http::compression::CompressionLayer;

use crate::config::Config;
use crate::error::{AppError, ServerError, ServerResult};
use crate::features::{self, FeatureState};
use crate::middleware;

use self::response::ApiResponse;

/// Build the application router with all routes and middleware
pub fn create_router(state: FeatureState, config: &Config) -> Router {
    let feature_routes = features::router(state.clone());

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(state)
        .nest("/api/v1", feature_routes)
        // Layers apply from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Bind and serve until `shutdown` resolves
pub async fn serve<F>(app: Router, config: &Config, shutdown: F) -> ServerResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| ServerError::Config(format!("invalid bind address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Clinic Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// Store connectivity check
async fn health(State(state): State<FeatureState>) -> Result<impl IntoResponse, AppError> {
    state.appointments.ping().await.map_err(|e| {
        tracing::error!(error = %e, "Store health check failed");
        AppError::Unavailable("store unreachable".to_string())
    })?;

    Ok(ApiResponse::success(json!({
        "status": "healthy",
        "store": "connected"
    })))
}
