use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};

async fn root() -> Json<Value> {
    tracing::info!("Root endpoint accessed");
    Json(json!({
        "message": "Cortex Agent API",
        "status": "running"
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn routes() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}
