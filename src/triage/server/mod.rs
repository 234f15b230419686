// SPDX-License-Identifier: MIT

//! HTTP surface over a shared attendant workflow

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::triage::workflow::AttendantWorkflow;

pub fn router(workflow: Arc<AttendantWorkflow>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/invoke", post(invoke))
        .with_state(workflow)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(
    workflow: Arc<AttendantWorkflow>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(workflow);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
pub struct InvokeRequest {
    query: String,
}

async fn invoke(
    State(workflow): State<Arc<AttendantWorkflow>>,
    Json(payload): Json<InvokeRequest>,
) -> (StatusCode, Json<Value>) {
    let query = payload.query.trim();
    if query.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "query must not be empty" })),
        );
    }

    match workflow.invoke(query).await {
        Ok(response) => match serde_json::to_value(&response) {
            Ok(body) => (StatusCode::OK, Json(body)),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            ),
        },
        Err(e) => {
            log::error!("Invocation failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("Execution failed: {}", e) })),
            )
        }
    }
}
