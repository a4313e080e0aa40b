// Copyright 2025 Pubdex (https://github.com/pubdex)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP transport: `POST /rpc` plus liveness/readiness probes.

use crate::rpc::RpcPipeline;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pubdex_core::RegistryError;
use pubdex_registry::RegistryApi;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RpcPipeline>,
    pub registry: Arc<dyn RegistryApi>,
    pub cancel: CancellationToken,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/rpc", post(handle_rpc))
        .route("/health/live", get(handle_live))
        .route("/health/ready", get(handle_ready))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(
    addr: SocketAddr,
    state: AppState,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http transport ready");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;
    Ok(())
}

/// `POST /rpc`: 400 for an empty body, 204 when the payload was all
/// notifications (or an empty batch response), 200 with the JSON body
/// otherwise.
async fn handle_rpc(State(state): State<AppState>, body: Bytes) -> Response {
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "empty request body").into_response();
    }
    match state.pipeline.handle_payload(&body, &state.cancel).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// `GET /health/live`: 200 while the process serves.
async fn handle_live() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "live",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
        .into_response()
}

/// `GET /health/ready`: probe the upstream search endpoint. A rate-limit
/// answer still proves the upstream alive and reports as degraded.
async fn handle_ready(State(state): State<AppState>) -> Response {
    match state.registry.probe(&state.cancel).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "ready" }))).into_response(),
        Err(RegistryError::RateLimited(detail)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "degraded", "detail": detail })),
        )
            .into_response(),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "unavailable", "detail": err.to_string() })),
        )
            .into_response(),
    }
}
