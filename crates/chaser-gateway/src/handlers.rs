// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the trigger REST API.
//!
//! Handles GET /health plus the authenticated POST /v1/queue/run,
//! /v1/scorer/run, /v1/jobs/cleanup, and /v1/followups endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::error;

use chaser_core::ChaserError;
use chaser_engine::{intake, maintenance, scorer, FollowupRequest};

use crate::server::GatewayState;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Map an engine error onto an HTTP response.
pub(crate) fn error_response(e: ChaserError) -> Response {
    let status = match &e {
        ChaserError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(error = %e, "request failed");
    }
    (status, Json(ErrorResponse { error: e.to_string() })).into_response()
}

/// GET /health (public).
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// POST /v1/queue/run: run one processor batch.
pub async fn post_queue_run(State(state): State<GatewayState>) -> Response {
    match state.processor.run_batch(Utc::now()).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /v1/scorer/run: run one scorer pass.
pub async fn post_scorer_run(State(state): State<GatewayState>) -> Response {
    match scorer::run_scorer(&state.db, &state.config.scorer, Utc::now()).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /v1/jobs/cleanup: prune dedupe rows and recover stale claims.
pub async fn post_jobs_cleanup(State(state): State<GatewayState>) -> Response {
    match maintenance::run_cleanup(&state.db, &state.config.webhooks, Utc::now()).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /v1/followups: schedule a followup.
pub async fn post_followups(
    State(state): State<GatewayState>,
    Json(request): Json<FollowupRequest>,
) -> Response {
    match intake::schedule_followup(
        &state.db,
        &state.config.engine,
        &state.config.queue,
        request,
        Utc::now(),
    )
    .await
    {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(e) => error_response(e),
    }
}
