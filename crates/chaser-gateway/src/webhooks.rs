// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider webhook endpoints.
//!
//! Authenticated by the `x-chaser-webhook-secret` header compared to
//! `webhooks.shared_secret` (fail-closed when unset). Resolvable or not,
//! accepted events return 200 so the provider stops retrying; only a bad
//! secret yields 401.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;

use chaser_engine::{bounce, reply, BounceEvent, ReplyEvent};

use crate::handlers::error_response;
use crate::server::GatewayState;

const SECRET_HEADER: &str = "x-chaser-webhook-secret";

fn check_secret(state: &GatewayState, headers: &HeaderMap) -> Result<(), StatusCode> {
    let Some(expected) = state.config.webhooks.shared_secret.as_deref() else {
        tracing::error!("no webhook secret configured -- rejecting delivery");
        return Err(StatusCode::UNAUTHORIZED);
    };
    let presented = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if presented == Some(expected) {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

/// POST /v1/webhooks/bounce
pub async fn post_bounce(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(event): Json<BounceEvent>,
) -> Response {
    if let Err(status) = check_secret(&state, &headers) {
        return status.into_response();
    }
    match bounce::handle_bounce(&state.db, &state.config.webhooks, event, Utc::now()).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /v1/webhooks/reply
pub async fn post_reply(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(event): Json<ReplyEvent>,
) -> Response {
    if let Err(status) = check_secret(&state, &headers) {
        return status.into_response();
    }
    match reply::handle_reply(&state.db, event, Utc::now()).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(e),
    }
}
