// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. The public health route,
//! the bearer-authenticated trigger routes, and the secret-authenticated
//! webhook routes are merged into one router.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use chaser_config::model::ChaserConfig;
use chaser_core::ChaserError;
use chaser_engine::QueueProcessor;
use chaser_storage::Database;

use crate::auth::{auth_middleware, AuthConfig};
use crate::{handlers, webhooks};

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub db: Arc<Database>,
    pub processor: Arc<QueueProcessor>,
    pub config: Arc<ChaserConfig>,
    pub auth: AuthConfig,
    /// Process start time for uptime reporting.
    pub start_time: Instant,
}

impl GatewayState {
    pub fn new(db: Arc<Database>, processor: Arc<QueueProcessor>, config: Arc<ChaserConfig>) -> Self {
        let auth = AuthConfig { trigger_token: config.server.trigger_token.clone() };
        Self { db, processor, config, auth, start_time: Instant::now() }
    }
}

/// Build the full gateway router.
pub fn build_router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    // Unauthenticated public route (health for systemd and load balancers).
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    // Trigger routes behind the bearer token.
    let api_routes = Router::new()
        .route("/v1/queue/run", post(handlers::post_queue_run))
        .route("/v1/scorer/run", post(handlers::post_scorer_run))
        .route("/v1/jobs/cleanup", post(handlers::post_jobs_cleanup))
        .route("/v1/followups", post(handlers::post_followups))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state.clone());

    // Webhook routes authenticate per-request via the shared secret header.
    let webhook_routes = Router::new()
        .route("/v1/webhooks/bounce", post(webhooks::post_bounce))
        .route("/v1/webhooks/reply", post(webhooks::post_reply))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(webhook_routes)
        .layer(CorsLayer::permissive())
}

/// Bind and serve the gateway until the process exits.
pub async fn start_server(state: GatewayState) -> Result<(), ChaserError> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ChaserError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| ChaserError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
