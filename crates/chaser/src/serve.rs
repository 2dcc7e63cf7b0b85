// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command implementations: `serve`, `run-queue`, and `score`.
//!
//! All three share the same wiring: open the database, build the delivery
//! stack from config, and either serve the gateway or run one pass.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use chaser_config::model::ChaserConfig;
use chaser_core::ChaserError;
use chaser_delivery::{Deliverer, HttpEmailTransport};
use chaser_engine::{scorer, QueueProcessor};
use chaser_gateway::{start_server, GatewayState};
use chaser_storage::Database;

/// Open the database and build the queue processor from config.
async fn build_processor(
    config: &ChaserConfig,
) -> Result<(Arc<Database>, Arc<QueueProcessor>), ChaserError> {
    let db = Arc::new(
        Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?,
    );

    let transport = HttpEmailTransport::new(&config.delivery).map_err(|e| {
        ChaserError::Delivery { message: e.to_string(), source: Some(Box::new(e)) }
    })?;
    let deliverer = Deliverer::new(
        Arc::new(transport),
        config.delivery.business_name.clone(),
        config.delivery.open_tracking,
        config.delivery.click_tracking,
    );
    let processor = Arc::new(QueueProcessor::new(
        db.clone(),
        deliverer,
        config.queue.clone(),
    ));
    Ok((db, processor))
}

/// Runs the `chaser serve` command: the gateway until shutdown.
pub async fn run_serve(config: ChaserConfig) -> Result<(), ChaserError> {
    info!("starting chaser serve");
    let (db, processor) = build_processor(&config).await?;
    let state = GatewayState::new(db, processor, Arc::new(config));
    start_server(state).await
}

/// Runs one queue batch and prints the summary as JSON.
pub async fn run_queue_once(config: ChaserConfig) -> Result<(), ChaserError> {
    let (db, processor) = build_processor(&config).await?;
    let summary = processor.run_batch(Utc::now()).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&summary)
            .map_err(|e| ChaserError::Internal(e.to_string()))?
    );
    drop(processor);
    Arc::into_inner(db)
        .ok_or_else(|| ChaserError::Internal("database handle still in use".into()))?
        .close()
        .await
}

/// Runs one scorer pass and prints the summary as JSON.
pub async fn run_scorer_once(config: ChaserConfig) -> Result<(), ChaserError> {
    let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;
    let summary = scorer::run_scorer(&db, &config.scorer, Utc::now()).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&summary)
            .map_err(|e| ChaserError::Internal(e.to_string()))?
    );
    db.close().await
}
