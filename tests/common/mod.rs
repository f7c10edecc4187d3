//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use reagent_stock::config::{Config, DatabaseConfig, ServerConfig};
use reagent_stock::models::{Reagent, RecordInboundInput, RecordOutboundInput, RegisterReagentInput};
use reagent_stock::services::CatalogService;
use reagent_stock::AppState;

/// Fresh in-memory database with the schema applied.
///
/// A single connection keeps every test hermetic; the outbound guard is a
/// single statement, so correctness does not depend on the pool size.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}

pub fn test_state(pool: SqlitePool) -> AppState {
    AppState {
        db: pool,
        config: Arc::new(Config {
            environment: "test".to_string(),
            server: ServerConfig {
                port: 0,
                host: "127.0.0.1".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
                min_connections: 1,
            },
        }),
    }
}

pub async fn register(
    pool: &SqlitePool,
    name: &str,
    spec: &str,
    min_stock: Option<i64>,
) -> Reagent {
    CatalogService::new(pool.clone())
        .register_reagent(RegisterReagentInput {
            name: name.to_string(),
            spec: spec.to_string(),
            category: None,
            min_stock,
        })
        .await
        .expect("register reagent")
}

pub fn inbound(reagent_id: i64, quantity: i64) -> RecordInboundInput {
    RecordInboundInput {
        reagent_id,
        quantity,
        batch_number: None,
        expiry_date: None,
        supplier: None,
        operator: None,
        note: None,
    }
}

pub fn inbound_batch(reagent_id: i64, quantity: i64, batch: &str) -> RecordInboundInput {
    RecordInboundInput {
        reagent_id,
        quantity,
        batch_number: Some(batch.to_string()),
        expiry_date: None,
        supplier: None,
        operator: None,
        note: None,
    }
}

pub fn outbound(reagent_id: i64, quantity: i64) -> RecordOutboundInput {
    RecordOutboundInput {
        reagent_id,
        quantity,
        operator: None,
        note: None,
    }
}
