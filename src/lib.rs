//! Vendor Performance API Library
//!
//! Vendor and purchase order stores with per-vendor delivery and quality
//! metrics recalculated on every purchase order write.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{extract::State, routing::get, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone());
        Self {
            db,
            config,
            services,
        }
    }
}

/// API v1 routes
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/vendors", handlers::vendors::vendor_routes())
        .nest(
            "/purchase_orders",
            handlers::purchase_orders::purchase_order_routes(),
        )
}

async fn banner(State(state): State<AppState>) -> String {
    format!("vendor-performance-api up ({})", state.config.environment)
}

/// Full application router: status, health, v1 API and Swagger UI, with
/// request ids and HTTP tracing applied. CORS and compression are added by
/// the binary since they depend on deployment configuration.
pub fn app_router(state: AppState) -> Router {
    Router::<AppState>::new()
        .route("/", get(banner))
        .nest("/health", health::health_routes(state.db.clone()))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
