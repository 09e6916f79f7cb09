//! Application assembly
//!
//! Builds the full router: health check, feature routes under `/api/v1`,
//! and the middleware stack shared by every route, audit capture included.

pub mod response;

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower_http::compression::CompressionLayer;

use crate::audit::{AuditCapture, AuditLayer, AuditService, AuditStore, PolicyRegistry};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::{features, middleware};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub audit_store: Arc<dyn AuditStore>,
    pub policies: PolicyRegistry,
}

/// Build the application router
///
/// `business_routes` are the inventory resource routes; they are merged in
/// before the audit layer is applied so their mutating requests are captured
/// according to `state.policies`.
pub fn router(state: AppState, config: &Config, business_routes: Router) -> Router {
    let service = AuditService::new(Arc::clone(&state.audit_store));
    let capture = AuditCapture::new(Arc::clone(&state.audit_store));

    Router::new()
        .route("/health", get(health_check))
        .with_state(state.db)
        .nest("/api/v1", features::router(service))
        .merge(business_routes)
        // Apply layers from innermost to outermost
        .layer(
            AuditLayer::new(capture, state.policies).enabled(config.audit.capture_enabled),
        )
        .layer(axum::middleware::from_fn(middleware::identify_actor))
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Health check handler
async fn health_check(State(db): State<PgPool>) -> AppResult<Json<Value>> {
    match sqlx::query("SELECT 1").execute(&db).await {
        Ok(_) => Ok(Json(json!({
            "status": "healthy",
            "database": "connected"
        }))),
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            Err(AppError::Unavailable("Database is unreachable".to_string()))
        },
    }
}
