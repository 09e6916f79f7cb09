//! Shelf Server Library
//!
//! Audit trail subsystem of the Shelf inventory backend.
//!
//! # Overview
//!
//! Every mutating inventory operation (categories, products, locations,
//! areas, inventory items, stock movements) is observed by the audit capture
//! layer. After the operation succeeds, the layer works out which entity was
//! touched and writes an audit record on a detached task. The record holds:
//!
//! - Actor id (when authenticated)
//! - Action performed (`CREATE`, `UPDATE`, `DELETE`, `STATUS_CHANGE`, `RESTORE`)
//! - Entity type and id
//! - Field-level changes, when the handler supplies them
//! - Client IP and user agent
//! - Timestamp
//!
//! Audit logging is observational: a failed audit write never fails the
//! operation, and a failed operation is never audited.
//!
//! Query the trail via `/api/v1/audit-logs`.
//!
//! ## Framework Stack
//!
//! - **Axum**: HTTP routing and extractors
//! - **SQLx**: PostgreSQL access
//! - **Tower**: Middleware and service abstractions
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use axum::Router;
//! use shelf_server::{api, audit, config::Config};
//!
//! # async fn example(pool: sqlx::PgPool) -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let state = api::AppState {
//!     db: pool.clone(),
//!     audit_store: Arc::new(audit::PgAuditStore::new(pool)),
//!     policies: audit::PolicyRegistry::inventory_defaults(),
//! };
//! let app = api::router(state, &config, Router::new());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod audit;
pub mod config;
pub mod error;
pub mod features;
pub mod middleware;
pub mod pagination;

// Re-export commonly used types
pub use error::{AppError, AppResult};
