//! Audit trail
//!
//! Records who changed which inventory entity, when, from where, and
//! optionally which fields changed. Records are append-only.
//!
//! # Architecture
//!
//! - [`models`]: the record, its enums and the query filter
//! - [`store`]: the [`AuditStore`] trait and its PostgreSQL implementation
//! - [`memory`]: an in-process [`AuditStore`]
//! - [`diff`]: field-level before/after computation
//! - [`policy`]: per-route declarations of what to audit
//! - [`capture`]: the success-only, fire-and-forget capture pipeline
//! - [`middleware`]: the tower layer that drives the pipeline for HTTP routes
//! - [`service`]: explicit logging and history lookups for business code
//!
//! Audit writes never affect the outcome of the operation being audited.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use axum::Router;
//! use sqlx::PgPool;
//! use shelf_server::audit::{AuditCapture, AuditLayer, PgAuditStore, PolicyRegistry};
//!
//! # async fn example(pool: PgPool) {
//! let capture = AuditCapture::new(Arc::new(PgAuditStore::new(pool)));
//! let app: Router = Router::new()
//!     .layer(AuditLayer::new(capture, PolicyRegistry::inventory_defaults()));
//! # }
//! ```

pub mod capture;
pub mod diff;
pub mod memory;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod service;
pub mod store;

pub use capture::{
    resolve_entity_id, AuditCapture, AuditContext, AuditRequest, AuthenticatedActor,
    EntityIdResolution,
};
pub use diff::{compute_changes, snapshot_of};
pub use memory::MemoryAuditStore;
pub use middleware::AuditLayer;
pub use models::{
    AuditAction, AuditChanges, AuditLogFilter, AuditRecord, EntityType, NewAuditRecord,
    NewAuditRecordBuilder, Snapshot, UnknownVariant,
};
pub use policy::{AuditPolicy, EntityIdSource, OperationId, PolicyRegistry};
pub use service::{AuditService, LogAuditParams, LogBulkAuditParams, LogChangeParams};
pub use store::{AuditStore, AuditStoreError, PgAuditStore};
