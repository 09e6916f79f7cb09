//! Feature modules implementing the Shelf API
//!
//! Each feature is a vertical slice:
//! - `queries/` - Read operations, one file per query with its own error type
//! - `routes.rs` - HTTP route definitions and error-to-response mapping
//!
//! # Features
//!
//! - **audit_logs**: Read access to the audit trail

pub mod audit_logs;

use axum::Router;

use crate::audit::AuditService;

/// Creates the API router with all feature routes mounted
///
/// - `/audit-logs` - Audit trail queries
pub fn router(audit: AuditService) -> Router<()> {
    Router::new().nest("/audit-logs", audit_logs::audit_logs_routes().with_state(audit))
}
