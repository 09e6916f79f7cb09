//! Audit log API routes
//!
//! Read-only; audit records are never created or changed through HTTP.
//!
//! # Route Structure
//!
//! - `GET /api/v1/audit-logs` - Filtered, paginated listing
//! - `GET /api/v1/audit-logs/:id` - Single record
//! - `GET /api/v1/audit-logs/entity/:entity_type/:entity_id` - History of one entity
//! - `GET /api/v1/audit-logs/actor/:actor_id` - Everything one actor did

use crate::api::response::ErrorResponse;
use crate::audit::AuditService;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use super::queries::{
    ActorHistoryError, ActorHistoryQuery, EntityHistoryError, EntityHistoryQuery,
    GetAuditLogError, GetAuditLogQuery, ListAuditLogsError, ListAuditLogsQuery,
};

// ============================================================================
// Router Configuration
// ============================================================================

/// Creates the audit log router
///
/// ```rust,ignore
/// let app = Router::new()
///     .nest("/api/v1/audit-logs", audit_logs_routes())
///     .with_state(audit_service);
/// ```
pub fn audit_logs_routes() -> Router<AuditService> {
    Router::new()
        .route("/", get(list_audit_logs))
        .route("/:id", get(get_audit_log))
        .route("/entity/:entity_type/:entity_id", get(entity_history))
        .route("/actor/:actor_id", get(actor_history))
}

// ============================================================================
// Query Handlers
// ============================================================================

/// List audit logs
///
/// `GET /api/v1/audit-logs?entity_type=product&action=UPDATE&page=1&limit=20`
///
/// - `200 OK` - `{ data, meta }`
/// - `400 Bad Request` - Invalid filter or pagination parameters
#[tracing::instrument(skip(service, query))]
async fn list_audit_logs(
    State(service): State<AuditService>,
    query: Result<Query<ListAuditLogsQuery>, QueryRejection>,
) -> Result<Response, AuditLogApiError> {
    let Query(query) = query.map_err(|e| AuditLogApiError::BadQuery(e.body_text()))?;

    let page = super::queries::list::handle(service, query).await?;

    tracing::debug!(
        count = page.data.len(),
        total = page.meta.total,
        "Audit logs listed via API"
    );

    Ok((StatusCode::OK, Json(page)).into_response())
}

/// Get one audit log
///
/// `GET /api/v1/audit-logs/:id`
///
/// - `200 OK` - The record
/// - `400 Bad Request` - Id is not a UUID
/// - `404 Not Found` - No such record
#[tracing::instrument(skip(service))]
async fn get_audit_log(
    State(service): State<AuditService>,
    Path(id): Path<String>,
) -> Result<Response, AuditLogApiError> {
    let record = super::queries::get::handle(service, GetAuditLogQuery { id }).await?;
    Ok((StatusCode::OK, Json(record)).into_response())
}

/// History of one entity, newest first; empty when nothing was recorded
///
/// `GET /api/v1/audit-logs/entity/:entity_type/:entity_id`
#[tracing::instrument(skip(service))]
async fn entity_history(
    State(service): State<AuditService>,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> Result<Response, AuditLogApiError> {
    let records = super::queries::by_entity::handle(
        service,
        EntityHistoryQuery {
            entity_type,
            entity_id,
        },
    )
    .await?;

    Ok((StatusCode::OK, Json(records)).into_response())
}

/// Records created by one actor, newest first
///
/// `GET /api/v1/audit-logs/actor/:actor_id`
#[tracing::instrument(skip(service))]
async fn actor_history(
    State(service): State<AuditService>,
    Path(actor_id): Path<String>,
) -> Result<Response, AuditLogApiError> {
    let records = super::queries::by_actor::handle(service, ActorHistoryQuery { actor_id }).await?;
    Ok((StatusCode::OK, Json(records)).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Unified error type for audit log API endpoints
#[derive(Debug, thiserror::Error)]
enum AuditLogApiError {
    #[error("{0}")]
    BadQuery(String),
    #[error(transparent)]
    List(#[from] ListAuditLogsError),
    #[error(transparent)]
    Get(#[from] GetAuditLogError),
    #[error(transparent)]
    EntityHistory(#[from] EntityHistoryError),
    #[error(transparent)]
    ActorHistory(#[from] ActorHistoryError),
}

impl IntoResponse for AuditLogApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuditLogApiError::List(ListAuditLogsError::Store(_))
            | AuditLogApiError::Get(GetAuditLogError::Store(_))
            | AuditLogApiError::EntityHistory(EntityHistoryError::Store(_))
            | AuditLogApiError::ActorHistory(ActorHistoryError::Store(_)) => {
                tracing::error!(error = %self, "Audit store error while serving audit logs");
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response();
            },
            AuditLogApiError::Get(GetAuditLogError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            },
            _ => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        };

        let error = ErrorResponse::new(code, self.to_string());
        (status, Json(error)).into_response()
    }
}
