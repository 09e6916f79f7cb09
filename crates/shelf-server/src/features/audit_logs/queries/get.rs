use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::{AuditRecord, AuditService, AuditStoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetAuditLogQuery {
    pub id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GetAuditLogError {
    #[error("Audit log id must be a UUID, got '{0}'")]
    InvalidId(String),
    #[error("Audit log '{0}' not found")]
    NotFound(Uuid),
    #[error("Audit store error: {0}")]
    Store(#[from] AuditStoreError),
}

impl GetAuditLogQuery {
    pub fn validate(&self) -> Result<Uuid, GetAuditLogError> {
        Uuid::parse_str(self.id.trim()).map_err(|_| GetAuditLogError::InvalidId(self.id.clone()))
    }
}

#[tracing::instrument(skip(service))]
pub async fn handle(
    service: AuditService,
    query: GetAuditLogQuery,
) -> Result<AuditRecord, GetAuditLogError> {
    let id = query.validate()?;

    service
        .find_by_id(id)
        .await?
        .ok_or(GetAuditLogError::NotFound(id))
}
