use serde::{Deserialize, Serialize};

use crate::audit::{AuditRecord, AuditService, AuditStoreError};

/// Everything one actor did, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorHistoryQuery {
    pub actor_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ActorHistoryError {
    #[error("Actor id is required")]
    ActorIdRequired,
    #[error("Audit store error: {0}")]
    Store(#[from] AuditStoreError),
}

impl ActorHistoryQuery {
    pub fn validate(&self) -> Result<(), ActorHistoryError> {
        if self.actor_id.trim().is_empty() {
            return Err(ActorHistoryError::ActorIdRequired);
        }
        Ok(())
    }
}

#[tracing::instrument(skip(service))]
pub async fn handle(
    service: AuditService,
    query: ActorHistoryQuery,
) -> Result<Vec<AuditRecord>, ActorHistoryError> {
    query.validate()?;
    Ok(service.actor_history(&query.actor_id).await?)
}
