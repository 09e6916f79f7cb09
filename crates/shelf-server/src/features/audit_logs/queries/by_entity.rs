use serde::{Deserialize, Serialize};

use crate::audit::{AuditRecord, AuditService, AuditStoreError, EntityType, UnknownVariant};

/// Full history of one entity, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityHistoryQuery {
    pub entity_type: String,
    pub entity_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EntityHistoryError {
    #[error(transparent)]
    InvalidEntityType(#[from] UnknownVariant),
    #[error("Entity id is required")]
    EntityIdRequired,
    #[error("Audit store error: {0}")]
    Store(#[from] AuditStoreError),
}

impl EntityHistoryQuery {
    pub fn validate(&self) -> Result<EntityType, EntityHistoryError> {
        let entity_type = self.entity_type.parse::<EntityType>()?;
        if self.entity_id.trim().is_empty() {
            return Err(EntityHistoryError::EntityIdRequired);
        }
        Ok(entity_type)
    }
}

#[tracing::instrument(skip(service))]
pub async fn handle(
    service: AuditService,
    query: EntityHistoryQuery,
) -> Result<Vec<AuditRecord>, EntityHistoryError> {
    let entity_type = query.validate()?;
    Ok(service.entity_history(entity_type, &query.entity_id).await?)
}
