//! Explicit audit logging for business code
//!
//! The capture layer covers routed operations. Code paths that know the
//! entity state before and after a change, or that act outside a request,
//! write through [`AuditService`] instead.

use std::sync::Arc;

use tracing::{debug, error};
use uuid::Uuid;

use super::capture::AuditContext;
use super::diff::compute_changes;
use super::models::{
    AuditAction, AuditChanges, AuditLogFilter, AuditRecord, EntityType, NewAuditRecord, Snapshot,
};
use super::store::{AuditStore, AuditStoreError};
use crate::pagination::Paginated;

/// Parameters for [`AuditService::log`]
#[derive(Debug, Clone)]
pub struct LogAuditParams {
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub context: AuditContext,
    pub changes: Option<AuditChanges>,
}

/// Parameters for [`AuditService::log_bulk`]
#[derive(Debug, Clone)]
pub struct LogBulkAuditParams {
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_ids: Vec<String>,
    pub context: AuditContext,
}

/// A change described by the entity state on both sides
#[derive(Debug, Clone)]
pub struct LogChangeParams<'a> {
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub context: AuditContext,
    pub before: Option<&'a Snapshot>,
    pub after: Option<&'a Snapshot>,
    /// Restrict the diff to these fields
    pub fields: Option<&'a [&'a str]>,
}

#[derive(Clone)]
pub struct AuditService {
    store: Arc<dyn AuditStore>,
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService").finish_non_exhaustive()
    }
}

impl AuditService {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    pub async fn log(&self, params: LogAuditParams) -> Result<AuditRecord, AuditStoreError> {
        let LogAuditParams {
            action,
            entity_type,
            entity_id,
            context,
            changes,
        } = params;

        let record = NewAuditRecord {
            actor_id: context.actor_id,
            action,
            entity_type,
            entity_id,
            changes,
            ip_address: context.ip_address,
            user_agent: context.user_agent,
        };
        let entity_id = record.entity_id.clone();
        let actor_id = record.actor_id.clone();

        match self.store.create(record).await {
            Ok(entry) => {
                debug!(
                    audit_id = %entry.id,
                    action = %action,
                    entity_type = %entity_type,
                    entity_id = %entity_id,
                    actor_id = ?actor_id,
                    "Audit log created"
                );
                Ok(entry)
            },
            Err(e) => {
                error!(
                    error = %e,
                    action = %action,
                    entity_type = %entity_type,
                    entity_id = %entity_id,
                    "Failed to create audit log"
                );
                Err(e)
            },
        }
    }

    /// One record per entity id, written in a single batch without changes
    pub async fn log_bulk(
        &self,
        params: LogBulkAuditParams,
    ) -> Result<Vec<AuditRecord>, AuditStoreError> {
        let LogBulkAuditParams {
            action,
            entity_type,
            entity_ids,
            context,
        } = params;

        let count = entity_ids.len();
        let records = entity_ids
            .into_iter()
            .map(|entity_id| NewAuditRecord {
                actor_id: context.actor_id.clone(),
                action,
                entity_type,
                entity_id,
                changes: None,
                ip_address: context.ip_address.clone(),
                user_agent: context.user_agent.clone(),
            })
            .collect();

        match self.store.create_many(records).await {
            Ok(entries) => {
                debug!(
                    count,
                    action = %action,
                    entity_type = %entity_type,
                    actor_id = ?context.actor_id,
                    "Bulk audit logs created"
                );
                Ok(entries)
            },
            Err(e) => {
                error!(
                    error = %e,
                    action = %action,
                    entity_type = %entity_type,
                    "Failed to create bulk audit logs"
                );
                Err(e)
            },
        }
    }

    /// Diff `before` against `after` and record the result
    ///
    /// An `UPDATE` whose diff is empty writes nothing and returns `Ok(None)`.
    pub async fn log_change(
        &self,
        params: LogChangeParams<'_>,
    ) -> Result<Option<AuditRecord>, AuditStoreError> {
        let changes = compute_changes(params.before, params.after, params.fields);

        if changes.is_none() && params.action == AuditAction::Update {
            debug!(
                entity_type = %params.entity_type,
                entity_id = %params.entity_id,
                "No observable change, skipping audit log"
            );
            return Ok(None);
        }

        self.log(LogAuditParams {
            action: params.action,
            entity_type: params.entity_type,
            entity_id: params.entity_id,
            context: params.context,
            changes,
        })
        .await
        .map(Some)
    }

    pub async fn entity_history(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Vec<AuditRecord>, AuditStoreError> {
        self.store.find_by_entity(entity_type, entity_id).await
    }

    pub async fn actor_history(&self, actor_id: &str) -> Result<Vec<AuditRecord>, AuditStoreError> {
        self.store.find_by_actor(actor_id).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AuditRecord>, AuditStoreError> {
        self.store.find_by_id(id).await
    }

    pub async fn query(
        &self,
        filter: &AuditLogFilter,
    ) -> Result<Paginated<AuditRecord>, AuditStoreError> {
        self.store.query(filter).await
    }
}
