//! In-process audit store
//!
//! Same contract as [`super::PgAuditStore`], backed by a `Vec` behind a tokio
//! `RwLock`. Used by tests and by embedders that do not run PostgreSQL.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{AuditLogFilter, AuditRecord, EntityType, NewAuditRecord};
use super::store::{AuditStore, AuditStoreError};
use crate::pagination::Paginated;

#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    // Insertion order; newest last
    records: RwLock<Vec<AuditRecord>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored record in insertion order
    pub async fn all(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Matching records, newest first; insertion order breaks timestamp ties
    async fn newest_first<F>(&self, predicate: F) -> Vec<AuditRecord>
    where
        F: Fn(&AuditRecord) -> bool,
    {
        let records = self.records.read().await;
        let mut matched: Vec<AuditRecord> =
            records.iter().rev().filter(|r| predicate(r)).cloned().collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn create(&self, record: NewAuditRecord) -> Result<AuditRecord, AuditStoreError> {
        record.validate().map_err(AuditStoreError::invalid)?;

        let record = record.into_record(Utc::now());
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn create_many(
        &self,
        records: Vec<NewAuditRecord>,
    ) -> Result<Vec<AuditRecord>, AuditStoreError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        // Validate everything before taking the lock so a bad record stores nothing
        for record in &records {
            record.validate().map_err(AuditStoreError::invalid)?;
        }

        let created_at = Utc::now();
        let created: Vec<AuditRecord> = records
            .into_iter()
            .map(|record| record.into_record(created_at))
            .collect();

        self.records.write().await.extend(created.iter().cloned());
        Ok(created)
    }

    async fn find_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Vec<AuditRecord>, AuditStoreError> {
        Ok(self
            .newest_first(|r| r.entity_type == entity_type && r.entity_id == entity_id)
            .await)
    }

    async fn find_by_actor(&self, actor_id: &str) -> Result<Vec<AuditRecord>, AuditStoreError> {
        Ok(self
            .newest_first(|r| r.actor_id.as_deref() == Some(actor_id))
            .await)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuditRecord>, AuditStoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn query(
        &self,
        filter: &AuditLogFilter,
    ) -> Result<Paginated<AuditRecord>, AuditStoreError> {
        let matched = self.newest_first(|r| filter.matches(r)).await;
        let total = matched.len() as i64;

        let data = matched
            .into_iter()
            .skip(usize::try_from(filter.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(filter.limit()).unwrap_or(usize::MAX))
            .collect();

        Ok(Paginated::new(data, filter.page(), filter.limit(), total))
    }
}
