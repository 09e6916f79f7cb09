//! Shared helpers for the shelf-server integration tests

#![allow(dead_code)]

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;
use shelf_server::audit::{
    AuditLogFilter, AuditRecord, AuditStore, AuditStoreError, EntityType, MemoryAuditStore,
    NewAuditRecord, Snapshot,
};
use shelf_server::pagination::Paginated;
use uuid::Uuid;

/// Store whose every call fails as if the connection pool were exhausted
#[derive(Debug, Default)]
pub struct FailingStore;

fn unavailable() -> AuditStoreError {
    AuditStoreError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl AuditStore for FailingStore {
    async fn create(&self, _record: NewAuditRecord) -> Result<AuditRecord, AuditStoreError> {
        Err(unavailable())
    }

    async fn create_many(
        &self,
        _records: Vec<NewAuditRecord>,
    ) -> Result<Vec<AuditRecord>, AuditStoreError> {
        Err(unavailable())
    }

    async fn find_by_entity(
        &self,
        _entity_type: EntityType,
        _entity_id: &str,
    ) -> Result<Vec<AuditRecord>, AuditStoreError> {
        Err(unavailable())
    }

    async fn find_by_actor(&self, _actor_id: &str) -> Result<Vec<AuditRecord>, AuditStoreError> {
        Err(unavailable())
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<AuditRecord>, AuditStoreError> {
        Err(unavailable())
    }

    async fn query(
        &self,
        _filter: &AuditLogFilter,
    ) -> Result<Paginated<AuditRecord>, AuditStoreError> {
        Err(unavailable())
    }
}

/// Memory store that counts write calls
#[derive(Debug, Default)]
pub struct CountingStore {
    pub inner: MemoryAuditStore,
    creates: AtomicUsize,
    batches: AtomicUsize,
}

impl CountingStore {
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuditStore for CountingStore {
    async fn create(&self, record: NewAuditRecord) -> Result<AuditRecord, AuditStoreError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(record).await
    }

    async fn create_many(
        &self,
        records: Vec<NewAuditRecord>,
    ) -> Result<Vec<AuditRecord>, AuditStoreError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.inner.create_many(records).await
    }

    async fn find_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Vec<AuditRecord>, AuditStoreError> {
        self.inner.find_by_entity(entity_type, entity_id).await
    }

    async fn find_by_actor(&self, actor_id: &str) -> Result<Vec<AuditRecord>, AuditStoreError> {
        self.inner.find_by_actor(actor_id).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuditRecord>, AuditStoreError> {
        self.inner.find_by_id(id).await
    }

    async fn query(
        &self,
        filter: &AuditLogFilter,
    ) -> Result<Paginated<AuditRecord>, AuditStoreError> {
        self.inner.query(filter).await
    }
}

/// Give detached audit writes time to land
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

pub fn snapshot(value: Value) -> Snapshot {
    value.as_object().cloned().unwrap_or_default()
}
