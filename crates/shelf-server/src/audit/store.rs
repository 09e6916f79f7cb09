//! Audit record persistence
//!
//! [`AuditStore`] is the seam between the capture pipeline and storage.
//! [`PgAuditStore`] is the production implementation; records are append-only
//! and no update or delete operation is exposed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use super::models::{AuditAction, AuditChanges, AuditLogFilter, AuditRecord, EntityType, NewAuditRecord};
use crate::pagination::Paginated;

/// Rows per INSERT statement in a batch; keeps us under the bind parameter limit
const BATCH_CHUNK_SIZE: usize = 1000;

/// Errors raised by audit storage backends
#[derive(Debug, thiserror::Error)]
pub enum AuditStoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid audit record: {0}")]
    InvalidRecord(String),
}

impl AuditStoreError {
    pub(crate) fn invalid(reason: &str) -> Self {
        Self::InvalidRecord(reason.to_string())
    }
}

/// Storage backend for audit records
///
/// Implementations must be `Send + Sync` so a single store can be shared by
/// detached write tasks.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist one record, returning it with its generated id and timestamp
    async fn create(&self, record: NewAuditRecord) -> Result<AuditRecord, AuditStoreError>;

    /// Persist a batch atomically; on failure nothing from the batch is stored
    async fn create_many(
        &self,
        records: Vec<NewAuditRecord>,
    ) -> Result<Vec<AuditRecord>, AuditStoreError>;

    /// All records for one entity instance, newest first
    async fn find_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Vec<AuditRecord>, AuditStoreError>;

    /// All records created by one actor, newest first
    async fn find_by_actor(&self, actor_id: &str) -> Result<Vec<AuditRecord>, AuditStoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuditRecord>, AuditStoreError>;

    /// Filtered, paginated listing, newest first
    async fn query(
        &self,
        filter: &AuditLogFilter,
    ) -> Result<Paginated<AuditRecord>, AuditStoreError>;
}

/// PostgreSQL-backed audit store
#[derive(Debug, Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Database record structure for sqlx query
#[derive(Debug, sqlx::FromRow)]
struct AuditRecordRow {
    id: Uuid,
    actor_id: Option<String>,
    action: AuditAction,
    entity_type: EntityType,
    entity_id: String,
    changes: Option<Json<AuditChanges>>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AuditRecordRow> for AuditRecord {
    fn from(row: AuditRecordRow) -> Self {
        Self {
            id: row.id,
            actor_id: row.actor_id,
            action: row.action,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            changes: row.changes.map(|Json(changes)| changes),
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    #[tracing::instrument(skip(self, record), fields(action = %record.action, entity_type = %record.entity_type))]
    async fn create(&self, record: NewAuditRecord) -> Result<AuditRecord, AuditStoreError> {
        record.validate().map_err(AuditStoreError::invalid)?;

        let row = sqlx::query_as::<_, AuditRecordRow>(
            r#"
            INSERT INTO audit_logs (
                id, actor_id, action, entity_type, entity_id,
                changes, ip_address, user_agent
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, actor_id, action, entity_type, entity_id,
                      changes, ip_address, user_agent, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.actor_id)
        .bind(record.action)
        .bind(record.entity_type)
        .bind(&record.entity_id)
        .bind(record.changes.map(Json))
        .bind(&record.ip_address)
        .bind(&record.user_agent)
        .fetch_one(&self.pool)
        .await?;

        debug!(audit_id = %row.id, entity_id = %row.entity_id, "Created audit log entry");

        Ok(row.into())
    }

    #[tracing::instrument(skip(self, records), fields(count = records.len()))]
    async fn create_many(
        &self,
        records: Vec<NewAuditRecord>,
    ) -> Result<Vec<AuditRecord>, AuditStoreError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        for record in &records {
            record.validate().map_err(AuditStoreError::invalid)?;
        }

        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(records.len());

        let mut remaining = records.into_iter().peekable();
        while remaining.peek().is_some() {
            let chunk: Vec<NewAuditRecord> = remaining.by_ref().take(BATCH_CHUNK_SIZE).collect();

            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO audit_logs (id, actor_id, action, entity_type, entity_id, \
                 changes, ip_address, user_agent) ",
            );
            builder.push_values(chunk, |mut row, record| {
                row.push_bind(Uuid::new_v4())
                    .push_bind(record.actor_id)
                    .push_bind(record.action)
                    .push_bind(record.entity_type)
                    .push_bind(record.entity_id)
                    .push_bind(record.changes.map(Json))
                    .push_bind(record.ip_address)
                    .push_bind(record.user_agent);
            });
            builder.push(
                " RETURNING id, actor_id, action, entity_type, entity_id, \
                 changes, ip_address, user_agent, created_at",
            );

            let rows = builder
                .build_query_as::<AuditRecordRow>()
                .fetch_all(&mut *tx)
                .await?;
            created.extend(rows.into_iter().map(AuditRecord::from));
        }

        tx.commit().await?;

        debug!(count = created.len(), "Created audit log entries in batch");

        Ok(created)
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Vec<AuditRecord>, AuditStoreError> {
        let rows = sqlx::query_as::<_, AuditRecordRow>(
            r#"
            SELECT id, actor_id, action, entity_type, entity_id,
                   changes, ip_address, user_agent, created_at
            FROM audit_logs
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Retrieved entity audit trail");

        Ok(rows.into_iter().map(AuditRecord::from).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_actor(&self, actor_id: &str) -> Result<Vec<AuditRecord>, AuditStoreError> {
        let rows = sqlx::query_as::<_, AuditRecordRow>(
            r#"
            SELECT id, actor_id, action, entity_type, entity_id,
                   changes, ip_address, user_agent, created_at
            FROM audit_logs
            WHERE actor_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(actor_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Retrieved actor audit history");

        Ok(rows.into_iter().map(AuditRecord::from).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuditRecord>, AuditStoreError> {
        let row = sqlx::query_as::<_, AuditRecordRow>(
            r#"
            SELECT id, actor_id, action, entity_type, entity_id,
                   changes, ip_address, user_agent, created_at
            FROM audit_logs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AuditRecord::from))
    }

    #[tracing::instrument(skip(self, filter), fields(page = filter.page(), limit = filter.limit()))]
    async fn query(
        &self,
        filter: &AuditLogFilter,
    ) -> Result<Paginated<AuditRecord>, AuditStoreError> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM audit_logs
            WHERE ($1::audit_entity_type IS NULL OR entity_type = $1)
              AND ($2::TEXT IS NULL OR entity_id = $2)
              AND ($3::TEXT IS NULL OR actor_id = $3)
              AND ($4::audit_action IS NULL OR action = $4)
              AND ($5::TIMESTAMPTZ IS NULL OR created_at >= $5)
              AND ($6::TIMESTAMPTZ IS NULL OR created_at <= $6)
            "#,
        )
        .bind(filter.entity_type)
        .bind(filter.entity_id.as_deref())
        .bind(filter.actor_id.as_deref())
        .bind(filter.action)
        .bind(filter.from_date)
        .bind(filter.to_date)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, AuditRecordRow>(
            r#"
            SELECT id, actor_id, action, entity_type, entity_id,
                   changes, ip_address, user_agent, created_at
            FROM audit_logs
            WHERE ($1::audit_entity_type IS NULL OR entity_type = $1)
              AND ($2::TEXT IS NULL OR entity_id = $2)
              AND ($3::TEXT IS NULL OR actor_id = $3)
              AND ($4::audit_action IS NULL OR action = $4)
              AND ($5::TIMESTAMPTZ IS NULL OR created_at >= $5)
              AND ($6::TIMESTAMPTZ IS NULL OR created_at <= $6)
            ORDER BY created_at DESC, id DESC
            LIMIT $7
            OFFSET $8
            "#,
        )
        .bind(filter.entity_type)
        .bind(filter.entity_id.as_deref())
        .bind(filter.actor_id.as_deref())
        .bind(filter.action)
        .bind(filter.from_date)
        .bind(filter.to_date)
        .bind(filter.limit())
        .bind(filter.offset())
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), total, "Queried audit logs");

        Ok(Paginated::new(
            rows.into_iter().map(AuditRecord::from).collect(),
            filter.page(),
            filter.limit(),
            total,
        ))
    }
}
