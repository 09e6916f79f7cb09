//! PostgreSQL audit store tests
//!
//! Require a database reachable through `DATABASE_URL`; run with
//! `cargo test -- --ignored`.

use chrono::{Duration, Utc};
use serde_json::json;
use shelf_server::audit::{
    AuditAction, AuditChanges, AuditLogFilter, AuditStore, AuditStoreError, EntityType,
    NewAuditRecord, PgAuditStore,
};
use sqlx::PgPool;

mod common;
use common::snapshot;

fn new_record(action: AuditAction, entity_id: &str, actor: Option<&str>) -> NewAuditRecord {
    NewAuditRecord::builder()
        .action(action)
        .entity_type(EntityType::Product)
        .entity_id(entity_id)
        .actor_id(actor.map(str::to_string))
        .ip_address("192.168.1.100")
        .user_agent("Test Agent/1.0")
        .try_build()
        .unwrap()
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_create_round_trips_all_columns(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let store = PgAuditStore::new(pool);
    let changes = AuditChanges {
        before: Some(snapshot(json!({"name": "Old Name"}))),
        after: Some(snapshot(json!({"name": "New Name"}))),
    };

    let mut record = new_record(AuditAction::StatusChange, "p-1", Some("user_1"));
    record.changes = Some(changes.clone());

    let created = store.create(record).await?;
    assert_eq!(created.action, AuditAction::StatusChange);
    assert_eq!(created.entity_type, EntityType::Product);
    assert_eq!(created.actor_id.as_deref(), Some("user_1"));
    assert_eq!(created.ip_address.as_deref(), Some("192.168.1.100"));
    assert_eq!(created.changes, Some(changes));

    let fetched = store.find_by_id(created.id).await?;
    assert_eq!(fetched, Some(created));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_create_rejects_blank_entity_id(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let store = PgAuditStore::new(pool);
    let mut record = new_record(AuditAction::Create, "p-1", None);
    record.entity_id = "  ".to_string();

    let result = store.create(record).await;
    assert!(matches!(result, Err(AuditStoreError::InvalidRecord(_))));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_create_many_is_atomic(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let store = PgAuditStore::new(pool);

    let created = store
        .create_many(vec![
            new_record(AuditAction::Delete, "i-1", Some("user_1")),
            new_record(AuditAction::Delete, "i-2", Some("user_1")),
            new_record(AuditAction::Delete, "i-3", Some("user_1")),
        ])
        .await?;
    assert_eq!(created.len(), 3);

    let mut bad = new_record(AuditAction::Delete, "i-4", Some("user_1"));
    bad.entity_id = String::new();
    let result = store
        .create_many(vec![new_record(AuditAction::Delete, "i-5", Some("user_1")), bad])
        .await;
    assert!(result.is_err());

    assert_eq!(store.find_by_actor("user_1").await?.len(), 3);
    assert!(store.create_many(Vec::new()).await?.is_empty());

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_entity_history_newest_first(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let store = PgAuditStore::new(pool);

    let first = store.create(new_record(AuditAction::Create, "p-1", None)).await?;
    let second = store.create(new_record(AuditAction::Update, "p-1", None)).await?;
    store.create(new_record(AuditAction::Create, "p-2", None)).await?;

    let history = store.find_by_entity(EntityType::Product, "p-1").await?;
    assert_eq!(
        history.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![second.id, first.id]
    );

    assert!(store.find_by_entity(EntityType::Area, "p-1").await?.is_empty());

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_query_filters_and_pagination(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let store = PgAuditStore::new(pool);

    for i in 0..25 {
        let action = if i % 5 == 0 { AuditAction::Update } else { AuditAction::Create };
        store
            .create(new_record(action, &format!("p-{i}"), Some("user_1")))
            .await?;
    }
    store.create(new_record(AuditAction::Create, "p-x", Some("user_2"))).await?;

    let page = store
        .query(&AuditLogFilter {
            actor_id: Some("user_1".to_string()),
            page: 2,
            limit: 10,
            ..Default::default()
        })
        .await?;
    assert_eq!(page.data.len(), 10);
    assert_eq!(page.meta.total, 25);
    assert_eq!(page.meta.total_pages, 3);
    assert!(page.meta.has_next && page.meta.has_previous);

    let updates = store
        .query(&AuditLogFilter {
            action: Some(AuditAction::Update),
            ..Default::default()
        })
        .await?;
    assert_eq!(updates.meta.total, 5);

    let future = store
        .query(&AuditLogFilter {
            from_date: Some(Utc::now() + Duration::hours(1)),
            ..Default::default()
        })
        .await?;
    assert_eq!(future.meta.total, 0);
    assert!(future.data.is_empty());

    Ok(())
}
