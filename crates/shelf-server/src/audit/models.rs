//! Audit data models

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::pagination::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

/// Flat field-name to value mapping captured from one side of a change
pub type Snapshot = Map<String, JsonValue>;

/// Audit action types
///
/// Stored as the `audit_action` PostgreSQL enum. Adding a variant requires a
/// migration that extends the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "audit_action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    StatusChange,
    Restore,
}

impl AuditAction {
    pub const ALL: [AuditAction; 5] = [
        Self::Create,
        Self::Update,
        Self::Delete,
        Self::StatusChange,
        Self::Restore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::StatusChange => "STATUS_CHANGE",
            Self::Restore => "RESTORE",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("audit action", s))
    }
}

/// Domain entities that can be audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "audit_entity_type", rename_all = "snake_case")]
pub enum EntityType {
    Category,
    Product,
    Location,
    Area,
    Inventory,
    StockMovement,
}

impl EntityType {
    pub const ALL: [EntityType; 6] = [
        Self::Category,
        Self::Product,
        Self::Location,
        Self::Area,
        Self::Inventory,
        Self::StockMovement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Product => "product",
            Self::Location => "location",
            Self::Area => "area",
            Self::Inventory => "inventory",
            Self::StockMovement => "stock_movement",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|entity_type| entity_type.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("entity type", s))
    }
}

/// A string that names no variant of a closed audit enum
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind}: '{value}'")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Field-level delta stored on an audit record
///
/// Either side may be absent: a creation only carries `after`, a deletion only
/// `before`. Built by [`crate::audit::diff::compute_changes`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuditChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Snapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Snapshot>,
}

impl AuditChanges {
    /// True when neither side carries a single field
    pub fn is_empty(&self) -> bool {
        let side_empty = |side: &Option<Snapshot>| side.as_ref().map_or(true, Map::is_empty);
        side_empty(&self.before) && side_empty(&self.after)
    }
}

/// Persisted audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    /// Authenticated principal, `None` for anonymous actions
    pub actor_id: Option<String>,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub changes: Option<AuditChanges>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating an audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditRecord {
    pub actor_id: Option<String>,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub changes: Option<AuditChanges>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl NewAuditRecord {
    pub fn builder() -> NewAuditRecordBuilder {
        NewAuditRecordBuilder::default()
    }

    /// Check the invariants every persisted record must satisfy
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.entity_id.trim().is_empty() {
            return Err("entity_id must not be empty");
        }
        if self.changes.as_ref().is_some_and(AuditChanges::is_empty) {
            return Err("changes must carry at least one field");
        }
        Ok(())
    }

    /// Materialize the record with a fresh id and the given timestamp
    pub fn into_record(self, created_at: DateTime<Utc>) -> AuditRecord {
        AuditRecord {
            id: Uuid::new_v4(),
            actor_id: self.actor_id,
            action: self.action,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            changes: self.changes,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            created_at,
        }
    }
}

/// Builder for [`NewAuditRecord`]
#[derive(Debug, Clone, Default)]
pub struct NewAuditRecordBuilder {
    actor_id: Option<String>,
    action: Option<AuditAction>,
    entity_type: Option<EntityType>,
    entity_id: Option<String>,
    changes: Option<AuditChanges>,
    ip_address: Option<String>,
    user_agent: Option<String>,
}

impl NewAuditRecordBuilder {
    pub fn actor_id(mut self, actor_id: Option<String>) -> Self {
        self.actor_id = actor_id;
        self
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn entity_type(mut self, entity_type: EntityType) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    pub fn entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn changes(mut self, changes: Option<AuditChanges>) -> Self {
        self.changes = changes;
        self
    }

    pub fn ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the record, failing if a required field is missing or invalid
    pub fn try_build(self) -> Result<NewAuditRecord, &'static str> {
        let record = NewAuditRecord {
            actor_id: self.actor_id,
            action: self.action.ok_or("action is required")?,
            entity_type: self.entity_type.ok_or("entity_type is required")?,
            entity_id: self.entity_id.ok_or("entity_id is required")?,
            changes: self.changes,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
        };
        record.validate()?;
        Ok(record)
    }
}

/// Filters and pagination for [`crate::audit::AuditStore::query`]
///
/// All filters are optional and combined with AND. Dates are inclusive bounds
/// on `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogFilter {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub actor_id: Option<String>,
    pub action: Option<AuditAction>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    /// 1-based page number
    pub page: i64,
    pub limit: i64,
}

impl AuditLogFilter {
    /// Page clamped to at least 1
    pub fn page(&self) -> i64 {
        self.page.max(1)
    }

    /// Limit clamped to `1..=MAX_PAGE_LIMIT`
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, MAX_PAGE_LIMIT)
    }

    /// Rows to skip; saturates so an absurd page simply lands past the end
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// In-process equivalent of the SQL WHERE clause
    pub fn matches(&self, record: &AuditRecord) -> bool {
        self.entity_type.map_or(true, |t| record.entity_type == t)
            && self.entity_id.as_ref().map_or(true, |id| &record.entity_id == id)
            && self
                .actor_id
                .as_ref()
                .map_or(true, |actor| record.actor_id.as_ref() == Some(actor))
            && self.action.map_or(true, |a| record.action == a)
            && self.from_date.map_or(true, |from| record.created_at >= from)
            && self.to_date.map_or(true, |to| record.created_at <= to)
    }
}

impl Default for AuditLogFilter {
    fn default() -> Self {
        Self {
            entity_type: None,
            entity_id: None,
            actor_id: None,
            action: None,
            from_date: None,
            to_date: None,
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}
