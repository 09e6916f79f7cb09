use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{
    AuditAction, AuditLogFilter, AuditRecord, AuditService, AuditStoreError, EntityType,
    UnknownVariant,
};
use crate::pagination::{Paginated, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

/// Query string of `GET /api/v1/audit-logs`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListAuditLogsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// RFC 3339, inclusive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_date: Option<String>,
    /// RFC 3339, inclusive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListAuditLogsError {
    #[error("Page must be greater than 0")]
    InvalidPage,
    #[error("Limit must be between 1 and 100")]
    InvalidLimit,
    #[error(transparent)]
    InvalidEnum(#[from] UnknownVariant),
    #[error("{field} must be an RFC 3339 timestamp, got '{value}'")]
    InvalidDate { field: &'static str, value: String },
    #[error("from_date must not be after to_date")]
    InvalidDateRange,
    #[error("Audit store error: {0}")]
    Store(#[from] AuditStoreError),
}

impl ListAuditLogsQuery {
    pub fn validate(&self) -> Result<(), ListAuditLogsError> {
        self.to_filter().map(|_| ())
    }

    /// Validate and convert into a store filter
    pub fn to_filter(&self) -> Result<AuditLogFilter, ListAuditLogsError> {
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(ListAuditLogsError::InvalidPage);
        }
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(ListAuditLogsError::InvalidLimit);
        }

        let from_date = parse_date("from_date", self.from_date.as_deref())?;
        let to_date = parse_date("to_date", self.to_date.as_deref())?;
        if let (Some(from), Some(to)) = (from_date, to_date) {
            if from > to {
                return Err(ListAuditLogsError::InvalidDateRange);
            }
        }

        Ok(AuditLogFilter {
            entity_type: non_empty(&self.entity_type)
                .map(str::parse::<EntityType>)
                .transpose()?,
            entity_id: non_empty(&self.entity_id).map(str::to_string),
            actor_id: non_empty(&self.actor_id).map(str::to_string),
            action: non_empty(&self.action)
                .map(str::parse::<AuditAction>)
                .transpose()?,
            from_date,
            to_date,
            page,
            limit,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, ListAuditLogsError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|date| Some(date.with_timezone(&Utc)))
            .map_err(|_| ListAuditLogsError::InvalidDate {
                field,
                value: raw.to_string(),
            }),
    }
}

#[tracing::instrument(skip(service))]
pub async fn handle(
    service: AuditService,
    query: ListAuditLogsQuery,
) -> Result<Paginated<AuditRecord>, ListAuditLogsError> {
    let filter = query.to_filter()?;
    Ok(service.query(&filter).await?)
}
