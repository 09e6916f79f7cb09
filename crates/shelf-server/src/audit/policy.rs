//! Declarative audit policies
//!
//! A policy states what a mutating operation does (action and entity type),
//! where the affected entity id comes from, and whether the handler's diff is
//! kept. Policies are attached to routes through a [`PolicyRegistry`] rather
//! than inside handlers.

use std::collections::HashMap;

use axum::http::Method;

use super::models::{AuditAction, EntityType};

/// Where the affected entity id is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityIdSource {
    /// Named path parameter, e.g. `id` for `/products/:id`
    PathParam(String),
    /// Dot-separated path into the JSON request body
    Body(String),
    /// Dot-separated path into the JSON result of the operation
    Response(String),
}

/// Audit configuration for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditPolicy {
    pub action: AuditAction,
    pub entity_type: EntityType,
    /// `None` means the default heuristics apply
    pub entity_id_source: Option<EntityIdSource>,
    pub track_changes: bool,
}

impl AuditPolicy {
    pub fn new(action: AuditAction, entity_type: EntityType) -> Self {
        Self {
            action,
            entity_type,
            entity_id_source: None,
            track_changes: false,
        }
    }

    pub fn from_path_param(mut self, name: impl Into<String>) -> Self {
        self.entity_id_source = Some(EntityIdSource::PathParam(name.into()));
        self
    }

    pub fn from_body(mut self, path: impl Into<String>) -> Self {
        self.entity_id_source = Some(EntityIdSource::Body(path.into()));
        self
    }

    pub fn from_response(mut self, path: impl Into<String>) -> Self {
        self.entity_id_source = Some(EntityIdSource::Response(path.into()));
        self
    }

    pub fn track_changes(mut self) -> Self {
        self.track_changes = true;
        self
    }
}

/// Identifies a routed operation: HTTP method plus the matched route template
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationId {
    pub method: Method,
    pub route: String,
}

impl OperationId {
    pub fn new(method: Method, route: impl Into<String>) -> Self {
        Self {
            method,
            route: route.into(),
        }
    }
}

/// Lookup table from operation to policy
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    policies: HashMap<OperationId, AuditPolicy>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a policy to a route; replaces any previous policy for it
    pub fn register(mut self, method: Method, route: &str, policy: AuditPolicy) -> Self {
        self.policies.insert(OperationId::new(method, route), policy);
        self
    }

    pub fn get(&self, method: &Method, route: &str) -> Option<&AuditPolicy> {
        self.policies.get(&OperationId::new(method.clone(), route))
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Policies for the inventory domain's mutating routes
    pub fn inventory_defaults() -> Self {
        use AuditAction::*;

        let crud = [
            ("/api/v1/categories", EntityType::Category),
            ("/api/v1/products", EntityType::Product),
            ("/api/v1/locations", EntityType::Location),
            ("/api/v1/areas", EntityType::Area),
            ("/api/v1/inventory", EntityType::Inventory),
        ];

        let mut registry = Self::new();
        for (collection, entity_type) in crud {
            let item = format!("{collection}/:id");
            registry = registry
                .register(
                    Method::POST,
                    collection,
                    AuditPolicy::new(Create, entity_type).from_response("id"),
                )
                .register(
                    Method::PUT,
                    &item,
                    AuditPolicy::new(Update, entity_type)
                        .from_path_param("id")
                        .track_changes(),
                )
                .register(
                    Method::PATCH,
                    &item,
                    AuditPolicy::new(Update, entity_type)
                        .from_path_param("id")
                        .track_changes(),
                )
                .register(
                    Method::DELETE,
                    &item,
                    AuditPolicy::new(Delete, entity_type).from_path_param("id"),
                );
        }

        registry
            .register(
                Method::PATCH,
                "/api/v1/products/:id/status",
                AuditPolicy::new(StatusChange, EntityType::Product)
                    .from_path_param("id")
                    .track_changes(),
            )
            .register(
                Method::PATCH,
                "/api/v1/inventory/:id/adjust",
                AuditPolicy::new(Update, EntityType::Inventory)
                    .from_path_param("id")
                    .track_changes(),
            )
            .register(
                Method::POST,
                "/api/v1/inventory/:id/restore",
                AuditPolicy::new(Restore, EntityType::Inventory).from_path_param("id"),
            )
            .register(
                Method::POST,
                "/api/v1/inventory/bulk-delete",
                AuditPolicy::new(Delete, EntityType::Inventory).from_response("succeeded"),
            )
            .register(
                Method::POST,
                "/api/v1/stock-movements",
                AuditPolicy::new(Create, EntityType::StockMovement).from_response("id"),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_builder() {
        let policy = AuditPolicy::new(AuditAction::Update, EntityType::Area)
            .from_body("area.id")
            .track_changes();

        assert_eq!(
            policy.entity_id_source,
            Some(EntityIdSource::Body("area.id".to_string()))
        );
        assert!(policy.track_changes);
    }

    #[test]
    fn test_last_source_wins() {
        let policy = AuditPolicy::new(AuditAction::Create, EntityType::Product)
            .from_path_param("id")
            .from_response("data.id");

        assert_eq!(
            policy.entity_id_source,
            Some(EntityIdSource::Response("data.id".to_string()))
        );
    }

    #[test]
    fn test_registry_lookup_is_method_specific() {
        let registry = PolicyRegistry::new().register(
            Method::DELETE,
            "/api/v1/areas/:id",
            AuditPolicy::new(AuditAction::Delete, EntityType::Area).from_path_param("id"),
        );

        assert!(registry.get(&Method::DELETE, "/api/v1/areas/:id").is_some());
        assert!(registry.get(&Method::GET, "/api/v1/areas/:id").is_none());
        assert!(registry.get(&Method::DELETE, "/api/v1/areas").is_none());
    }

    #[test]
    fn test_inventory_defaults() {
        let registry = PolicyRegistry::inventory_defaults();

        let create = registry.get(&Method::POST, "/api/v1/products").unwrap();
        assert_eq!(create.action, AuditAction::Create);
        assert_eq!(
            create.entity_id_source,
            Some(EntityIdSource::Response("id".to_string()))
        );

        let update = registry.get(&Method::PUT, "/api/v1/categories/:id").unwrap();
        assert_eq!(update.entity_type, EntityType::Category);
        assert!(update.track_changes);

        let bulk = registry
            .get(&Method::POST, "/api/v1/inventory/bulk-delete")
            .unwrap();
        assert_eq!(bulk.action, AuditAction::Delete);

        let restore = registry
            .get(&Method::POST, "/api/v1/inventory/:id/restore")
            .unwrap();
        assert_eq!(restore.action, AuditAction::Restore);

        assert!(registry.get(&Method::GET, "/api/v1/products").is_none());
    }
}
