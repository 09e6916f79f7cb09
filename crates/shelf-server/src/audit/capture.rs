//! Audit capture pipeline
//!
//! Wraps a mutating operation: on success it derives who acted, from where,
//! and on which entity, then hands the record to the store on a detached
//! task. Failures of the operation produce no record. Failures of the audit
//! write are logged and never reach the caller.
//!
//! ```no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use shelf_server::audit::{
//!     AuditAction, AuditCapture, AuditPolicy, AuditRequest, EntityType, MemoryAuditStore,
//! };
//!
//! # async fn example() -> Result<(), std::io::Error> {
//! let capture = AuditCapture::new(Arc::new(MemoryAuditStore::new()));
//! let policy = AuditPolicy::new(AuditAction::Create, EntityType::Product).from_response("id");
//!
//! let created = capture
//!     .observe(Some(&policy), &AuditRequest::new(), async {
//!         Ok::<_, std::io::Error>(json!({"id": "p-1", "name": "Bolt"}))
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::{collections::HashMap, future::Future, net::SocketAddr, sync::Arc};

use axum::http::{header, HeaderMap};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::models::{AuditChanges, NewAuditRecord};
use super::policy::{AuditPolicy, EntityIdSource};
use super::store::AuditStore;

/// Authenticated principal attached to a request by the auth layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedActor(pub String);

/// The parts of an inbound request the pipeline reads
#[derive(Debug, Clone, Default)]
pub struct AuditRequest {
    pub path_params: HashMap<String, String>,
    /// Parsed JSON body, `Null` when absent or not JSON
    pub body: JsonValue,
    pub headers: HeaderMap,
    pub actor: Option<AuthenticatedActor>,
    pub peer_addr: Option<SocketAddr>,
}

impl AuditRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: JsonValue) -> Self {
        self.body = body;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor = Some(AuthenticatedActor(actor_id.into()));
        self
    }

    pub fn with_peer_addr(mut self, addr: SocketAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }
}

/// Who acted and from where
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditContext {
    pub actor_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditContext {
    pub fn from_request(request: &AuditRequest) -> Self {
        let forwarded = request
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string);

        let ip_address =
            forwarded.or_else(|| request.peer_addr.map(|addr| addr.ip().to_string()));

        let user_agent = request
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Self {
            actor_id: request.actor.as_ref().map(|actor| actor.0.clone()),
            ip_address,
            user_agent,
        }
    }
}

/// Outcome of entity id resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityIdResolution {
    Single(String),
    Many(Vec<String>),
    Unresolved,
}

/// Work out which entity (or entities) an operation touched
///
/// A declared source is authoritative: when it yields nothing the result is
/// [`EntityIdResolution::Unresolved`]. Without a declared source the `id`
/// path parameter, the result's `id` and the result's `succeeded` list are
/// tried in that order.
pub fn resolve_entity_id(
    policy: &AuditPolicy,
    request: &AuditRequest,
    result: &JsonValue,
) -> EntityIdResolution {
    let resolved = match &policy.entity_id_source {
        Some(EntityIdSource::PathParam(name)) => path_param(request, name),
        Some(EntityIdSource::Body(path)) => walk(&request.body, path).and_then(ids_from),
        Some(EntityIdSource::Response(path)) => walk(result, path).and_then(ids_from),
        None => path_param(request, "id")
            .or_else(|| match result.get("id") {
                Some(JsonValue::String(id)) if !id.is_empty() => {
                    Some(EntityIdResolution::Single(id.clone()))
                },
                _ => None,
            })
            .or_else(|| {
                result
                    .get("succeeded")
                    .filter(|v| v.is_array())
                    .and_then(ids_from)
            }),
    };

    resolved.unwrap_or(EntityIdResolution::Unresolved)
}

fn path_param(request: &AuditRequest, name: &str) -> Option<EntityIdResolution> {
    request
        .path_params
        .get(name)
        .filter(|v| !v.is_empty())
        .map(|v| EntityIdResolution::Single(v.clone()))
}

/// Descend through nested objects along a dot-separated path
fn walk<'a>(value: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

fn ids_from(value: &JsonValue) -> Option<EntityIdResolution> {
    match value {
        JsonValue::String(id) if !id.is_empty() => Some(EntityIdResolution::Single(id.clone())),
        JsonValue::Array(items) if !items.is_empty() => items
            .iter()
            .map(|item| match item {
                JsonValue::String(id) if !id.is_empty() => Some(id.clone()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(EntityIdResolution::Many),
        _ => None,
    }
}

/// Capture pipeline bound to an audit store
#[derive(Clone)]
pub struct AuditCapture {
    store: Arc<dyn AuditStore>,
}

impl std::fmt::Debug for AuditCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditCapture").finish_non_exhaustive()
    }
}

impl AuditCapture {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.store
    }

    /// Run `operation` and audit it if it succeeds
    ///
    /// The operation's result is returned unchanged, errors included.
    pub async fn observe<T, E, F>(
        &self,
        policy: Option<&AuditPolicy>,
        request: &AuditRequest,
        operation: F,
    ) -> Result<T, E>
    where
        T: Serialize,
        F: Future<Output = Result<T, E>>,
    {
        self.observe_with_changes(policy, request, async {
            operation.await.map(|value| (value, None))
        })
        .await
    }

    /// Like [`observe`](Self::observe) for operations that also report a diff
    pub async fn observe_with_changes<T, E, F>(
        &self,
        policy: Option<&AuditPolicy>,
        request: &AuditRequest,
        operation: F,
    ) -> Result<T, E>
    where
        T: Serialize,
        F: Future<Output = Result<(T, Option<AuditChanges>), E>>,
    {
        let (value, changes) = operation.await?;

        if policy.is_some() {
            let result = serde_json::to_value(&value).unwrap_or_else(|e| {
                warn!(error = %e, "Failed to serialize operation result for audit");
                JsonValue::Null
            });
            // Detached; the handle is not awaited on the request path
            drop(self.capture_success(policy, request, &result, changes));
        }

        Ok(value)
    }

    /// Dispatch the audit write for a completed, successful operation
    ///
    /// Returns the handle of the spawned write, or `None` when nothing was
    /// dispatched (no policy, or no resolvable entity id).
    pub fn capture_success(
        &self,
        policy: Option<&AuditPolicy>,
        request: &AuditRequest,
        result: &JsonValue,
        changes: Option<AuditChanges>,
    ) -> Option<JoinHandle<()>> {
        let policy = policy?;
        let context = AuditContext::from_request(request);

        match resolve_entity_id(policy, request, result) {
            EntityIdResolution::Single(entity_id) => {
                let changes = changes
                    .filter(|_| policy.track_changes)
                    .filter(|c| !c.is_empty());
                let record = new_record(policy, &context, entity_id, changes);
                let store = Arc::clone(&self.store);

                Some(tokio::spawn(async move {
                    match store.create(record).await {
                        Ok(entry) => {
                            debug!(
                                audit_id = %entry.id,
                                action = %entry.action,
                                entity_type = %entry.entity_type,
                                entity_id = %entry.entity_id,
                                "Audit log entry created"
                            );
                        },
                        Err(e) => {
                            error!(error = %e, "Failed to create audit log entry");
                        },
                    }
                }))
            },
            EntityIdResolution::Many(entity_ids) => {
                let records = entity_ids
                    .into_iter()
                    .map(|entity_id| new_record(policy, &context, entity_id, None))
                    .collect::<Vec<_>>();
                let store = Arc::clone(&self.store);
                let action = policy.action;
                let entity_type = policy.entity_type;

                Some(tokio::spawn(async move {
                    match store.create_many(records).await {
                        Ok(entries) => {
                            debug!(
                                count = entries.len(),
                                action = %action,
                                entity_type = %entity_type,
                                "Audit log entries created"
                            );
                        },
                        Err(e) => {
                            error!(
                                error = %e,
                                action = %action,
                                entity_type = %entity_type,
                                "Failed to create bulk audit log entries"
                            );
                        },
                    }
                }))
            },
            EntityIdResolution::Unresolved => {
                warn!(
                    action = %policy.action,
                    entity_type = %policy.entity_type,
                    "Could not resolve entity id for audit log"
                );
                None
            },
        }
    }
}

fn new_record(
    policy: &AuditPolicy,
    context: &AuditContext,
    entity_id: String,
    changes: Option<AuditChanges>,
) -> NewAuditRecord {
    NewAuditRecord {
        actor_id: context.actor_id.clone(),
        action: policy.action,
        entity_type: policy.entity_type,
        entity_id,
        changes,
        ip_address: context.ip_address.clone(),
        user_agent: context.user_agent.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::models::{AuditAction, EntityType};
    use axum::http::HeaderValue;
    use serde_json::json;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    fn policy() -> AuditPolicy {
        AuditPolicy::new(AuditAction::Update, EntityType::Product)
    }

    #[test]
    fn test_context_forwarded_for_first_hop() {
        let request = AuditRequest::new()
            .with_headers(headers(&[
                ("x-forwarded-for", "10.0.0.1, 192.168.1.1, 172.16.0.1"),
                ("user-agent", "Mozilla/5.0"),
            ]))
            .with_peer_addr("127.0.0.1:4000".parse().unwrap())
            .with_actor("user_123");

        let context = AuditContext::from_request(&request);
        assert_eq!(context.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(context.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(context.actor_id.as_deref(), Some("user_123"));
    }

    #[test]
    fn test_context_falls_back_to_peer() {
        let peer = "192.168.0.7:5555".parse().unwrap();

        let request = AuditRequest::new().with_peer_addr(peer);
        assert_eq!(
            AuditContext::from_request(&request).ip_address.as_deref(),
            Some("192.168.0.7")
        );

        let request = AuditRequest::new()
            .with_headers(headers(&[("x-forwarded-for", " , 10.0.0.1")]))
            .with_peer_addr(peer);
        assert_eq!(
            AuditContext::from_request(&request).ip_address.as_deref(),
            Some("192.168.0.7")
        );

        assert_eq!(AuditContext::from_request(&AuditRequest::new()), AuditContext::default());
    }

    #[test]
    fn test_resolve_path_param() {
        let request = AuditRequest::new().with_path_param("productId", "p-42");
        let resolution = resolve_entity_id(
            &policy().from_path_param("productId"),
            &request,
            &JsonValue::Null,
        );
        assert_eq!(resolution, EntityIdResolution::Single("p-42".to_string()));
    }

    #[test]
    fn test_resolve_nested_response_path() {
        let policy = policy().from_response("data.entity.id");

        let result = json!({"data": {"entity": {"id": "nested-id"}}});
        assert_eq!(
            resolve_entity_id(&policy, &AuditRequest::new(), &result),
            EntityIdResolution::Single("nested-id".to_string())
        );

        let result = json!({"data": {"other": true}});
        assert_eq!(
            resolve_entity_id(&policy, &AuditRequest::new(), &result),
            EntityIdResolution::Unresolved
        );
    }

    #[test]
    fn test_resolve_body_path() {
        let request = AuditRequest::new().with_body(json!({"area": {"id": "a-1"}}));
        assert_eq!(
            resolve_entity_id(&policy().from_body("area.id"), &request, &JsonValue::Null),
            EntityIdResolution::Single("a-1".to_string())
        );
    }

    #[test]
    fn test_resolve_array_of_ids() {
        let policy = policy().from_response("succeeded");

        let result = json!({"succeeded": ["i-1", "i-2"], "failed": []});
        assert_eq!(
            resolve_entity_id(&policy, &AuditRequest::new(), &result),
            EntityIdResolution::Many(vec!["i-1".to_string(), "i-2".to_string()])
        );

        let result = json!({"succeeded": []});
        assert_eq!(
            resolve_entity_id(&policy, &AuditRequest::new(), &result),
            EntityIdResolution::Unresolved
        );

        let result = json!({"succeeded": ["i-1", 7]});
        assert_eq!(
            resolve_entity_id(&policy, &AuditRequest::new(), &result),
            EntityIdResolution::Unresolved
        );
    }

    #[test]
    fn test_declared_source_does_not_fall_back() {
        let request = AuditRequest::new().with_path_param("id", "p-1");
        let result = json!({"id": "p-2"});

        assert_eq!(
            resolve_entity_id(&policy().from_path_param("productId"), &request, &result),
            EntityIdResolution::Unresolved
        );
    }

    #[test]
    fn test_fallback_heuristics_order() {
        let request = AuditRequest::new().with_path_param("id", "from-path");
        let result = json!({"id": "from-response", "succeeded": ["x"]});
        assert_eq!(
            resolve_entity_id(&policy(), &request, &result),
            EntityIdResolution::Single("from-path".to_string())
        );

        assert_eq!(
            resolve_entity_id(&policy(), &AuditRequest::new(), &result),
            EntityIdResolution::Single("from-response".to_string())
        );

        let result = json!({"id": 17, "succeeded": ["x", "y"]});
        assert_eq!(
            resolve_entity_id(&policy(), &AuditRequest::new(), &result),
            EntityIdResolution::Many(vec!["x".to_string(), "y".to_string()])
        );

        assert_eq!(
            resolve_entity_id(&policy(), &AuditRequest::new(), &json!({"ok": true})),
            EntityIdResolution::Unresolved
        );
    }

    #[test]
    fn test_empty_string_is_no_value() {
        let request = AuditRequest::new().with_path_param("id", "");
        assert_eq!(
            resolve_entity_id(&policy().from_path_param("id"), &request, &JsonValue::Null),
            EntityIdResolution::Unresolved
        );
        assert_eq!(
            resolve_entity_id(&policy().from_response("id"), &request, &json!({"id": ""})),
            EntityIdResolution::Unresolved
        );
    }
}
