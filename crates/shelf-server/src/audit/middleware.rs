//! HTTP capture layer
//!
//! Looks up the policy for the matched route and, for routes that have one,
//! feeds the request and the successful response through [`AuditCapture`].
//! Routes without a policy pass through untouched.
//!
//! The layer must be applied with `Router::layer` so that [`MatchedPath`] and
//! the path parameters are available when it runs.

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, FromRequestParts, MatchedPath, RawPathParams, Request},
    response::Response,
};
use futures::stream;
use http_body_util::BodyExt;
use serde_json::Value as JsonValue;
use std::{
    collections::HashMap,
    future::Future,
    net::SocketAddr,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::capture::{AuditCapture, AuditRequest, AuthenticatedActor};
use super::models::AuditChanges;
use super::policy::{AuditPolicy, PolicyRegistry};

/// Audit capture layer
#[derive(Clone)]
pub struct AuditLayer {
    capture: AuditCapture,
    policies: Arc<PolicyRegistry>,
    enabled: bool,
}

impl AuditLayer {
    pub fn new(capture: AuditCapture, policies: PolicyRegistry) -> Self {
        Self {
            capture,
            policies: Arc::new(policies),
            enabled: true,
        }
    }

    /// A disabled layer forwards every request untouched
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl<S> Layer<S> for AuditLayer {
    type Service = AuditMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuditMiddleware {
            inner,
            capture: self.capture.clone(),
            policies: Arc::clone(&self.policies),
            enabled: self.enabled,
        }
    }
}

/// Audit capture service
#[derive(Clone)]
pub struct AuditMiddleware<S> {
    inner: S,
    capture: AuditCapture,
    policies: Arc<PolicyRegistry>,
    enabled: bool,
}

impl<S> AuditMiddleware<S> {
    fn policy_for(&self, request: &Request) -> Option<AuditPolicy> {
        if !self.enabled {
            return None;
        }
        let route = request.extensions().get::<MatchedPath>()?;
        self.policies.get(request.method(), route.as_str()).cloned()
    }
}

impl<S> Service<Request> for AuditMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let Some(policy) = self.policy_for(&request) else {
            return Box::pin(self.inner.call(request));
        };

        // The clone may not be ready; hand the driven service to the future
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let capture = self.capture.clone();

        Box::pin(async move {
            let method = request.method().clone();
            let uri = request.uri().clone();
            let (mut parts, body) = request.into_parts();

            let path_params: HashMap<String, String> =
                match RawPathParams::from_request_parts(&mut parts, &()).await {
                    Ok(params) => params
                        .iter()
                        .map(|(name, value)| (name.to_string(), value.to_string()))
                        .collect(),
                    Err(_) => HashMap::new(),
                };

            let body_bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    warn!(
                        method = %method,
                        uri = %uri,
                        error = %e,
                        "Failed to capture request body, skipping audit"
                    );
                    // The handler observes the same read failure
                    let request = Request::from_parts(parts, failed_body(e));
                    return inner.call(request).await;
                },
            };

            // Goes through the extractor so `MockConnectInfo` is honoured too
            let peer_addr = ConnectInfo::<SocketAddr>::from_request_parts(&mut parts, &())
                .await
                .ok()
                .map(|ConnectInfo(addr)| addr);

            let audit_request = AuditRequest {
                path_params,
                body: parse_json(&body_bytes),
                headers: parts.headers.clone(),
                actor: parts.extensions.get::<AuthenticatedActor>().cloned(),
                peer_addr,
            };

            // Reconstruct request with captured body
            let request = Request::from_parts(parts, Body::from(body_bytes));

            let response = inner.call(request).await?;

            if !response.status().is_success() {
                debug!(
                    method = %method,
                    uri = %uri,
                    status = %response.status(),
                    "Skipping audit for unsuccessful response"
                );
                return Ok(response);
            }

            let (parts, body) = response.into_parts();
            let response_bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    warn!(
                        method = %method,
                        uri = %uri,
                        error = %e,
                        "Failed to capture response body, skipping audit"
                    );
                    return Ok(Response::from_parts(parts, failed_body(e)));
                },
            };

            let changes = parts.extensions.get::<AuditChanges>().cloned();
            drop(capture.capture_success(
                Some(&policy),
                &audit_request,
                &parse_json(&response_bytes),
                changes,
            ));

            Ok(Response::from_parts(parts, Body::from(response_bytes)))
        })
    }
}

/// A body whose only frame is `error`
fn failed_body(error: axum::Error) -> Body {
    Body::from_stream(stream::once(async move { Err::<Bytes, _>(error) }))
}

fn parse_json(bytes: &Bytes) -> JsonValue {
    if bytes.is_empty() {
        return JsonValue::Null;
    }
    serde_json::from_slice(bytes).unwrap_or(JsonValue::Null)
}
