//! Middleware for the Shelf server
//!
//! - CORS (Cross-Origin Resource Sharing)
//! - Request logging with tracing
//! - Actor identification for audit capture

use axum::{
    extract::Request,
    http::{header, HeaderName, Method},
    middleware::Next,
    response::Response,
};
use std::time::Duration;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;

use crate::audit::AuthenticatedActor;
use crate::config::CorsConfig;

/// Header carrying the authenticated principal, set by the upstream gateway
pub const ACTOR_HEADER: &str = "x-user-id";

/// Create CORS layer from configuration
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(ACTOR_HEADER),
        ])
        .max_age(Duration::from_secs(3600));

    if config.allowed_origins.is_empty() || config.allowed_origins.iter().any(|o| o == "*") {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);

        // Credentials cannot be combined with a wildcard origin
        if config.allow_credentials {
            cors = cors.allow_credentials(true);
        }
    }

    cors
}

/// Create tracing/logging layer
pub fn tracing_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Micros),
        )
}

/// Attach the [`AuthenticatedActor`] named by the `x-user-id` header
///
/// Authentication happens upstream; this only carries the resolved identity
/// to the audit layer. Use with `axum::middleware::from_fn`.
pub async fn identify_actor(mut request: Request, next: Next) -> Response {
    let actor = request
        .headers()
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| AuthenticatedActor(v.to_string()));

    if let Some(actor) = actor {
        request.extensions_mut().insert(actor);
    }

    next.run(request).await
}
