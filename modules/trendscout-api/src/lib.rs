use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

use trendscout::{QuotaGovernor, TrendService};

pub mod error;
pub mod rest;

pub struct AppState {
    pub service: Arc<TrendService>,
    pub quota: Arc<dyn QuotaGovernor>,
    /// Include internal error details in 500 bodies. Development only.
    pub expose_internal_errors: bool,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        .route("/api/trends", post(rest::trends::api_analyze))
        .route("/api/trends/history", get(rest::trends::api_history))
        .route("/api/keywords", post(rest::keywords::api_keywords))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Reports are per request; caching happens server side
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Method + path only; topics and user ids stay out of request spans
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
