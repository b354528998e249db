//! ecometer: an HTTP webhook estimating the energy and carbon footprint of
//! AI model inference calls.
//!
//! The pipeline behind `POST /calculate` resolves a possibly misspelled or
//! versioned model identifier to a canonical name (typo normalizer, static
//! mapping table, or the dynamic model registry), checks that the impact
//! oracle supports it, and returns deterministic energy/emission figures
//! with a per-call identifier.

pub mod config;
pub mod middleware;
pub mod models;
pub mod normalize;
pub mod observability;
pub mod oracle;
pub mod registry;
pub mod routes;
pub mod services;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Shared application state threaded through every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::EcometerConfig>,
    pub oracle: Arc<dyn oracle::ImpactOracle>,
    /// Dynamic model registry; absent when disabled in config, in which
    /// case the calculation service uses the static mapping table.
    pub registry: Option<Arc<registry::ModelRegistry>>,
    pub services: services::Services,
    /// Per-IP request limiter; absent when rate limiting is disabled.
    pub rate_limiter: Option<Arc<middleware::RateLimiter>>,
}

impl AppState {
    pub fn new(config: config::EcometerConfig, oracle: Arc<dyn oracle::ImpactOracle>) -> Self {
        let config = Arc::new(config);

        let registry = config
            .registry
            .enabled
            .then(|| Arc::new(registry::ModelRegistry::new(oracle.clone(), &config.registry)));

        let services = services::Services::new(oracle.clone(), registry.clone(), &config.registry);

        let rate_limiter = config.limits.enabled.then(|| {
            Arc::new(middleware::RateLimiter::new(
                config.limits.requests_per_minute,
                Duration::from_secs(60),
            ))
        });

        Self {
            config,
            oracle,
            registry,
            services,
            rate_limiter,
        }
    }
}

/// Build the application router with all routes and middleware attached.
pub fn build_app(state: AppState) -> Router {
    // Layers execute top-down: rate limiting first, then auth, then the
    // signature check (which buffers the body), then the handler.
    let calculate_routes = Router::new()
        .route("/calculate", post(routes::calculate::calculate))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::webhook_signature_middleware,
        ))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::api_key_middleware,
        ))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit_middleware,
        ));

    let model_routes = Router::new()
        .route("/models", get(routes::models::list_models))
        .route("/models/supported", get(routes::models::supported_models))
        .route("/models/search", get(routes::models::search_models))
        .route("/models/match", get(routes::models::match_model))
        .route("/models/refresh", post(routes::models::refresh_models))
        .route("/models/providers", get(routes::models::providers))
        .route("/models/validate/{name}", get(routes::models::validate_model))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/health/live", get(routes::health::liveness))
        .route("/health/ready", get(routes::health::readiness))
        .merge(calculate_routes)
        .merge(model_routes)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(
            state.config.server.body_limit_bytes,
        ));

    if let Some(cors) = state.config.server.cors.clone().into_layer() {
        app = app.layer(cors);
    }

    app.with_state(state)
}
