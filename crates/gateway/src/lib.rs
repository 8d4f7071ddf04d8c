//! HTTP gateway for AgriShield.
//!
//! Exposes the relay and the weather source as a small JSON API, plus a
//! health check. Built on Axum.

pub mod api;

use axum::extract::{DefaultBodyLimit, Request};
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::{Router, extract::State, response::Json, routing::get, routing::post};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Span, info, info_span, warn};

use agrishield_config::AppConfig;
use agrishield_relay::Relay;
use agrishield_weather::WeatherSource;

/// Request body limit for every route.
pub const BODY_LIMIT_BYTES: usize = 64 * 1024;

/// How often idle sessions are pruned while serving.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Shared application state for the gateway.
pub struct GatewayState {
    pub relay: Arc<Relay>,
    pub weather: Arc<dyn WeatherSource>,
    pub config: AppConfig,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - CORS restricted to `gateway.allowed_origins`
/// - Request body size limit (64 KiB)
/// - HTTP trace logging (method and path only)
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.gateway.allowed_origins);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(api::chat_handler))
        .route(
            "/api/sessions/{id}",
            get(api::get_session_handler).delete(api::delete_session_handler),
        )
        .route("/api/weather", get(api::weather_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
}

/// Request span with the path only; query strings can carry coordinates.
fn request_span(request: &Request) -> Span {
    info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
    )
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(api::SESSION_HEADER),
        ])
        .max_age(Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
///
/// Builds the provider, relay, and weather source once and shares them
/// through the router state.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    if !config.has_api_key() && config.provider != "ollama" {
        warn!(
            provider = %config.provider,
            "No API key configured; chat requests will fail until one is set"
        );
    }

    let provider = agrishield_providers::build_from_config(&config)?;
    let relay = Arc::new(Relay::from_config(provider, &config));
    let weather = agrishield_weather::build_from_config(&config.weather)?;

    let pruner = relay.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            pruner.store().prune_idle().await;
        }
    });

    let state = Arc::new(GatewayState {
        relay,
        weather,
        config,
    });

    info!(
        addr = %addr,
        provider = %state.relay.provider_name(),
        model = %state.relay.model(),
        priming = ?state.relay.priming(),
        "Gateway starting"
    );

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    provider: String,
    model: String,
    sessions: usize,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.relay.provider_name().to_string(),
        model: state.relay.model().to_string(),
        sessions: state.relay.store().len().await,
    })
}
