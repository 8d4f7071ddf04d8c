//! JSON API handlers.
//!
//! Endpoints:
//!
//! - `POST   /api/chat`           Relay one message, get the assistant reply
//! - `GET    /api/sessions/{id}`  Visible transcript of a session
//! - `DELETE /api/sessions/{id}`  End a session
//! - `GET    /api/weather`        Weather report for `?lat=&lon=`

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use agrishield_core::{Coordinates, FailureKind, RelayError, SessionId, Speaker};
use agrishield_relay::RelayRequest;
use agrishield_weather::WeatherReport;

use crate::SharedState;

/// Header clients may use instead of `session_id` in the body.
pub const SESSION_HEADER: &str = "x-session-id";

const MAX_SESSION_ID_LEN: usize = 128;

/// Fixed detail for unparseable chat bodies; serde's own message quotes the
/// offending value, which may be a raw coordinate.
const INVALID_CHAT_BODY: &str =
    "request body must be JSON with a text \"message\" and optional numeric location.lat/lon";

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub location: Option<LocationInput>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Deserialize)]
pub struct LocationInput {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub language: String,
}

/// Failure payload. `details` is diagnostic only.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub kind: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub language: String,
    pub created_at: String,
    pub turns: Vec<TurnDto>,
}

#[derive(Serialize)]
pub struct TurnDto {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: String,
}

#[derive(Deserialize)]
pub struct WeatherQuery {
    pub lat: f64,
    pub lon: f64,
}

// ── Errors ────────────────────────────────────────────────────────────────

/// An error response with its HTTP status.
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn invalid_input(details: impl Into<String>) -> Self {
        Self::from(RelayError::invalid_input(details))
    }

    fn not_found(what: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorResponse {
                error: format!("{what} not found"),
                details: None,
                kind: "not_found".into(),
            },
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        Self {
            status: StatusCode::from_u16(err.kind.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: ErrorResponse {
                error: err.kind.apology().into(),
                details: (!err.detail.is_empty()).then_some(err.detail),
                kind: err.kind.code().into(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

pub async fn chat_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        debug!(status = %rejection.status(), "Rejected chat body");
        ApiError::invalid_input(INVALID_CHAT_BODY)
    })?;

    let session_id = resolve_session_id(payload.session_id.as_deref(), &headers)?;

    let mut request = RelayRequest::new(session_id, payload.message);
    request.language = payload.language;
    request.location = payload.location.map(|l| (l.lat, l.lon));
    request.date = payload.date;

    match state.relay.relay(request).await {
        Ok(reply) => Ok(Json(ChatResponse {
            response: reply.text,
            session_id: reply.session_id.to_string(),
            language: reply.language.name().into(),
        })),
        Err(e) => {
            if e.kind != FailureKind::InvalidInput {
                warn!(kind = %e.kind, "Chat request failed");
            }
            Err(e.into())
        }
    }
}

pub async fn get_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let handle = state
        .relay
        .store()
        .get(&SessionId::from(&id))
        .await
        .ok_or_else(|| ApiError::not_found("session"))?;

    let session = handle.lock().await;
    Ok(Json(SessionResponse {
        session_id: session.id.to_string(),
        language: session.preferred_language.name().into(),
        created_at: session.created_at.to_rfc3339(),
        turns: session
            .transcript()
            .map(|t| TurnDto {
                speaker: t.speaker,
                text: t.text.clone(),
                timestamp: t.timestamp.to_rfc3339(),
            })
            .collect(),
    }))
}

pub async fn delete_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.relay.store().end(&SessionId::from(&id)).await {
        info!(session_id = %id, "Session ended by client");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("session"))
    }
}

pub async fn weather_handler(
    State(state): State<SharedState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<Json<WeatherReport>, ApiError> {
    let Query(query) =
        query.map_err(|_| ApiError::invalid_input("lat and lon are required numbers"))?;
    let coordinates = Coordinates::new(query.lat, query.lon).ok_or_else(|| {
        ApiError::invalid_input("lat must be within [-90, 90] and lon within [-180, 180]")
    })?;

    state.weather.report(coordinates).await.map(Json).map_err(|e| {
        warn!(weather_source = %state.weather.name(), error = %e, "Weather lookup failed");
        ApiError {
            status: StatusCode::BAD_GATEWAY,
            body: ErrorResponse {
                error: "Weather data is unavailable right now. Please try again later.".into(),
                details: None,
                kind: "weather_unavailable".into(),
            },
        }
    })
}

/// Body field wins over the header; with neither, a new id is minted.
fn resolve_session_id(from_body: Option<&str>, headers: &HeaderMap) -> Result<SessionId, ApiError> {
    let from_header = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok());

    match from_body.or(from_header).map(str::trim) {
        None => Ok(SessionId::new()),
        Some(id) if id.is_empty() || id.len() > MAX_SESSION_ID_LEN => Err(ApiError::invalid_input(
            format!("session_id must be 1-{MAX_SESSION_ID_LEN} characters"),
        )),
        Some(id) => Ok(SessionId::from(id)),
    }
}
