//! Error types for the AgriShield domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Backend transport failures (`ProviderError`) are classified into the
//! relay's small, caller-facing taxonomy (`FailureKind`) before they leave
//! the core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The caller-facing failure taxonomy of a relay request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Missing/empty/oversized message; rejected before any backend call.
    InvalidInput,
    /// Network failure, timeout, or a non-2xx backend response.
    BackendUnavailable,
    /// The backend answered but produced no usable text.
    EmptyCompletion,
    /// The backend signaled quota exhaustion.
    RateLimited,
}

impl FailureKind {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::BackendUnavailable => "backend_unavailable",
            Self::EmptyCompletion => "empty_completion",
            Self::RateLimited => "rate_limited",
        }
    }

    /// HTTP status a transport layer should use for this kind.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput => 400,
            Self::BackendUnavailable | Self::EmptyCompletion => 502,
            Self::RateLimited => 429,
        }
    }

    /// Short, non-technical apology shown to the farmer.
    pub fn apology(&self) -> &'static str {
        match self {
            Self::InvalidInput => {
                "Sorry, I couldn't read that message. Please check it and try again."
            }
            Self::BackendUnavailable => {
                "Sorry, I'm having trouble connecting. Please try again later."
            }
            Self::EmptyCompletion => {
                "Sorry, I couldn't put together an answer. Please try asking again."
            }
            Self::RateLimited => {
                "Sorry, too many people are asking right now. Please wait a moment and try again."
            }
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A classified relay failure. `detail` is diagnostic only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct RelayError {
    pub kind: FailureKind,
    pub detail: String,
}

impl RelayError {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn invalid_input(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidInput, detail)
    }

    pub fn backend_unavailable(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::BackendUnavailable, detail)
    }

    pub fn empty_completion(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::EmptyCompletion, detail)
    }

    pub fn rate_limited(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::RateLimited, detail)
    }
}

/// Errors raised by a generative-language backend.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Whether resending the identical request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimited { .. } => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

    /// The relay failure kind this backend error maps to.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::ApiError {
                status_code: 429, ..
            } => FailureKind::RateLimited,
            Self::MalformedResponse(_) => FailureKind::EmptyCompletion,
            Self::ApiError { .. }
            | Self::AuthenticationFailed(_)
            | Self::NotConfigured(_)
            | Self::Timeout(_)
            | Self::Network(_) => FailureKind::BackendUnavailable,
        }
    }
}

impl From<ProviderError> for RelayError {
    fn from(err: ProviderError) -> Self {
        RelayError::new(err.failure_kind(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = ProviderError::ApiError {
            status_code: 503,
            message: "Service Unavailable".into(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("Service Unavailable"));
    }

    #[test]
    fn provider_errors_map_to_failure_kinds() {
        assert_eq!(
            ProviderError::Timeout("60s".into()).failure_kind(),
            FailureKind::BackendUnavailable
        );
        assert_eq!(
            ProviderError::Network("refused".into()).failure_kind(),
            FailureKind::BackendUnavailable
        );
        assert_eq!(
            ProviderError::RateLimited { retry_after_secs: 5 }.failure_kind(),
            FailureKind::RateLimited
        );
        assert_eq!(
            ProviderError::ApiError {
                status_code: 429,
                message: "quota".into()
            }
            .failure_kind(),
            FailureKind::RateLimited
        );
        assert_eq!(
            ProviderError::MalformedResponse("bad json".into()).failure_kind(),
            FailureKind::EmptyCompletion
        );
        assert_eq!(
            ProviderError::AuthenticationFailed("bad key".into()).failure_kind(),
            FailureKind::BackendUnavailable
        );
    }

    #[test]
    fn retryable_errors() {
        assert!(ProviderError::Network("reset".into()).is_retryable());
        assert!(
            ProviderError::ApiError {
                status_code: 502,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            !ProviderError::ApiError {
                status_code: 400,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(!ProviderError::AuthenticationFailed("x".into()).is_retryable());
    }

    #[test]
    fn relay_error_from_provider_error_keeps_detail() {
        let err: RelayError = ProviderError::Network("connection refused".into()).into();
        assert_eq!(err.kind, FailureKind::BackendUnavailable);
        assert!(err.detail.contains("connection refused"));
    }

    #[test]
    fn failure_kind_codes_and_statuses() {
        assert_eq!(FailureKind::InvalidInput.http_status(), 400);
        assert_eq!(FailureKind::RateLimited.http_status(), 429);
        assert_eq!(FailureKind::EmptyCompletion.code(), "empty_completion");
        assert_eq!(
            FailureKind::InvalidInput.apology(),
            "Sorry, I couldn't read that message. Please check it and try again."
        );
        let json = serde_json::to_string(&FailureKind::BackendUnavailable).unwrap();
        assert_eq!(json, "\"backend_unavailable\"");
    }
}
