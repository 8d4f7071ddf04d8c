//! End-to-end tests for the AgriShield relay.
//!
//! These drive the full pipeline through the public crate APIs: config,
//! relay, retry decorator, and the HTTP gateway, with a scripted backend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agrishield_config::{AppConfig, PrimingStrategy};
use agrishield_core::{
    FailureKind, Language, Provider, ProviderError, ProviderRequest, ProviderResponse, Role,
    SessionId, Usage,
};
use agrishield_gateway::{GatewayState, build_router};
use agrishield_providers::RetryProvider;
use agrishield_relay::{Relay, RelayRequest};
use agrishield_weather::MockWeatherSource;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A backend that returns scripted outcomes in order and records requests.
struct ScriptedProvider {
    outcomes: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(outcomes: Vec<Result<&str, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into_iter().map(|o| o.map(str::to_string)).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn replies(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| Ok(*t)).collect())
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, i: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[i].clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedProvider exhausted"));
        outcome.map(|text| ProviderResponse {
            text,
            usage: Some(Usage {
                prompt_tokens: 120,
                completion_tokens: 40,
                total_tokens: 160,
            }),
            model: "scripted-model".into(),
            finish_reason: Some("STOP".into()),
        })
    }
}

/// A backend that never answers.
struct HangingProvider;

#[async_trait::async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        std::future::pending().await
    }
}

fn config(toml: &str) -> AppConfig {
    AppConfig::from_toml(toml).unwrap()
}

fn all_text(request: &ProviderRequest) -> String {
    let mut text = request.system_instruction.clone().unwrap_or_default();
    for m in &request.messages {
        text.push('\n');
        text.push_str(&m.content);
    }
    text
}

// ── Relay pipeline ───────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_hindi_farmer_with_location_and_date() {
    let backend = ScriptedProvider::replies(&["**बाढ़-सहनशील धान** लगाएँ, जैसे स्वर्ण-सब1।"]);
    let relay = Relay::from_config(backend.clone(), &AppConfig::default());

    let reply = relay
        .relay(
            RelayRequest::new(SessionId::from("farmer-1"), "बाढ़ के लिए कौन सी फसल?")
                .with_language("Hindi")
                .with_location(25.61, 85.14)
                .with_date("2026-07-14"),
        )
        .await
        .unwrap();

    assert_eq!(reply.language, Language::Hindi);
    assert!(reply.text.contains("स्वर्ण-सब1"));
    assert_eq!(reply.usage.unwrap().total_tokens, 160);

    let sent = backend.request(0);
    // Scripted priming: policy, acknowledgment, then the farmer's message.
    assert_eq!(sent.messages.len(), 3);
    assert_eq!(sent.messages[0].role, Role::System);
    assert_eq!(sent.messages[1].role, Role::Assistant);
    assert_eq!(sent.messages[2].content, "बाढ़ के लिए कौन सी फसल?");

    let text = all_text(&sent);
    assert!(text.contains("Respond ONLY in Hindi"));
    assert!(text.contains("Tuesday, July 14, 2026"));
    assert!(text.contains("the lower Gangetic plains"));
    assert!(!text.contains("25.61"));
    assert!(!text.contains("85.14"));
}

#[tokio::test]
async fn e2e_multi_turn_history_and_language_switch() {
    let backend = ScriptedProvider::replies(&["Raise seedbeds.", "Use Swarna-Sub1.", "சரி."]);
    let relay = Relay::from_config(backend.clone(), &AppConfig::default());
    let id = SessionId::from("farmer-2");

    relay.relay(RelayRequest::new(id.clone(), "Monsoon is coming.")).await.unwrap();
    relay.relay(RelayRequest::new(id.clone(), "Which rice?")).await.unwrap();
    let third = relay
        .relay(RelayRequest::new(id.clone(), "Tell me in Tamil").with_language("தமிழ்"))
        .await
        .unwrap();
    assert_eq!(third.language, Language::Tamil);

    // One priming exchange, then every prior turn in order.
    let sent = backend.request(2);
    let contents: Vec<_> = sent.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents.len(), 7);
    assert_eq!(&contents[2..], &[
        "Monsoon is coming.",
        "Raise seedbeds.",
        "Which rice?",
        "Use Swarna-Sub1.",
        "Tell me in Tamil",
    ]);
    // Priming is re-rendered with the language in force.
    assert!(contents[0].contains("Respond ONLY in Tamil"));
    assert!(contents[1].contains("respond only in Tamil"));

    let handle = relay.store().get(&id).await.unwrap();
    let session = handle.lock().await;
    assert_eq!(session.preferred_language, Language::Tamil);
    assert_eq!(session.transcript().count(), 6);
}

#[tokio::test]
async fn e2e_failure_mid_conversation_leaves_history_intact() {
    let backend = ScriptedProvider::new(vec![
        Ok("First answer."),
        Err(ProviderError::Network("connection reset".into())),
        Ok("   "),
        Ok("Second answer."),
    ]);
    let relay = Relay::from_config(backend.clone(), &AppConfig::default());
    let id = SessionId::from("farmer-3");

    relay.relay(RelayRequest::new(id.clone(), "q1")).await.unwrap();

    let err = relay.relay(RelayRequest::new(id.clone(), "q2")).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::BackendUnavailable);

    let err = relay.relay(RelayRequest::new(id.clone(), "q2 again")).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::EmptyCompletion);

    relay.relay(RelayRequest::new(id.clone(), "q3")).await.unwrap();

    // Failed exchanges never reached history.
    let contents: Vec<_> = backend
        .request(3)
        .messages
        .iter()
        .skip(2)
        .map(|m| m.content.clone())
        .collect();
    assert_eq!(contents, vec!["q1", "First answer.", "q3"]);
}

#[tokio::test]
async fn e2e_invalid_input_never_calls_backend() {
    let backend = ScriptedProvider::replies(&[]);
    let relay = Relay::from_config(backend.clone(), &config("[relay]\nmax_message_chars = 10\n"));

    for message in ["", "   \n\t", "this message is far too long"] {
        let err = relay
            .relay(RelayRequest::new(SessionId::from("farmer-4"), message))
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidInput);
    }
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn e2e_system_instruction_strategy_from_config() {
    let backend = ScriptedProvider::replies(&["One.", "Two."]);
    let cfg = config(
        r#"
[relay]
priming = "system_instruction"
fallback_language = "Bengali"
"#,
    );
    let relay = Relay::from_config(backend.clone(), &cfg);
    assert_eq!(relay.priming(), PrimingStrategy::SystemInstruction);

    let id = SessionId::from("farmer-5");
    let first = relay.relay(RelayRequest::new(id.clone(), "hello")).await.unwrap();
    assert_eq!(first.language, Language::Bengali);
    relay.relay(RelayRequest::new(id, "again")).await.unwrap();

    let sent = backend.request(1);
    let system = sent.system_instruction.unwrap();
    assert!(system.contains("Respond ONLY in Bengali"));
    assert!(sent.messages.iter().all(|m| m.role != Role::System));
    let contents: Vec<_> = sent.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["hello", "One.", "again"]);
}

#[tokio::test]
async fn e2e_identical_context_yields_identical_policy() {
    let backend = ScriptedProvider::replies(&["a", "b"]);
    let relay = Relay::from_config(backend.clone(), &AppConfig::default());

    for id in ["farmer-6", "farmer-7"] {
        relay
            .relay(
                RelayRequest::new(SessionId::from(id), "same question")
                    .with_language("Odia")
                    .with_location(20.46, 85.88)
                    .with_date("2026-08-01"),
            )
            .await
            .unwrap();
    }

    assert_eq!(backend.request(0).messages, backend.request(1).messages);
}

#[tokio::test]
async fn e2e_coordinates_echoed_by_backend_are_redacted() {
    let backend = ScriptedProvider::replies(&["At 26.14°N, 91.74°E expect heavy rain."]);
    let relay = Relay::from_config(backend, &AppConfig::default());

    let reply = relay
        .relay(
            RelayRequest::new(SessionId::from("farmer-8"), "Will it rain?")
                .with_location(26.14, 91.74),
        )
        .await
        .unwrap();

    assert!(!reply.text.contains("26.14"));
    assert!(!reply.text.contains("91.74"));
    assert!(reply.text.contains("your area"));
    assert!(reply.redactions >= 1);
}

#[tokio::test(start_paused = true)]
async fn e2e_configured_timeout_is_backend_unavailable() {
    let relay = Relay::from_config(
        Arc::new(HangingProvider),
        &config("[relay]\nrequest_timeout_secs = 5\n"),
    );

    let err = relay
        .relay(RelayRequest::new(SessionId::from("farmer-9"), "hello?"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::BackendUnavailable);
    assert!(err.detail.contains("5s"));
}

#[tokio::test(start_paused = true)]
async fn e2e_retry_decorator_recovers_from_transient_failure() {
    let backend = ScriptedProvider::new(vec![
        Err(ProviderError::RateLimited { retry_after_secs: 1 }),
        Ok("Recovered."),
    ]);
    let provider = Arc::new(RetryProvider::new(backend.clone(), 2, Duration::from_millis(200)));
    let relay = Relay::from_config(provider, &AppConfig::default());

    let reply = relay
        .relay(RelayRequest::new(SessionId::from("farmer-10"), "hello"))
        .await
        .unwrap();
    assert_eq!(reply.text, "Recovered.");
    assert_eq!(backend.calls(), 2);
    // The identical request was resent.
    assert_eq!(backend.request(0).messages, backend.request(1).messages);
}

// ── Gateway round trip ───────────────────────────────────────────────────

#[tokio::test]
async fn e2e_gateway_chat_then_transcript() {
    let backend = ScriptedProvider::replies(&["Build bunds.", "Plant on ridges."]);
    let config = AppConfig::default();
    let state = Arc::new(GatewayState {
        relay: Arc::new(Relay::from_config(backend.clone(), &config)),
        weather: Arc::new(MockWeatherSource::new()),
        config,
    });

    let mut session_id = String::new();
    for message in ["How do I stop water entering?", "And my vegetables?"] {
        let mut body = serde_json::json!({"message": message, "language": "en"});
        if !session_id.is_empty() {
            body["session_id"] = session_id.clone().into();
        }
        let req = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = build_router(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        session_id = json["session_id"].as_str().unwrap().to_string();
    }
    assert_eq!(backend.calls(), 2);

    let req = Request::builder()
        .uri(format!("/api/sessions/{session_id}"))
        .body(Body::empty())
        .unwrap();
    let response = build_router(state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["language"], "English");
    let turns: Vec<_> = json["turns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        turns,
        vec![
            "How do I stop water entering?",
            "Build bunds.",
            "And my vegetables?",
            "Plant on ridges.",
        ]
    );
}

#[tokio::test]
async fn e2e_config_round_trips_through_default_toml() {
    let parsed = config(&AppConfig::default_toml());
    assert_eq!(parsed.provider, "gemini");
    assert_eq!(parsed.relay.priming, PrimingStrategy::ScriptedHistory);
    assert_eq!(parsed.relay.fallback(), Language::English);
}
