//! The relay orchestrator.
//!
//! One call to [`Relay::relay`] runs the whole pipeline for a single user
//! message:
//!
//! 1. **Validate** the message (rejected before any backend call)
//! 2. **Build context** from the optional location and date
//! 3. **Compile** the policy prompt for the language in force
//! 4. **Prepare** the outbound conversation from the session's history
//! 5. **Invoke** the backend exactly once
//! 6. **Normalize** the reply, then commit the exchange to the session
//!
//! The session lock is held from step 4 to step 6, so one session never has
//! two requests in flight. Any failure returns before the commit.

use crate::adapter::{BackendAdapter, GenerationSettings};
use crate::context::SituationalContext;
use crate::conversation::ConversationManager;
use crate::normalizer;
use crate::policy::{self, PolicyPrompt};
use crate::store::SessionStore;
use agrishield_config::{AppConfig, PrimingStrategy};
use agrishield_core::{Language, Provider, RelayError, SessionId, Usage};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Outcome of one relay request.
pub type RelayResult = Result<RelayReply, RelayError>;

/// One inbound message with its ephemeral context.
#[derive(Clone)]
pub struct RelayRequest {
    pub session_id: SessionId,
    pub message: String,

    /// Requested language; `None` keeps the session's current language.
    pub language: Option<String>,

    /// Raw `(lat, lon)`; invalid pairs are treated as absent.
    pub location: Option<(f64, f64)>,

    /// ISO-8601 date or timestamp.
    pub date: Option<String>,
}

impl RelayRequest {
    pub fn new(session_id: SessionId, message: impl Into<String>) -> Self {
        Self {
            session_id,
            message: message.into(),
            language: None,
            location: None,
            date: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.location = Some((lat, lon));
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }
}

impl std::fmt::Debug for RelayRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayRequest")
            .field("session_id", &self.session_id)
            .field("message", &self.message)
            .field("language", &self.language)
            .field("location", &self.location.map(|_| "[REDACTED]"))
            .field("date", &self.date)
            .finish()
    }
}

/// A successful, normalized reply.
#[derive(Debug, Clone)]
pub struct RelayReply {
    pub text: String,
    pub session_id: SessionId,
    pub language: Language,
    /// Coordinate echoes removed from the backend text.
    pub redactions: usize,
    pub usage: Option<Usage>,
}

/// Limits applied before a message reaches the pipeline.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub fallback_language: Language,
    pub max_message_chars: usize,
}

impl RelaySettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            fallback_language: config.relay.fallback(),
            max_message_chars: config.relay.max_message_chars,
        }
    }
}

/// The conversational policy relay.
pub struct Relay {
    store: Arc<SessionStore>,
    adapter: BackendAdapter,
    conversation: ConversationManager,
    settings: RelaySettings,
}

impl Relay {
    /// Build a relay from configuration around an already-built provider.
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self::new(
            provider,
            Arc::new(SessionStore::from_config(&config.relay)),
            GenerationSettings::from_config(config),
            config.relay.priming,
            RelaySettings::from_config(config),
        )
    }

    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<SessionStore>,
        generation: GenerationSettings,
        priming: PrimingStrategy,
        settings: RelaySettings,
    ) -> Self {
        Self {
            store,
            adapter: BackendAdapter::new(provider, generation),
            conversation: ConversationManager::new(priming),
            settings,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn provider_name(&self) -> &str {
        self.adapter.provider_name()
    }

    pub fn model(&self) -> &str {
        &self.adapter.settings().model
    }

    pub fn priming(&self) -> PrimingStrategy {
        self.conversation.strategy()
    }

    /// Resolve a requested language; unknown names fall back with a warning.
    pub fn resolve_language(&self, requested: &str) -> Language {
        Language::parse(requested).unwrap_or_else(|| {
            if !requested.trim().is_empty() {
                warn!(
                    requested,
                    fallback = %self.settings.fallback_language,
                    "Unsupported language, using fallback"
                );
            }
            self.settings.fallback_language
        })
    }

    /// The policy prompt a request with these fields would be sent with.
    pub fn preview_prompt(
        &self,
        language: Option<&str>,
        location: Option<(f64, f64)>,
        date: Option<&str>,
    ) -> PolicyPrompt {
        let language = language
            .map(|l| self.resolve_language(l))
            .unwrap_or(self.settings.fallback_language);
        policy::compile(&SituationalContext::build(location, date), language)
    }

    /// Run one message through the pipeline.
    pub async fn relay(&self, request: RelayRequest) -> RelayResult {
        let started = Instant::now();
        let message = self.validate(&request.message)?;

        let context = SituationalContext::build(request.location, request.date.as_deref());
        let requested = request.language.as_deref().map(|l| self.resolve_language(l));

        let handle = self
            .store
            .get_or_create(
                &request.session_id,
                requested.unwrap_or(self.settings.fallback_language),
            )
            .await?;
        let mut session = handle.lock().await;

        let language = requested.unwrap_or(session.preferred_language);
        let prompt = policy::compile(&context, language);
        let outbound = self.conversation.prepare(&session, &prompt, language, message);

        info!(
            session_id = %request.session_id,
            language = %language,
            has_location = context.has_location(),
            priming = outbound.is_priming(),
            history = outbound.messages.len(),
            "Relaying message"
        );

        let response = self
            .adapter
            .invoke(&outbound)
            .await
            .map_err(|e| normalizer::scrub_error(e, &context))?;

        let normalized = normalizer::normalize(&response.text, &context).inspect_err(|e| {
            warn!(session_id = %request.session_id, kind = %e.kind, "Backend reply rejected");
        })?;

        self.conversation.commit(&mut session, outbound, &normalized.text);

        info!(
            session_id = %request.session_id,
            turns = session.turns.len(),
            redactions = normalized.redactions,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Relay complete"
        );

        Ok(RelayReply {
            text: normalized.text,
            session_id: request.session_id,
            language,
            redactions: normalized.redactions,
            usage: response.usage,
        })
    }

    fn validate<'a>(&self, message: &'a str) -> Result<&'a str, RelayError> {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Err(RelayError::invalid_input("message is required"));
        }
        let chars = trimmed.chars().count();
        if chars > self.settings.max_message_chars {
            return Err(RelayError::invalid_input(format!(
                "message is {chars} characters; the limit is {}",
                self.settings.max_message_chars
            )));
        }
        Ok(trimmed)
    }
}
