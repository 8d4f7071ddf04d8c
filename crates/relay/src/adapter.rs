//! Backend Adapter: exactly one provider call per relay request.

use crate::conversation::Outbound;
use agrishield_config::AppConfig;
use agrishield_core::{Provider, ProviderRequest, ProviderResponse, RelayError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Generation limits applied to every request.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: Option<f32>,
    pub timeout: Duration,
}

impl GenerationSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.resolved_model(),
            max_output_tokens: config.generation.max_output_tokens,
            temperature: config.generation.temperature,
            timeout: Duration::from_secs(config.relay.request_timeout_secs),
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Invokes the configured provider and classifies its failures.
pub struct BackendAdapter {
    provider: Arc<dyn Provider>,
    settings: GenerationSettings,
}

impl BackendAdapter {
    pub fn new(provider: Arc<dyn Provider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Send the outbound conversation once, bounded by the configured timeout.
    ///
    /// Never retries; a timeout is `BackendUnavailable`, not an empty reply.
    pub async fn invoke(&self, outbound: &Outbound) -> Result<ProviderResponse, RelayError> {
        let request = ProviderRequest {
            model: self.settings.model.clone(),
            system_instruction: outbound.system_instruction.clone(),
            messages: outbound.messages.clone(),
            temperature: self.settings.temperature,
            max_output_tokens: Some(self.settings.max_output_tokens),
        };

        let started = Instant::now();
        let outcome =
            tokio::time::timeout(self.settings.timeout, self.provider.complete(request)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(response)) => {
                debug!(
                    provider = %self.provider.name(),
                    model = %response.model,
                    elapsed_ms,
                    finish_reason = response.finish_reason.as_deref().unwrap_or("unknown"),
                    "Backend responded"
                );
                Ok(response)
            }
            Ok(Err(e)) => {
                warn!(
                    provider = %self.provider.name(),
                    elapsed_ms,
                    error = %e,
                    "Backend call failed"
                );
                Err(RelayError::from(e))
            }
            Err(_) => {
                warn!(
                    provider = %self.provider.name(),
                    timeout_secs = self.settings.timeout.as_secs(),
                    "Backend call timed out"
                );
                Err(RelayError::backend_unavailable(format!(
                    "backend did not respond within {}s",
                    self.settings.timeout.as_secs()
                )))
            }
        }
    }
}
