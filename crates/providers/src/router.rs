//! Provider router: builds the configured generative-language backend.
//!
//! `provider = "gemini"` selects the native generateContent client; every
//! other name is treated as an OpenAI-compatible endpoint.

use agrishield_config::AppConfig;
use agrishield_core::error::ProviderError;
use agrishield_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::gemini::GeminiProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::retry::RetryProvider;

/// Build the provider named by `config.provider`.
///
/// Per-provider `[providers.<name>]` settings win over the top-level
/// `api_key`. When `relay.max_retries` is non-zero the provider is wrapped
/// in a [`RetryProvider`].
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.provider.as_str();
    let provider_config = config.providers.get(name);

    let api_key = provider_config
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone())
        .unwrap_or_default();

    let api_url = provider_config.and_then(|p| p.api_url.clone());

    let provider: Arc<dyn Provider> = if name == "gemini" {
        let base_url = api_url.unwrap_or_else(|| default_base_url(name));
        Arc::new(GeminiProvider::with_base_url(api_key, base_url)?)
    } else {
        let base_url = api_url.unwrap_or_else(|| default_base_url(name));
        Arc::new(OpenAiCompatProvider::new(name, base_url, api_key)?)
    };

    info!(provider = %name, model = %config.resolved_model(), "Provider configured");

    if config.relay.max_retries > 0 {
        return Ok(Arc::new(RetryProvider::new(
            provider,
            config.relay.max_retries,
            Duration::from_millis(config.relay.retry_backoff_ms),
        )));
    }

    Ok(provider)
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "gemini" => crate::gemini::DEFAULT_BASE_URL.into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
