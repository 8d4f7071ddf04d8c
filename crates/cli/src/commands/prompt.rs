//! `agrishield prompt`: print the compiled policy prompt.
//!
//! Useful for checking what the backend is told for a given language,
//! location, and date. Coordinates never appear in the output.

use agrishield_config::AppConfig;
use agrishield_relay::{PolicyPrompt, Relay};

use crate::ContextArgs;

pub async fn run(context: ContextArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let provider = agrishield_providers::build_from_config(&config)?;
    let relay = Relay::from_config(provider, &config);

    println!("{}", compile(&relay, &context));
    Ok(())
}

fn compile(relay: &Relay, context: &ContextArgs) -> PolicyPrompt {
    relay.preview_prompt(
        context.language.as_deref(),
        context.location(),
        Some(&context.date_or_today()),
    )
}
