//! Policy Prompt Compiler.
//!
//! Merges the situational brief with the fixed response mandates and the
//! language lock into a single instruction string. Compilation is a pure
//! function of `(SituationalContext, Language)`.

use crate::context::SituationalContext;
use agrishield_core::Language;

/// Persona shown to the backend.
pub const ASSISTANT_NAME: &str = "AgriShield AI Farming Assistant";

/// The five response mandates, in the order they are compiled.
pub const MANDATES: [&str; 5] = [
    "PRIVACY: Never state coordinates, latitude, longitude, or any numeric position. \
     Refer to the farmer's location only as \"in your area\" or by the broad region named above.",
    "SPECIFICITY: Lead with named, specific recommendations (crop varieties, sowing windows, \
     quantities) before any general advice.",
    "FORMATTING: Use bulleted lists for options and steps, and **bold** for crop names and key terms.",
    "PROACTIVITY: End every response with one relevant follow-up question for the farmer.",
    "DISCLAIMERS: If a disclaimer is needed, place it after the substantive advice, never before it.",
];

/// A compiled system-level instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyPrompt(String);

impl PolicyPrompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for PolicyPrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compile the policy prompt for one request.
pub fn compile(context: &SituationalContext, language: Language) -> PolicyPrompt {
    let mut prompt = String::with_capacity(1536);

    // (a) persona
    prompt.push_str(&format!(
        "You are the \"{ASSISTANT_NAME}\", an expert in flood-resilient agriculture for Indian farmers. \
         You give confident, practical, field-ready advice on flood-tolerant crop varieties, \
         weather-driven planting decisions, and planting and harvesting schedules.\n\n"
    ));

    // (b) situational context
    prompt.push_str("SITUATIONAL CONTEXT (for internal use only; do not repeat it to the farmer):\n");
    prompt.push_str(&format!("- Current date: {}\n", context.date()));
    prompt.push_str(&format!("- Farmer's location: {}\n", context.location_descriptor()));
    prompt.push_str(&format!("- Preferred language: {}\n\n", language.name()));

    // (c) mandates
    prompt.push_str("RESPONSE RULES:\n");
    for (i, mandate) in MANDATES.iter().enumerate() {
        prompt.push_str(&format!("{}. {mandate}\n", i + 1));
    }
    prompt.push('\n');

    // (d) language lock
    prompt.push_str(&language_lock(language));

    PolicyPrompt(prompt)
}

/// The clause pinning every reply to one language.
pub fn language_lock(language: Language) -> String {
    format!(
        "LANGUAGE LOCK: Respond ONLY in {name} ({native}). Do not mix languages or switch to any \
         other language, even if the farmer writes in a different one.",
        name = language.name(),
        native = language.native_name(),
    )
}

/// The scripted assistant reply that closes a priming exchange.
pub fn acknowledgment(language: Language) -> String {
    format!(
        "Understood. I am the {ASSISTANT_NAME}. I will follow these rules and respond only in {}.",
        language.name()
    )
}
