//! Generative-language backends for AgriShield.
//!
//! All providers implement the `agrishield_core::Provider` trait.
//! The router builds the configured one.

pub mod gemini;
pub mod openai_compat;
pub mod retry;
pub mod router;

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use retry::RetryProvider;
pub use router::build_from_config;
