//! # AgriShield Core
//!
//! Domain types, traits, and error definitions for the AgriShield
//! conversational relay. This crate has **no framework dependencies**: it
//! defines the domain model every other crate implements against.
//!
//! ## Design Philosophy
//!
//! The generative-language backend is a trait here; implementations live in
//! `agrishield-providers`. The relay, gateway, and CLI only ever see
//! `dyn Provider`, which keeps them testable with scripted mock backends.

pub mod error;
pub mod geo;
pub mod language;
pub mod message;
pub mod provider;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use error::{FailureKind, ProviderError, RelayError};
pub use geo::Coordinates;
pub use language::Language;
pub use message::{Message, Role, Speaker, Turn};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use session::{Session, SessionId, SessionPhase};
