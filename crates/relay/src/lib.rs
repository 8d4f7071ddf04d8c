//! The AgriShield conversational policy relay.
//!
//! Turns a raw farmer message plus ephemeral context (date, approximate
//! location, language) into a policy-compliant backend request, manages
//! per-session history, and normalizes what comes back.
//!
//! ```text
//! message ─► context ─► policy ─► conversation ─► adapter ─► normalizer ─► reply
//! ```

pub mod adapter;
pub mod context;
pub mod conversation;
pub mod normalizer;
pub mod policy;
pub mod relay;
pub mod store;

pub use adapter::{BackendAdapter, GenerationSettings};
pub use context::SituationalContext;
pub use conversation::{ConversationManager, Outbound};
pub use normalizer::Normalized;
pub use policy::PolicyPrompt;
pub use relay::{Relay, RelayReply, RelayRequest, RelayResult, RelaySettings};
pub use store::{SessionHandle, SessionStore};
