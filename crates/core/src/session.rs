//! Session: one ongoing conversation with a farmer.
//!
//! Sessions live only in memory; they are created on the first message and
//! dropped when the client ends the conversation or the store evicts them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::language::Language;
use crate::message::Turn;

/// Opaque session identifier, caller-supplied or minted by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a session is in its priming lifecycle.
///
/// `Empty` until the first successful relay commits; `Active` afterwards.
/// The priming exchange is inserted exactly on the `Empty → Active` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Empty,
    Active,
}

/// A single conversation and its ordered history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,

    /// Language in force; may change between turns.
    pub preferred_language: Language,

    /// Ordered turns, priming exchange first.
    pub turns: Vec<Turn>,

    pub created_at: DateTime<Utc>,

    /// When the last turn was committed (or the session was created).
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: SessionId, preferred_language: Language) -> Self {
        let now = Utc::now();
        Self {
            id,
            preferred_language,
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.turns.is_empty() {
            SessionPhase::Empty
        } else {
            SessionPhase::Active
        }
    }

    /// Append committed turns in order.
    pub fn commit(&mut self, turns: impl IntoIterator<Item = Turn>) {
        self.turns.extend(turns);
        self.updated_at = Utc::now();
    }

    /// Turns a client may display (priming exchange filtered out).
    pub fn transcript(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(|t| t.is_visible())
    }
}
