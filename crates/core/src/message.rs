//! Turn and Message domain types.
//!
//! A `Turn` is what a session remembers: who spoke, what was said, and when.
//! A `Message` is what a backend receives: a role and some text. The relay
//! converts the former into the latter on every send.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The farmer.
    User,
    /// The assistant (real replies and the scripted priming acknowledgment).
    Assistant,
    /// The policy turn of a priming exchange.
    SystemPriming,
}

/// One entry of a session's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,

    /// Synthetic turns are part of the priming exchange and never shown.
    #[serde(default)]
    pub synthetic: bool,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            timestamp: Utc::now(),
            synthetic: false,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
            synthetic: false,
        }
    }

    /// The policy half of a priming exchange.
    pub fn priming_policy(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::SystemPriming,
            text: text.into(),
            timestamp: Utc::now(),
            synthetic: true,
        }
    }

    /// The scripted acknowledgment half of a priming exchange.
    pub fn priming_ack(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
            synthetic: true,
        }
    }

    /// Whether this turn belongs in the user-visible transcript.
    pub fn is_visible(&self) -> bool {
        !self.synthetic && self.speaker != Speaker::SystemPriming
    }

    /// The backend role this turn is sent with.
    pub fn role(&self) -> Role {
        match self.speaker {
            Speaker::User => Role::User,
            Speaker::Assistant => Role::Assistant,
            Speaker::SystemPriming => Role::System,
        }
    }
}

/// The role of a message sent to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Instructions; backends without a system role in their history send
    /// these as user text.
    System,
}

/// A single message in an outgoing backend request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role(),
            content: turn.text.clone(),
        }
    }
}
