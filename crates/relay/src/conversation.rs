//! Conversation State Manager.
//!
//! Prepares the outbound conversation for one request from a session's
//! committed history and commits the new turns once the relay succeeds.
//! Preparation never mutates the session: the [`Outbound`] snapshot is an
//! owned copy, so a failed relay leaves history untouched.

use crate::policy::{self, PolicyPrompt};
use agrishield_config::PrimingStrategy;
use agrishield_core::{Language, Message, Session, SessionPhase, Speaker, Turn};

/// The exact conversation handed to the backend adapter.
#[derive(Debug, Clone)]
pub struct Outbound {
    /// Present only under [`PrimingStrategy::SystemInstruction`].
    pub system_instruction: Option<String>,

    /// Full ordered history ending with the new user message.
    pub messages: Vec<Message>,

    /// Turns to append to the session if the relay succeeds.
    pending: Vec<Turn>,

    language: Language,
}

impl Outbound {
    /// Whether this request carries a freshly inserted priming exchange.
    pub fn is_priming(&self) -> bool {
        self.pending.iter().any(|t| t.synthetic)
    }
}

/// Builds outbound snapshots and commits successful exchanges.
#[derive(Debug, Clone, Copy)]
pub struct ConversationManager {
    strategy: PrimingStrategy,
}

impl ConversationManager {
    pub fn new(strategy: PrimingStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> PrimingStrategy {
        self.strategy
    }

    /// Assemble the outbound conversation for `user_text`.
    ///
    /// Under the scripted strategy an `Empty` session gets a priming exchange
    /// ahead of the user turn; an `Active` one re-sends its stored priming
    /// turns re-rendered with the current `policy` and `language`.
    pub fn prepare(
        &self,
        session: &Session,
        policy: &PolicyPrompt,
        language: Language,
        user_text: &str,
    ) -> Outbound {
        let user_turn = Turn::user(user_text);

        match self.strategy {
            PrimingStrategy::ScriptedHistory => {
                let mut pending = Vec::with_capacity(3);
                if session.phase() == SessionPhase::Empty {
                    pending.push(Turn::priming_policy(policy.as_str()));
                    pending.push(Turn::priming_ack(policy::acknowledgment(language)));
                }
                pending.push(user_turn);

                let messages = session
                    .turns
                    .iter()
                    .chain(pending.iter())
                    .map(|turn| render(turn, policy, language))
                    .collect();

                Outbound {
                    system_instruction: None,
                    messages,
                    pending,
                    language,
                }
            }
            PrimingStrategy::SystemInstruction => {
                let messages = session
                    .transcript()
                    .chain(std::iter::once(&user_turn))
                    .map(Message::from)
                    .collect();

                Outbound {
                    system_instruction: Some(policy.as_str().to_string()),
                    messages,
                    pending: vec![user_turn],
                    language,
                }
            }
        }
    }

    /// Append the prepared turns plus the assistant reply, in order.
    pub fn commit(&self, session: &mut Session, outbound: Outbound, reply: &str) {
        session.preferred_language = outbound.language;
        session.commit(
            outbound
                .pending
                .into_iter()
                .chain(std::iter::once(Turn::assistant(reply))),
        );
    }
}

/// Priming turns always carry the policy in force at send time.
fn render(turn: &Turn, policy: &PolicyPrompt, language: Language) -> Message {
    match (turn.speaker, turn.synthetic) {
        (Speaker::SystemPriming, _) => Message::system(policy.as_str()),
        (Speaker::Assistant, true) => Message::assistant(policy::acknowledgment(language)),
        _ => Message::from(turn),
    }
}
