//! In-memory session store.
//!
//! Each session sits behind its own `tokio::sync::Mutex`; the relay holds
//! that lock for the whole request, so requests within one session run one
//! at a time in submission order while different sessions proceed in
//! parallel. Nothing is persisted.

use agrishield_config::RelayConfig;
use agrishield_core::{Language, RelayError, Session, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Shared handle to one session.
pub type SessionHandle = Arc<Mutex<Session>>;

struct Entry {
    handle: SessionHandle,
    last_active: Instant,
}

/// Sessions keyed by id, bounded in count and idle time.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Entry>>,
    max_sessions: usize,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(max_sessions: usize, idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
            idle_ttl,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            config.max_sessions,
            Duration::from_secs(config.session_idle_minutes * 60),
        )
    }

    /// Fetch a session, creating it with `language` if unknown.
    ///
    /// At capacity, the least recently active session not currently in use
    /// is evicted first. When every session has a request in flight, the new
    /// session is refused with `RateLimited` rather than evicting a busy one.
    pub async fn get_or_create(
        &self,
        id: &SessionId,
        language: Language,
    ) -> Result<SessionHandle, RelayError> {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();

        if let Some(entry) = sessions.get_mut(id) {
            entry.last_active = now;
            return Ok(entry.handle.clone());
        }

        if sessions.len() >= self.max_sessions && !evict_oldest_idle(&mut sessions) {
            warn!(max_sessions = self.max_sessions, "Session capacity reached; all sessions busy");
            return Err(RelayError::rate_limited(
                "session capacity reached and every session is busy",
            ));
        }

        let handle = Arc::new(Mutex::new(Session::new(id.clone(), language)));
        sessions.insert(
            id.clone(),
            Entry {
                handle: handle.clone(),
                last_active: now,
            },
        );
        debug!(session_id = %id, language = %language, "Session created");
        Ok(handle)
    }

    pub async fn get(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).map(|e| e.handle.clone())
    }

    /// Destroy a session. Returns whether it existed.
    pub async fn end(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            debug!(session_id = %id, "Session ended");
        }
        removed
    }

    /// Drop sessions idle for longer than the configured TTL.
    pub async fn prune_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let ttl = self.idle_ttl;
        sessions.retain(|_, entry| {
            entry.last_active.elapsed() < ttl || Arc::strong_count(&entry.handle) > 1
        });
        let pruned = before - sessions.len();
        if pruned > 0 {
            info!(pruned, remaining = sessions.len(), "Pruned idle sessions");
        }
        pruned
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}

/// Evict the least recently active session nobody holds. Returns whether
/// one was evicted.
fn evict_oldest_idle(sessions: &mut HashMap<SessionId, Entry>) -> bool {
    let idle = sessions
        .iter()
        .filter(|(_, e)| Arc::strong_count(&e.handle) == 1)
        .min_by_key(|(_, e)| e.last_active)
        .map(|(id, _)| id.clone());

    match idle {
        Some(id) => {
            sessions.remove(&id);
            info!(session_id = %id, "Evicted least recently active session");
            true
        }
        None => false,
    }
}
