//! Conversation sessions
//!
//! Each session id maps to a transcript behind its own async mutex, held by
//! the orchestrator for a whole turn. The store keeps at most `max_sessions`
//! transcripts and evicts the least recently used idle one to make room.
//! A session is idle when nobody outside the store holds its transcript; if
//! every session is busy the bound is exceeded until one goes idle.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::logging::Logger;
use crate::types::ChatMessage;

/// Default bound on retained sessions
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// A session's transcript, locked for the duration of a turn
pub type SharedTranscript = Arc<AsyncMutex<Vec<ChatMessage>>>;

/// Generate a fresh opaque session id
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

struct SessionEntry {
    transcript: SharedTranscript,
    last_used: u64,
}

#[derive(Default)]
struct SessionMap {
    entries: HashMap<String, SessionEntry>,
    clock: u64,
}

/// Bounded store of conversation transcripts
pub struct SessionStore {
    inner: Mutex<SessionMap>,
    max_sessions: usize,
    logger: Arc<dyn Logger>,
}

impl SessionStore {
    /// Create a store retaining at most `max_sessions` transcripts (minimum 1)
    pub fn new(max_sessions: usize, logger: Arc<dyn Logger>) -> Self {
        Self {
            inner: Mutex::new(SessionMap::default()),
            max_sessions: max_sessions.max(1),
            logger,
        }
    }

    /// Get the transcript for `id`, creating an empty one if needed
    ///
    /// Marks the session as most recently used.
    pub fn checkout(&self, id: &str) -> SharedTranscript {
        let mut inner = self.inner.lock();
        inner.clock += 1;
        let now = inner.clock;

        if let Some(entry) = inner.entries.get_mut(id) {
            entry.last_used = now;
            return Arc::clone(&entry.transcript);
        }

        while inner.entries.len() >= self.max_sessions {
            let oldest = inner
                .entries
                .iter()
                .filter(|(_, e)| Arc::strong_count(&e.transcript) == 1)
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            let Some(oldest) = oldest else { break };
            inner.entries.remove(&oldest);
            self.logger
                .debug(&format!("[SessionStore] Evicted session '{}'", oldest));
        }

        let transcript: SharedTranscript = Arc::new(AsyncMutex::new(Vec::new()));
        inner.entries.insert(
            id.to_string(),
            SessionEntry {
                transcript: Arc::clone(&transcript),
                last_used: now,
            },
        );
        transcript
    }

    /// Drop a session; returns whether it existed
    pub fn end_session(&self, id: &str) -> bool {
        let removed = self.inner.lock().entries.remove(id).is_some();
        if removed {
            self.logger
                .debug(&format!("[SessionStore] Ended session '{}'", id));
        }
        removed
    }

    /// Whether a session with this id is retained
    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock().entries.contains_key(id)
    }

    /// Copy of a session's transcript, waiting for any turn in progress
    pub async fn transcript(&self, id: &str) -> Option<Vec<ChatMessage>> {
        let shared = {
            let inner = self.inner.lock();
            inner.entries.get(id).map(|e| Arc::clone(&e.transcript))
        }?;
        let transcript = shared.lock().await;
        Some(transcript.clone())
    }

    /// Number of retained sessions
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether no session is retained
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Retention bound
    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    fn store(max: usize) -> SessionStore {
        SessionStore::new(max, Arc::new(NoOpLogger))
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(new_session_id(), new_session_id());
    }

    #[tokio::test]
    async fn test_checkout_returns_same_transcript() {
        let store = store(10);
        let first = store.checkout("s1");
        first.lock().await.push(ChatMessage::user("hi"));

        let again = store.checkout("s1");
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(store.transcript("s1").await, Some(vec![ChatMessage::user("hi")]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let store = store(2);
        store.checkout("a");
        store.checkout("b");
        // Touch "a" so "b" becomes the oldest
        store.checkout("a");
        store.checkout("c");

        assert!(store.contains("a"));
        assert!(!store.contains("b"));
        assert!(store.contains("c"));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_session_in_use_is_not_evicted() {
        let store = store(1);
        let first = store.checkout("a");
        let mut turn = first.lock().await;

        // "a" is mid-turn, so the bound is exceeded rather than evicting it
        let other = store.checkout("b");
        assert!(store.contains("a"));
        assert_eq!(store.len(), 2);

        let second = store.checkout("a");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(second.try_lock().is_err());

        turn.push(ChatMessage::user("hi"));
        drop(turn);
        drop(first);
        drop(second);
        assert_eq!(store.transcript("a").await, Some(vec![ChatMessage::user("hi")]));

        // Once idle, "a" is the eviction candidate again
        drop(other);
        store.checkout("c");
        assert!(!store.contains("a"));
        assert!(!store.contains("b"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_end_session() {
        let store = store(10);
        store.checkout("a");

        assert!(store.end_session("a"));
        assert!(!store.end_session("a"));
        assert!(store.transcript("a").await.is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_zero_bound_keeps_one_session() {
        let store = store(0);
        assert_eq!(store.max_sessions(), 1);
        store.checkout("a");
        store.checkout("b");
        assert_eq!(store.len(), 1);
        assert!(store.contains("b"));
    }
}
