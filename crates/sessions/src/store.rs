//! The process-wide session map.
//!
//! Sessions are created lazily on first reference and live only in
//! memory — there is no cross-process or cross-restart persistence.
//! Cross-session state does not exist; each [`Session`] is reached only
//! through its own `Mutex`, never locked alongside another.

use std::collections::HashMap;
use std::sync::Arc;

use conductor_domain::trace::TraceEvent;
use parking_lot::Mutex;

use crate::rate_limit::RateLimiter;
use crate::session::Session;

pub struct SessionStore {
    max_turns: usize,
    rate_limit_per_minute: u32,
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new(max_turns: usize, rate_limit_per_minute: u32) -> Self {
        Self {
            max_turns,
            rate_limit_per_minute,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Idempotent: returns the existing session or creates and registers a
    /// fresh one.
    pub fn get_or_create(&self, session_id: &str) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.lock();
        if let Some(existing) = sessions.get(session_id) {
            return existing.clone();
        }

        let session = Arc::new(Mutex::new(Session::new(session_id, self.max_turns)));
        sessions.insert(session_id.to_string(), session.clone());
        TraceEvent::SessionCreated {
            session_id: session_id.to_string(),
        }
        .emit();
        session
    }

    /// Look up a session without creating one.
    pub fn get(&self, session_id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.lock().get(session_id).cloned()
    }

    /// Remove a session from the store, failing every resolver it was
    /// suspended on so no conductor loop leaks.
    pub fn evict(&self, session_id: &str) -> bool {
        let session = self.sessions.lock().remove(session_id);
        match session {
            Some(session) => {
                let failed = session.lock().fail_all_pending("session_evicted");
                TraceEvent::SessionEvicted {
                    session_id: session_id.to_string(),
                    pending_calls_failed: failed,
                }
                .emit();
                true
            }
            None => false,
        }
    }

    /// Factory for a fresh per-connection sliding-window rate limiter.
    pub fn create_rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(self.rate_limit_per_minute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent() {
        let store = SessionStore::new(20, 30);
        let a = store.get_or_create("s1");
        let b = store.get_or_create("s1");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn evict_fails_pending_resolvers() {
        let store = SessionStore::new(20, 30);
        let session = store.get_or_create("s1");
        {
            let mut s = session.lock();
            s.register_pending("c1", "agent.spawn");
            let (tx, _rx) = tokio::sync::oneshot::channel();
            s.register_resolver("c1", tx);
        }
        assert!(store.evict("s1"));
        assert!(store.get("s1").is_none());
    }

    #[test]
    fn evict_unknown_session_returns_false() {
        let store = SessionStore::new(20, 30);
        assert!(!store.evict("nope"));
    }
}
