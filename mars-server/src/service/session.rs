//! Session Store
//!
//! In-memory login sessions keyed by an opaque token. Sessions expire after a
//! fixed lifetime and the store holds a bounded number of them.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "mars_session";

const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[derive(Debug, Clone)]
struct Session {
    email: String,
    created: Instant,
}

#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Opens a session when both credentials are present
    ///
    /// Any non-empty email and password are accepted. Expired sessions are
    /// pruned first; at capacity the oldest session is evicted.
    pub fn login(&self, email: &str, password: &str) -> Option<String> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return None;
        }

        let token = Uuid::new_v4().simple().to_string();
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let ttl = self.ttl;
        sessions.retain(|_, session| session.created.elapsed() < ttl);

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, session)| session.created)
                .map(|(token, _)| token.clone());
            match oldest {
                Some(oldest) => {
                    sessions.remove(&oldest);
                    tracing::debug!("Evicted oldest session at capacity {}", self.max_sessions);
                }
                None => break,
            }
        }

        sessions.insert(
            token.clone(),
            Session {
                email: email.to_string(),
                created: Instant::now(),
            },
        );
        tracing::info!("Session opened for {}", email);
        Some(token)
    }

    pub fn logout(&self, token: &str) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(token)
            .is_some()
    }

    /// Email of the user owning a live session
    pub fn user(&self, token: &str) -> Option<String> {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(token)
            .filter(|session| session.created.elapsed() < self.ttl)
            .map(|session| session.email.clone())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_requires_both_fields() {
        let store = SessionStore::new();
        assert!(store.login("", "pw").is_none());
        assert!(store.login("a@b.com", "").is_none());
        assert!(store.login("a@b.com", "pw").is_some());
    }

    #[test]
    fn test_logout_drops_session() {
        let store = SessionStore::new();
        let token = store.login("a@b.com", "pw").unwrap();
        assert_eq!(store.user(&token).as_deref(), Some("a@b.com"));

        assert!(store.logout(&token));
        assert!(store.user(&token).is_none());
        assert!(!store.logout(&token));
    }

    #[test]
    fn test_expired_sessions_are_rejected_and_pruned() {
        let store = SessionStore::with_limits(Duration::ZERO, 100);
        let first = store.login("a@b.com", "pw").unwrap();
        assert!(store.user(&first).is_none());

        for _ in 0..10 {
            store.login("a@b.com", "pw").unwrap();
        }
        // Each login prunes everything that came before it
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let store = SessionStore::with_limits(Duration::from_secs(60), 3);
        let tokens: Vec<String> = (0..3)
            .map(|i| {
                let token = store.login(&format!("user{}@b.com", i), "pw").unwrap();
                std::thread::sleep(Duration::from_millis(2));
                token
            })
            .collect();

        let newest = store.login("late@b.com", "pw").unwrap();
        assert_eq!(store.len(), 3);
        assert!(store.user(&tokens[0]).is_none());
        assert_eq!(store.user(&tokens[1]).as_deref(), Some("user1@b.com"));
        assert_eq!(store.user(&tokens[2]).as_deref(), Some("user2@b.com"));
        assert_eq!(store.user(&newest).as_deref(), Some("late@b.com"));
    }

    #[test]
    fn test_login_flood_stays_bounded() {
        let store = SessionStore::with_limits(Duration::from_secs(60), 50);
        for i in 0..500 {
            store.login(&format!("u{}@b.com", i), "pw").unwrap();
        }
        assert_eq!(store.len(), 50);
    }
}
