//! Reader session store
//!
//! Sessions keyed by resource name, with LRU eviction to bound memory.
//!
//! # Thread Safety
//!
//! The map is behind a `tokio::sync::RwLock`; each session sits behind its
//! own `tokio::sync::Mutex` so calls on one document are serialized while
//! other documents stay available.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::{Mutex, RwLock};

use super::session::ReaderSession;
use crate::html::HighlightConfig;

/// Shared handle to one session
pub type SharedSession = Arc<Mutex<ReaderSession>>;

/// Thread-safe session store
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<LruCache<String, SharedSession>>>,
    capacity: NonZeroUsize,
    config: HighlightConfig,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(64, HighlightConfig::default())
    }
}

impl SessionStore {
    /// Create a store holding at most `capacity` sessions
    pub fn new(capacity: usize, config: HighlightConfig) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Arc::new(RwLock::new(LruCache::new(capacity))),
            capacity,
            config,
        }
    }

    /// Get a session, creating an empty one if needed
    pub async fn open(&self, name: &str) -> SharedSession {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(name) {
            return session.clone();
        }

        let session = Arc::new(Mutex::new(ReaderSession::new(name, self.config.clone())));
        if let Some((evicted, _)) = sessions.push(name.to_string(), session.clone()) {
            tracing::debug!(resource = %evicted, "Evicted reader session");
        }
        session
    }

    /// Get an existing session, marking it recently used
    pub async fn get(&self, name: &str) -> Option<SharedSession> {
        let mut sessions = self.sessions.write().await;
        sessions.get(name).cloned()
    }

    /// Drop a session; returns whether it existed
    pub async fn remove(&self, name: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.pop(name).is_some()
    }

    pub async fn contains(&self, name: &str) -> bool {
        let sessions = self.sessions.read().await;
        sessions.contains(name)
    }

    pub async fn len(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        let sessions = self.sessions.read().await;
        sessions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_creation() {
        let store = SessionStore::default();
        assert!(store.is_empty().await);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_open_returns_same_session() {
        let store = SessionStore::default();
        let a = store.open("ch1.xhtml").await;
        a.lock().await.content_loaded("<p>x</p>").unwrap();

        let b = store.open("ch1.xhtml").await;
        assert!(Arc::ptr_eq(&a, &b));
        assert!(b.lock().await.is_ready());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_and_remove() {
        let store = SessionStore::default();
        assert!(store.get("ch1.xhtml").await.is_none());

        store.open("ch1.xhtml").await;
        assert!(store.get("ch1.xhtml").await.is_some());
        assert!(store.remove("ch1.xhtml").await);
        assert!(!store.remove("ch1.xhtml").await);
        assert!(!store.contains("ch1.xhtml").await);
    }

    #[tokio::test]
    async fn test_least_recently_used_is_evicted() {
        let store = SessionStore::new(2, HighlightConfig::default());
        store.open("a.xhtml").await;
        store.open("b.xhtml").await;
        store.get("a.xhtml").await;
        store.open("c.xhtml").await;

        assert!(store.contains("a.xhtml").await);
        assert!(!store.contains("b.xhtml").await);
        assert!(store.contains("c.xhtml").await);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_zero_capacity_holds_one() {
        let store = SessionStore::new(0, HighlightConfig::default());
        assert_eq!(store.capacity(), 1);
    }
}
