//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::reader::SessionStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let sessions = SessionStore::new(config.sessions.max_documents, config.highlight.clone());
        Self {
            inner: Arc::new(AppStateInner { config, sessions }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the reader session store
    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }
}
