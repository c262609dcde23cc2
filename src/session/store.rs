//! Session storage backends.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use super::Session;
use crate::error::{Error, Result};

/// Name under which [`MemoryStore`] is pre-registered.
pub const MEMORY_STORE: &str = "memory";

/// Session persistence backend.
///
/// `save` must be atomic from the store's point of view: a reader observes
/// either the previous or the new session state, never a mix.
pub trait Storer: Send + Sync {
    /// Loads the session with the given id, `None` if unknown.
    fn load(&self, id: &str) -> Result<Option<Session>>;

    /// Persists the whole session.
    fn save(&self, session: &Session) -> Result<()>;

    /// Removes the session.
    fn delete(&self, id: &str) -> Result<()>;

    /// Removes sessions not saved within `max_age`; returns how many.
    fn cleanup(&self, _max_age: Duration) -> Result<usize> {
        Ok(0)
    }
}

struct StoredSession {
    saved_at: Instant,
    bytes: Vec<u8>,
}

/// In-process session store holding JSON-encoded sessions.
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, StoredSession>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns true if no sessions are stored.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Storer for MemoryStore {
    fn load(&self, id: &str) -> Result<Option<Session>> {
        let sessions = self.sessions.read();
        match sessions.get(id) {
            None => Ok(None),
            Some(stored) => serde_json::from_slice(&stored.bytes)
                .map(Some)
                .map_err(|e| Error::Storage(format!("corrupt session {}: {}", id, e))),
        }
    }

    fn save(&self, session: &Session) -> Result<()> {
        // Encode outside the lock; the insert swaps the whole entry.
        let bytes = serde_json::to_vec(session)
            .map_err(|e| Error::Storage(format!("encode session {}: {}", session.id, e)))?;
        self.sessions.write().insert(
            session.id.clone(),
            StoredSession {
                saved_at: Instant::now(),
                bytes,
            },
        );
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.sessions.write().remove(id);
        Ok(())
    }

    fn cleanup(&self, max_age: Duration) -> Result<usize> {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| s.saved_at.elapsed() <= max_age);
        Ok(before - sessions.len())
    }
}

/// Session stores registered by name.
///
/// The configured `session.store_type` is resolved against this registry
/// when the security manager is built.
#[derive(Clone)]
pub struct StoreRegistry {
    stores: HashMap<String, Arc<dyn Storer>>,
}

impl StoreRegistry {
    /// Creates a registry with the built-in `memory` store.
    pub fn new() -> Self {
        let mut stores: HashMap<String, Arc<dyn Storer>> = HashMap::new();
        stores.insert(MEMORY_STORE.to_string(), Arc::new(MemoryStore::new()));
        Self { stores }
    }

    /// Registers a custom store under `name`.
    ///
    /// Fails if the name is empty or already taken.
    pub fn add(&mut self, name: impl Into<String>, store: Arc<dyn Storer>) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::Config("session store name is empty".to_string()));
        }
        if self.stores.contains_key(&name) {
            return Err(Error::Config(format!(
                "session store '{}' is already registered",
                name
            )));
        }
        self.stores.insert(name, store);
        Ok(())
    }

    /// Returns the store registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Storer>> {
        self.stores.get(name).cloned()
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}
