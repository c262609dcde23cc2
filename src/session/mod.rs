//! Sessions and their pluggable storage.
//!
//! A [`Session`] is owned by exactly one request while it is being handled.
//! Mutations stay in memory until the request completes, when the
//! [`SessionManager`] flushes the whole session to the configured
//! [`Storer`] in a single write.

mod manager;
mod store;

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

pub use manager::{SameSite, SessionManager, SessionOptions};
pub use store::{MemoryStore, StoreRegistry, Storer, MEMORY_STORE};

/// Key/value state scoped to one client, with a one-shot flash namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session identifier
    pub id: String,
    /// True once the client has authenticated
    pub is_authenticated: bool,
    /// Creation time, seconds since the Unix epoch
    pub created_at: u64,
    values: HashMap<String, Value>,
    flash: HashMap<String, Value>,
}

impl Session {
    /// Creates an empty, unauthenticated session with a random id.
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    /// Creates an empty, unauthenticated session with the given id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_authenticated: false,
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
            values: HashMap::new(),
            flash: HashMap::new(),
        }
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Reads and decodes the value stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is absent and
    /// [`Error::SessionCacheInconsistent`] when the stored value does not
    /// have the shape of `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(value) => T::deserialize(value)
                .map(Some)
                .map_err(|e| Error::SessionCacheInconsistent {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Stores a serializable value under `key`.
    pub fn set<T: Serialize + ?Sized>(&mut self, key: impl Into<String>, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|_| Error::InvalidArgument("session value is not serializable"))?;
        self.values.insert(key.into(), value);
        Ok(())
    }

    /// Removes `key`, returning its value.
    pub fn del(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Returns true if `key` holds a value.
    pub fn is_key_exists(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Reads a flash value; the value is removed by the read.
    pub fn get_flash(&mut self, key: &str) -> Option<Value> {
        self.flash.remove(key)
    }

    /// Stores a flash value that survives exactly one read.
    pub fn set_flash<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|_| Error::InvalidArgument("flash value is not serializable"))?;
        self.flash.insert(key.into(), value);
        Ok(())
    }

    /// Number of persistent values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if neither namespace holds a value.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.flash.is_empty()
    }

    /// Drops all values and the authenticated flag (logout).
    pub fn clear(&mut self) {
        self.values.clear();
        self.flash.clear();
        self.is_authenticated = false;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_session_is_empty_and_unauthenticated() {
        let session = Session::new();
        assert!(session.is_empty());
        assert!(!session.is_authenticated);
        assert!(uuid::Uuid::parse_str(&session.id).is_ok());
    }

    #[test]
    fn set_get_del() {
        let mut session = Session::new();
        session.set("cart", &vec![1, 2]).unwrap();

        assert!(session.is_key_exists("cart"));
        assert_eq!(session.get("cart"), Some(&json!([1, 2])));
        assert_eq!(session.del("cart"), Some(json!([1, 2])));
        assert!(!session.is_key_exists("cart"));
    }

    #[test]
    fn flash_is_read_once() {
        let mut session = Session::new();
        session.set_flash("notice", "saved").unwrap();

        assert_eq!(session.get_flash("notice"), Some(json!("saved")));
        assert_eq!(session.get_flash("notice"), None);
        assert!(!session.is_key_exists("notice"));
    }

    #[test]
    fn get_as_decodes() {
        let mut session = Session::new();
        session.set("count", &3u32).unwrap();
        assert_eq!(session.get_as::<u32>("count").unwrap(), Some(3));
        assert_eq!(session.get_as::<u32>("missing").unwrap(), None);
    }

    #[test]
    fn get_as_wrong_shape_is_inconsistent() {
        let mut session = Session::new();
        session.set("count", "three").unwrap();
        let err = session.get_as::<u32>("count").unwrap_err();
        assert!(matches!(err, Error::SessionCacheInconsistent { key, .. } if key == "count"));
    }

    #[test]
    fn clear_logs_out() {
        let mut session = Session::new();
        session.is_authenticated = true;
        session.set("a", &1).unwrap();
        session.set_flash("b", &2).unwrap();

        session.clear();
        assert!(session.is_empty());
        assert!(!session.is_authenticated);
    }
}
