//! Session persistence abstraction.
//!
//! The gate reads and writes exactly one key of a per-client store; the
//! transport (cookies, server-side maps, signed tokens) belongs to the
//! surrounding application.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Per-client key/value persistence. Methods take `&self` so a store can
/// sit behind an `Arc`; implementations provide their own interior
/// mutability.
pub trait SessionStore<K>: Send + Sync {
    /// Read the value under `key`, if any.
    fn get(&self, key: &str) -> Option<K>;

    /// Set or remove (`None`) the value under `key`.
    fn set(&self, key: &str, value: Option<K>);
}

/// In-memory store, one instance per client session.
#[derive(Debug)]
pub struct MemorySessionStore<K> {
    entries: RwLock<HashMap<String, K>>,
}

impl<K> Default for MemorySessionStore<K> {
    fn default() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }
}

impl<K> MemorySessionStore<K> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K: Clone + Send + Sync> SessionStore<K> for MemorySessionStore<K> {
    fn get(&self, key: &str) -> Option<K> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Option<K>) {
        let mut map = self.entries.write();
        match value {
            Some(v) => {
                map.insert(key.to_string(), v);
            }
            None => {
                map.remove(key);
            }
        }
    }
}
