//! Read-through list cache with TTL entries and coarse invalidation.
//!
//! Every operation here is an optimization, never a correctness dependency:
//! a transport failure turns reads into misses and makes writes no-ops. The
//! caller must always be able to fall through to the source of truth.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::db::{ListQuery, Server};

use super::keys;

/// Cache transport error. Absorbed inside [`ListCache`]; callers never see it.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache transport unavailable: {0}")]
    Unavailable(String),
}

/// Raw key/value transport underneath the list cache.
pub trait CacheTransport: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
    fn delete(&self, key: &str) -> Result<(), CacheError>;
    /// Remove every entry whose key starts with `prefix`.
    fn clear_prefix(&self, prefix: &str) -> Result<(), CacheError>;
}

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory transport with per-entry expiry.
#[derive(Default)]
pub struct MemoryTransport {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CacheTransport for MemoryTransport {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let entries = self.read();
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => Ok(Some(entry.value.clone())),
            _ => Ok(None),
        }
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.write().insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.write().remove(key);
        Ok(())
    }

    fn clear_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        self.write()
            .retain(|key, entry| !key.starts_with(prefix) && !entry.is_expired());
        Ok(())
    }
}

/// Read-through cache for paginated server lists and their totals, plus a
/// best-effort per-server side cache.
pub struct ListCache {
    transport: Arc<dyn CacheTransport>,
    ttl: Duration,
}

impl ListCache {
    /// Create a cache over the given transport. The TTL applies to every
    /// entry written through this cache.
    pub fn new(transport: Arc<dyn CacheTransport>, ttl: Duration) -> Self {
        Self { transport, ttl }
    }

    /// Cached server page for a list key. Misses on expiry, decode failure
    /// or transport error.
    pub fn get(&self, key: &str) -> Option<Vec<Server>> {
        let bytes = self.fetch(key)?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Cached total count for a total key.
    pub fn get_total(&self, key: &str) -> Option<i64> {
        let bytes = self.fetch(key)?;
        std::str::from_utf8(&bytes).ok()?.parse().ok()
    }

    /// Store a server page under a list key.
    pub fn set(&self, key: &str, servers: &[Server]) {
        match serde_json::to_vec(servers) {
            Ok(bytes) => self.store(key, bytes),
            Err(e) => tracing::warn!(key, error = %e, "failed to encode cached page"),
        }
    }

    /// Store a total count under a total key.
    pub fn set_total(&self, key: &str, total: i64) {
        self.store(key, total.to_string().into_bytes());
    }

    /// Paired read: a hit requires both the page and its total to be
    /// present and unexpired. Anything less is a full miss.
    pub fn get_page(&self, query: &ListQuery) -> Option<(Vec<Server>, i64)> {
        let key = keys::list_key(query);
        let servers = self.get(&key)?;
        let total = self.get_total(&keys::total_key(&key))?;
        Some((servers, total))
    }

    /// Paired write after a source-of-truth read.
    pub fn set_page(&self, query: &ListQuery, servers: &[Server], total: i64) {
        let key = keys::list_key(query);
        self.set(&key, servers);
        self.set_total(&keys::total_key(&key), total);
    }

    /// Drop every cached list page and total count. Called synchronously
    /// before any mutation commits to the source of truth.
    pub fn invalidate_all(&self) {
        if let Err(e) = self.transport.clear_prefix(keys::LIST_NAMESPACE) {
            tracing::warn!(error = %e, "cache invalidation failed");
        }
    }

    /// Best-effort per-server side cache write.
    pub fn set_by_id(&self, server: &Server) {
        match serde_json::to_vec(server) {
            Ok(bytes) => self.store(&keys::server_key(server.id), bytes),
            Err(e) => tracing::warn!(server_id = server.id, error = %e, "failed to encode cached server"),
        }
    }

    /// Cached single server, if present. Staleness is bounded by the TTL.
    pub fn get_by_id(&self, id: i64) -> Option<Server> {
        let bytes = self.fetch(&keys::server_key(id))?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Best-effort per-server side cache removal.
    pub fn delete_by_id(&self, id: i64) {
        if let Err(e) = self.transport.delete(&keys::server_key(id)) {
            tracing::warn!(server_id = id, error = %e, "cache delete failed");
        }
    }

    fn fetch(&self, key: &str) -> Option<Vec<u8>> {
        match self.transport.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    fn store(&self, key: &str, bytes: Vec<u8>) {
        if let Err(e) = self.transport.set(key, bytes, self.ttl) {
            tracing::warn!(key, error = %e, "cache write failed");
        }
    }
}
