//! Result Cache
//!
//! Bounded, TTL-expiring map from `(task, payload)` to a previously successful
//! result. Expiry is lazy: an entry older than the TTL is dropped by the `get`
//! that notices it. At capacity, the oldest inserted entry is evicted first.

use aigate_kernel::{Clock, SystemClock};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_MAX_SIZE: usize = 100;
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Value,
    created_at: u64,
    /// Insertion order, used to find the oldest entry
    seq: u64,
    correlation_id: Option<String>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    next_seq: u64,
    hits: u64,
    misses: u64,
}

/// Snapshot of cache occupancy and settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub ttl_ms: u64,
    pub hits: u64,
    pub misses: u64,
}

pub struct ResultCache {
    state: Mutex<CacheState>,
    max_size: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("max_size", &self.max_size)
            .field("ttl", &self.ttl)
            .field("size", &self.state.lock().entries.len())
            .finish()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE, DEFAULT_TTL)
    }
}

impl ResultCache {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self::with_clock(max_size, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(max_size: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            max_size: max_size.max(1),
            ttl,
            clock,
        }
    }

    /// Cache key: SHA-256 of `task:payload_json`.
    ///
    /// `None` when the payload cannot be serialized; such requests are never
    /// cached.
    pub fn fingerprint(task: &str, payload: &Value) -> Option<String> {
        let payload = serde_json::to_string(payload).ok()?;
        let mut hasher = Sha256::new();
        hasher.update(task.as_bytes());
        hasher.update(b":");
        hasher.update(payload.as_bytes());
        Some(hex::encode(hasher.finalize()))
    }

    /// A copy of the cached result, if present and not expired.
    pub fn get(&self, task: &str, payload: &Value) -> Option<Value> {
        let key = Self::fingerprint(task, payload)?;
        let now = self.clock.now_millis();
        let ttl_ms = self.ttl.as_millis() as u64;

        let mut state = self.state.lock();
        let lookup = state.entries.get(&key).map(|entry| {
            if now.saturating_sub(entry.created_at) > ttl_ms {
                None
            } else {
                Some(entry.data.clone())
            }
        });
        match lookup {
            Some(Some(data)) => {
                state.hits += 1;
                return Some(data);
            }
            Some(None) => {
                if let Some(entry) = state.entries.remove(&key) {
                    debug!(
                        task,
                        correlation_id = entry.correlation_id.as_deref().unwrap_or("-"),
                        "Evicted expired cache entry"
                    );
                }
            }
            None => {}
        }
        state.misses += 1;
        None
    }

    /// Store `data` for `(task, payload)`, replacing any previous value.
    pub fn set(&self, task: &str, payload: &Value, data: Value, correlation_id: Option<&str>) {
        let Some(key) = Self::fingerprint(task, payload) else {
            debug!(task, "Payload not serializable, skipping cache write");
            return;
        };
        let now = self.clock.now_millis();

        let mut state = self.state.lock();
        if !state.entries.contains_key(&key) && state.entries.len() >= self.max_size {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                state.entries.remove(&oldest);
            }
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            key,
            CacheEntry {
                data,
                created_at: now,
                seq,
                correlation_id: correlation_id.map(str::to_string),
            },
        );
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        *state = CacheState::default();
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            size: state.entries.len(),
            max_size: self.max_size,
            ttl_ms: self.ttl.as_millis() as u64,
            hits: state.hits,
            misses: state.misses,
        }
    }
}
