//! Key/value caching with TTL support.
//!
//! One `CacheStore` interface with two backends: an in-memory map for
//! matched-version lists and resolved-package memoization, and a
//! file-backed store (one JSON file per key) for release metadata.
//! Entries without a TTL never expire.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use harbor_core::{HarborError, HarborResult};

/// Uniform cache interface: string keys, typed values, optional TTL
pub trait CacheStore<V: Clone>: Send + Sync {
    /// Get the value for a key if present and fresh
    fn get(&self, key: &str) -> Option<V>;

    /// Store a value; `None` TTL means the entry never expires
    fn put(&self, key: &str, value: V, ttl: Option<Duration>);

    /// Check whether a fresh entry exists for the key
    fn has(&self, key: &str) -> bool;

    /// Drop the entry for a key
    fn forget(&self, key: &str);

    /// Get the cached value, computing and storing it on miss
    fn remember<F>(&self, key: &str, ttl: Option<Duration>, compute: F) -> HarborResult<V>
    where
        F: FnOnce() -> HarborResult<V>,
        Self: Sized,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = compute()?;
        self.put(key, value.clone(), ttl);
        Ok(value)
    }
}

/// Cache entry with TTL
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: SystemTime,
    pub ttl: Option<Duration>,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, ttl: Option<Duration>) -> Self {
        Self {
            value,
            stored_at: SystemTime::now(),
            ttl,
        }
    }

    /// Check if this entry is still fresh
    pub fn is_fresh(&self) -> bool {
        match self.ttl {
            None => true,
            Some(ttl) => match self.stored_at.elapsed() {
                Ok(elapsed) => elapsed < ttl,
                Err(_) => false, // clock went backwards, consider stale
            },
        }
    }
}

/// In-memory cache over a concurrent map
#[derive(Debug)]
pub struct MemoryCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
}

impl<V> MemoryCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> CacheStore<V> for MemoryCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.is_fresh() {
            Some(entry.value.clone())
        } else {
            drop(entry);
            // remove stale entry
            self.entries.remove(key);
            None
        }
    }

    fn put(&self, key: &str, value: V, ttl: Option<Duration>) {
        self.entries.insert(key.to_string(), CacheEntry::new(value, ttl));
    }

    fn has(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| entry.is_fresh())
            .unwrap_or(false)
    }

    fn forget(&self, key: &str) {
        self.entries.remove(key);
    }
}

// On-disk envelope around a cached value
#[derive(Serialize, Deserialize)]
struct FileEntry<V> {
    stored_at: u64,
    ttl_secs: Option<u64>,
    value: V,
}

impl<V> FileEntry<V> {
    fn is_fresh(&self) -> bool {
        let Some(ttl_secs) = self.ttl_secs else {
            return true;
        };

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();

        now < self.stored_at.saturating_add(ttl_secs)
    }
}

/// File-backed cache: one JSON file per key under a base directory.
/// Writes are best-effort; a failed write is logged, not propagated.
#[derive(Debug)]
pub struct FileCache<V> {
    dir: PathBuf,
    _marker: PhantomData<fn() -> V>,
}

impl<V> FileCache<V> {
    pub fn new(dir: impl Into<PathBuf>) -> HarborResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| HarborError::io(format!("failed to create cache dir {}", dir.display()), e))?;

        Ok(Self {
            dir,
            _marker: PhantomData,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+') { c } else { '_' })
            .collect();

        self.dir.join(format!("{safe}.json"))
    }
}

impl<V> CacheStore<V> for FileCache<V>
where
    V: Clone + Send + Sync + Serialize + DeserializeOwned,
{
    fn get(&self, key: &str) -> Option<V> {
        let path = self.path_for(key);
        let raw = std::fs::read(&path).ok()?;
        let entry: FileEntry<V> = serde_json::from_slice(&raw).ok()?;

        if entry.is_fresh() {
            Some(entry.value)
        } else {
            let _ = std::fs::remove_file(&path);
            None
        }
    }

    fn put(&self, key: &str, value: V, ttl: Option<Duration>) {
        let entry = FileEntry {
            stored_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or(Duration::ZERO)
                .as_secs(),
            ttl_secs: ttl.map(|t| t.as_secs()),
            value,
        };

        let path = self.path_for(key);
        let written = serde_json::to_vec(&entry)
            .map_err(|e| e.to_string())
            .and_then(|bytes| std::fs::write(&path, bytes).map_err(|e| e.to_string()));

        if let Err(error) = written {
            warn!(path = %path.display(), %error, "failed to write cache entry");
        }
    }

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn forget(&self, key: &str) {
        let _ = std::fs::remove_file(self.path_for(key));
    }
}
