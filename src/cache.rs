//! File-based result cache with per-entry TTL.
//!
//! Each entry is a JSON file holding the payload, the time it was stored and
//! its TTL. Expiry is lazy: an entry older than its TTL reads as a miss and
//! stays on disk until [`Cache::purge_expired`] or [`Cache::clear`] runs.
//!
//! Writes go to a temporary file in the cache directory and are renamed into
//! place, so concurrent readers never observe a partial entry and several
//! processes can share one directory. Anything unreadable or corrupt is
//! treated as a miss.
//!
//! # Cache Location
//!
//! - Linux: `~/.cache/depscan/`
//! - macOS: `~/Library/Caches/depscan/`
//! - Windows: `%LOCALAPPDATA%\depscan\`
//!
//! # Example
//!
//! ```no_run
//! use depscan::Cache;
//!
//! let cache = Cache::new();
//! let key = depscan::cache::cache_key("osv", "npm", "lodash", Some("4.17.20"));
//!
//! cache.put(&key, &vec!["GHSA-35jh-r3h4-6jhm".to_string()], 24).unwrap();
//! let value: Option<Vec<String>> = cache.get(&key);
//! assert!(value.is_some());
//! ```

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::CacheError;

/// Default cache TTL in hours.
pub const CACHE_TTL_HOURS: u64 = 24;

/// Builds a namespaced key: `<kind>:<ecosystem>:<name>[:<version>]`.
pub fn cache_key(kind: &str, ecosystem: &str, name: &str, version: Option<&str>) -> String {
    match version {
        Some(version) => format!("{}:{}:{}:{}", kind, ecosystem, name, version),
        None => format!("{}:{}:{}", kind, ecosystem, name),
    }
}

/// Returns the platform cache directory for depscan.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("depscan")
}

/// A stored payload together with its freshness metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub key: String,
    pub payload: T,
    pub stored_at: DateTime<Utc>,
    pub ttl_hours: u64,
}

impl<T> CacheEntry<T> {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let ttl = chrono::Duration::hours(self.ttl_hours.min(i64::MAX as u64) as i64);
        now.signed_duration_since(self.stored_at) > ttl
    }
}

/// A file-based cache with TTL support.
pub struct Cache {
    dir: PathBuf,
    ttl_hours: u64,
}

impl Cache {
    /// Creates a cache in the platform cache directory with the default 24-hour TTL.
    pub fn new() -> Self {
        Self::with_dir(default_cache_dir())
    }

    /// Creates a cache rooted at `dir`.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ttl_hours: CACHE_TTL_HOURS,
        }
    }

    /// Sets the TTL used by [`Cache::set`].
    pub fn with_ttl_hours(mut self, hours: u64) -> Self {
        self.ttl_hours = hours;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ttl_hours(&self) -> u64 {
        self.ttl_hours
    }

    fn ensure_dir(&self) -> Result<(), CacheError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }

    /// Keys are hashed so any key maps to a safe, collision-free file name.
    fn cache_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{:x}.json", digest))
    }

    /// Retrieves a value. Returns `None` if absent, expired or unreadable.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_at(key, Utc::now())
    }

    /// Like [`Cache::get`], judging expiry as of `now`.
    pub fn get_at<T: DeserializeOwned>(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let path = self.cache_path(key);
        let content = fs::read_to_string(&path).ok()?;

        let entry: CacheEntry<T> = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key, error = %e, "ignoring unreadable cache entry");
                return None;
            }
        };

        if entry.key != key {
            return None;
        }
        if entry.is_expired_at(now) {
            debug!(key, stored_at = %entry.stored_at, "cache entry expired");
            return None;
        }

        Some(entry.payload)
    }

    /// Stores a value with an explicit TTL.
    pub fn put<T: Serialize>(&self, key: &str, payload: &T, ttl_hours: u64) -> Result<(), CacheError> {
        self.put_at(key, payload, ttl_hours, Utc::now())
    }

    /// Stores a value as if written at `stored_at`.
    pub fn put_at<T: Serialize>(
        &self,
        key: &str,
        payload: &T,
        ttl_hours: u64,
        stored_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        self.ensure_dir()?;

        let entry = CacheEntry {
            key: key.to_string(),
            payload,
            stored_at,
            ttl_hours,
        };
        let content = serde_json::to_vec(&entry)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&content)?;
        tmp.persist(self.cache_path(key))?;
        Ok(())
    }

    /// Stores a value with the cache's default TTL.
    pub fn set<T: Serialize>(&self, key: &str, payload: &T) -> Result<(), CacheError> {
        self.put(key, payload, self.ttl_hours)
    }

    /// Removes every entry. Returns the number of files removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for path in self.entry_paths()? {
            if fs::remove_file(path).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Removes expired and unreadable entries. Returns the number removed.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Utc::now();
        let mut removed = 0;

        for path in self.entry_paths()? {
            let stale = match fs::read_to_string(&path) {
                Ok(content) => serde_json::from_str::<CacheEntry<serde_json::Value>>(&content)
                    .map(|entry| entry.is_expired_at(now))
                    .unwrap_or(true),
                Err(_) => continue,
            };
            if stale && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }

        Ok(removed)
    }

    fn entry_paths(&self) -> Result<Vec<PathBuf>, CacheError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        Ok(fs::read_dir(&self.dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|e| e == "json").unwrap_or(false))
            .collect())
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}
