//! Module-namespaced response cache.
//!
//! Keys look like `{module}:item:{id}` or `{module}:list:{digest}`. Entries
//! expire after the configured TTL and can be dropped early at three
//! granularities: the whole module, only its lists, or one item plus the
//! module's lists. Invalidated entries are never returned by a later `get`.
//!
//! Each module also carries a generation counter that every invalidation bumps.
//! Read paths snapshot it before loading from the store and write back through
//! [`ListCache::set_if_current`], so a load that overlaps a write is never
//! cached after the write's invalidation.

use crate::cache_validator::ValidatedCacheEntry;
use crate::errors::AppError;
use dashmap::DashMap;
use moka::future::Cache;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

/// TTL applied when the configuration does not override it.
pub const DEFAULT_TTL_SECS: u64 = 300;

pub fn item_key(module: &str, id: impl Display) -> String {
    format!("{}:item:{}", module, id)
}

pub fn list_key(module: &str, fingerprint: &str) -> String {
    format!("{}:list:{}", module, fingerprint)
}

fn module_prefix(module: &str) -> String {
    format!("{}:", module)
}

fn lists_prefix(module: &str) -> String {
    format!("{}:list:", module)
}

/// Which entries of a module to drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationScope {
    /// Every list and item entry of the module.
    All,
    /// List entries only; single-item entries survive.
    ListsOnly,
    /// One item entry plus every list entry of the module.
    Related(String),
}

/// Invalidation counter of one module at the time it was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

#[derive(Clone)]
pub struct ListCache {
    inner: Cache<String, String>,
    generations: Arc<DashMap<String, u64>>,
}

impl ListCache {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(max_capacity)
            .support_invalidation_closures()
            .build();
        Self {
            inner,
            generations: Arc::new(DashMap::new()),
        }
    }

    /// Snapshot to take before reading the store on a cache miss.
    pub fn generation(&self, module: &str) -> Generation {
        Generation(self.generations.get(module).map(|g| *g).unwrap_or(0))
    }

    fn bump(&self, module: &str) {
        *self.generations.entry(module.to_string()).or_insert(0) += 1;
    }

    /// Returns the cached value, or `None` on miss, expiry, or failed integrity check.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.inner.get(key).await?;
        let value = ValidatedCacheEntry::open(&raw);
        if value.is_none() {
            // Corrupt entries are dropped so the next reader does not pay for them again.
            self.inner.invalidate(key).await;
        }
        value
    }

    pub async fn set<T: Serialize>(&self, key: String, value: &T) -> Result<(), AppError> {
        let sealed = ValidatedCacheEntry::seal(value)?;
        self.inner.insert(key, sealed).await;
        Ok(())
    }

    /// Stores `value` only if `module` has not been invalidated since `seen`.
    ///
    /// Returns whether the entry was kept. The generation is checked again
    /// after the insert because an invalidation may land in between.
    pub async fn set_if_current<T: Serialize>(
        &self,
        module: &str,
        key: String,
        value: &T,
        seen: Generation,
    ) -> Result<bool, AppError> {
        if self.generation(module) != seen {
            tracing::debug!("Skipping cache write for {}: module invalidated", key);
            return Ok(false);
        }
        let sealed = ValidatedCacheEntry::seal(value)?;
        self.inner.insert(key.clone(), sealed).await;

        if self.generation(module) != seen {
            self.inner.invalidate(&key).await;
            tracing::debug!("Dropped cache write for {}: module invalidated", key);
            return Ok(false);
        }
        Ok(true)
    }

    pub async fn invalidate(&self, module: &str, scope: InvalidationScope) -> Result<(), AppError> {
        // Bump before dropping so in-flight loads see the change.
        self.bump(module);
        match &scope {
            InvalidationScope::All => self.drop_prefix(module_prefix(module)),
            InvalidationScope::ListsOnly => self.drop_prefix(lists_prefix(module)),
            InvalidationScope::Related(id) => {
                self.inner.invalidate(&item_key(module, id)).await;
                self.drop_prefix(lists_prefix(module))
            }
        }?;
        tracing::debug!("Cache invalidated for module '{}': {:?}", module, scope);
        Ok(())
    }

    pub async fn invalidate_all(&self, module: &str) -> Result<(), AppError> {
        self.invalidate(module, InvalidationScope::All).await
    }

    pub async fn invalidate_lists(&self, module: &str) -> Result<(), AppError> {
        self.invalidate(module, InvalidationScope::ListsOnly).await
    }

    pub async fn invalidate_related(&self, module: &str, id: impl Display) -> Result<(), AppError> {
        self.invalidate(module, InvalidationScope::Related(id.to_string()))
            .await
    }

    fn drop_prefix(&self, prefix: String) -> Result<(), AppError> {
        self.inner
            .invalidate_entries_if(move |key, _| key.starts_with(&prefix))
            .map(|_| ())
            .map_err(|e| AppError::CacheError(format!("invalidation rejected: {:?}", e)))
    }
}

impl Default for ListCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TTL_SECS), 10_000)
    }
}
