// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Time-bounded cache with load coalescing.
//!
//! Concurrent lookups of the same key share a single load. Entries expire
//! lazily: an expired entry is replaced on the next lookup of its key.

use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

use crate::errors::Result;

struct Slot<V> {
    cell: OnceCell<(V, Instant)>,
}

impl<V> Slot<V> {
    fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.cell
            .get()
            .is_some_and(|(_, loaded_at)| loaded_at.elapsed() >= ttl)
    }
}

/// Cache of values keyed by `K` that live for a fixed TTL
pub struct TtlCache<K, V> {
    entries: DashMap<K, Arc<Slot<V>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache whose entries live for `ttl`
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Return the cached value of `key`, running `load` on a miss.
    ///
    /// A failed load is not cached; the next lookup retries it.
    ///
    /// # Errors
    ///
    /// Returns the error of `load`.
    pub async fn get_or_load<F, Fut>(&self, key: K, load: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        // the map guard must be released before awaiting
        let slot = {
            let mut entry = self
                .entries
                .entry(key)
                .or_insert_with(|| Arc::new(Slot::new()));
            if entry.is_expired(self.ttl) {
                *entry = Arc::new(Slot::new());
            }
            Arc::clone(entry.value())
        };

        let (value, _) = slot
            .cell
            .get_or_try_init(|| async { load().await.map(|v| (v, Instant::now())) })
            .await?;
        Ok(value.clone())
    }

    /// Drop the entry of `key`
    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    /// Number of keys with a slot, loaded or not
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no key has a slot
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod cache_tests;
