// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Versioned result cache for completion lists.
//!
//! Entries are keyed by `(document, request key)` and stamped with the
//! version that was current when they were computed. A lookup returns the
//! stored value (the same [`Arc`]) only while the caller's version still
//! equals the stamp; otherwise the producer runs and its result replaces the
//! entry.
//!
//! # Features
//!
//! - **No time expiry**: entries go stale only by version mismatch or
//!   explicit invalidation
//! - **Shared results**: hits hand out the stored `Arc`, never a copy
//! - **Abandoned results are not stored**: a producer that was cancelled
//!   returns [`Computed::Abandoned`]; the partial value reaches the caller
//!   but the cache keeps whatever it had before
//! - **Bounded per document**: storing a result drops that document's
//!   entries stamped with any other version
//!
//! # Example
//!
//! ```ignore
//! let mut cache = ResultCache::new();
//! let list = cache.get_or_compute("completions", &doc, registry.version(), || {
//!     Computed::Complete(build_candidates())
//! });
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::document::DocumentId;

/// Outcome of a cache producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Computed<T> {
    /// Finished normally; safe to store.
    Complete(T),
    /// Stopped early (cancellation); returned but never stored.
    Abandoned(T),
}

impl<T> Computed<T> {
    pub fn into_inner(self) -> T {
        match self {
            Computed::Complete(value) | Computed::Abandoned(value) => value,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Computed::Complete(_))
    }
}

#[derive(Debug)]
struct CacheEntry<T> {
    value: Arc<T>,
    stamp: u64,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Memoizes per-document results against a version counter.
#[derive(Debug)]
pub struct ResultCache<T> {
    /// Map from (document, request key) to the stamped value.
    entries: HashMap<(DocumentId, String), CacheEntry<T>>,
    stats: CacheStats,
}

impl<T> Default for ResultCache<T> {
    fn default() -> Self {
        ResultCache {
            entries: HashMap::new(),
            stats: CacheStats::default(),
        }
    }
}

impl<T> ResultCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the stored value for `(document, key)` if it was computed at
    /// `version`; otherwise run `producer` and store its result.
    ///
    /// A [`Computed::Abandoned`] result is returned without touching the
    /// stored entries. A [`Computed::Complete`] result evicts the document's
    /// entries with other stamps before it is stored.
    pub fn get_or_compute(
        &mut self,
        key: &str,
        document: &DocumentId,
        version: u64,
        producer: impl FnOnce() -> Computed<T>,
    ) -> Arc<T> {
        let cache_key = (document.clone(), key.to_string());

        // Fast path: stamp matches, hand out the stored Arc
        if let Some(entry) = self.entries.get(&cache_key) {
            if entry.stamp == version {
                self.stats.hits += 1;
                tracing::trace!(%document, key, version, "completion cache hit");
                return Arc::clone(&entry.value);
            }
        }

        self.stats.misses += 1;
        tracing::trace!(%document, key, version, "completion cache miss");

        match producer() {
            Computed::Complete(value) => {
                let value = Arc::new(value);
                self.entries
                    .retain(|(doc, _), entry| doc != document || entry.stamp == version);
                self.entries.insert(
                    cache_key,
                    CacheEntry {
                        value: Arc::clone(&value),
                        stamp: version,
                    },
                );
                value
            }
            Computed::Abandoned(value) => {
                tracing::trace!(%document, key, "abandoned result not cached");
                Arc::new(value)
            }
        }
    }

    /// Drop every entry belonging to `document`, regardless of stamp.
    pub fn invalidate_document(&mut self, document: &DocumentId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(doc, _), _| doc != document);
        before - self.entries.len()
    }

    /// Whether a value is stored for `(document, key)` at any version.
    pub fn contains(&self, document: &DocumentId, key: &str) -> bool {
        self.entries
            .contains_key(&(document.clone(), key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
