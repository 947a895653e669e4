//! Query freshness store.
//!
//! Cached queries are addressed by [`QueryKey`]. Each key has a refetch
//! generation: bumping it re-runs every mounted [`use_query_resource`] for
//! that key. Invalidation additionally marks the key stale until its next
//! fetch completes.
//!
//! [`use_query_resource`]: crate::hooks::use_query_resource

use std::collections::{HashMap, HashSet};

use dioxus::prelude::*;
use orderdesk_shared::QueryKey;

use crate::sync::QueryInvalidator;

/// Refetch generation per query key
pub static QUERY_GENERATIONS: GlobalSignal<HashMap<QueryKey, u64>> = Signal::global(HashMap::new);

/// Keys invalidated since their last completed fetch
pub static STALE_QUERIES: GlobalSignal<HashSet<QueryKey>> = Signal::global(HashSet::new);

/// Current refetch generation of a query, subscribing the caller to it.
pub fn query_generation(key: QueryKey) -> u64 {
    QUERY_GENERATIONS.read().get(&key).copied().unwrap_or(0)
}

/// Re-run every mounted fetch for `key`.
pub fn refetch_query(key: QueryKey) {
    *QUERY_GENERATIONS.write().entry(key).or_default() += 1;
}

/// Mark `key` stale and re-run its mounted fetches.
pub fn invalidate_query(key: QueryKey) {
    STALE_QUERIES.write().insert(key);
    refetch_query(key);
}

/// Record a completed fetch.
pub fn mark_fresh(key: QueryKey) {
    if STALE_QUERIES.peek().contains(&key) {
        STALE_QUERIES.write().remove(&key);
    }
}

pub fn is_stale(key: QueryKey) -> bool {
    STALE_QUERIES.read().contains(&key)
}

/// [`QueryInvalidator`] over the global query store.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreInvalidator;

impl QueryInvalidator for StoreInvalidator {
    fn invalidate(&self, key: QueryKey) {
        crate::log_debug!("cache: invalidating {}", key);
        invalidate_query(key);
    }

    fn force_refetch(&self, key: QueryKey) {
        crate::log_debug!("cache: refetching {}", key);
        refetch_query(key);
    }
}
