//! Session-scoped cache for administrative-region lookups.
//!
//! Readers get a snapshot with one atomic load and never block writers.
//! Writers copy the map and swap the new one in, which is fine for a cache
//! that gains one entry per country the user ever selects.
//!
//! The cache is an explicit value: create one per session and pass it (or a
//! [`CachedRegions`] wrapping it) to whoever needs region names. Nothing here
//! is global.

use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// A state, province, or similar first-level subdivision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRegion {
    pub name: String,
    pub admin_level: u8,
    pub osm_id: i64,
}

#[derive(Debug, Error)]
#[error("Region lookup failed: {0}")]
pub struct LookupError(pub String);

/// Country name to subdivision list.
#[async_trait]
pub trait RegionLookup: Send + Sync {
    async fn regions(&self, country: &str) -> Result<Vec<AdminRegion>, LookupError>;
}

type Snapshot = HashMap<String, Arc<Vec<AdminRegion>>>;

fn cache_key(country: &str) -> String {
    country.trim().to_lowercase()
}

/// Region lists keyed by lower-cased country name.
#[derive(Debug)]
pub struct RegionCache {
    inner: ArcSwap<Snapshot>,
}

impl Default for RegionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionCache {
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(Snapshot::new()),
        }
    }

    pub fn get(&self, country: &str) -> Option<Arc<Vec<AdminRegion>>> {
        self.inner.load().get(&cache_key(country)).cloned()
    }

    pub fn set(&self, country: &str, regions: Vec<AdminRegion>) {
        let key = cache_key(country);
        let value = Arc::new(regions);
        self.inner.rcu(|current| {
            let mut next = Snapshot::clone(current);
            next.insert(key.clone(), Arc::clone(&value));
            next
        });
    }

    pub fn clear(&self) {
        self.inner.store(Arc::new(Snapshot::new()));
    }

    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A [`RegionLookup`] fronted by a [`RegionCache`].
///
/// Results are filtered to named regions and sorted by name before caching.
/// Lookup failures yield an empty list and are not cached, so the next call
/// retries.
pub struct CachedRegions<L> {
    lookup: L,
    cache: Arc<RegionCache>,
}

impl<L: RegionLookup> CachedRegions<L> {
    pub fn new(lookup: L, cache: Arc<RegionCache>) -> Self {
        Self { lookup, cache }
    }

    pub fn cache(&self) -> &RegionCache {
        &self.cache
    }

    pub async fn regions(&self, country: &str) -> Arc<Vec<AdminRegion>> {
        if let Some(hit) = self.cache.get(country) {
            debug!(country, "region cache hit");
            return hit;
        }
        match self.lookup.regions(country).await {
            Ok(mut regions) => {
                regions.retain(|r| !r.name.trim().is_empty());
                regions.sort_by(|a, b| a.name.cmp(&b.name));
                self.cache.set(country, regions);
                self.cache.get(country).unwrap_or_default()
            }
            Err(e) => {
                warn!(country, error = %e, "region lookup failed");
                Arc::new(Vec::new())
            }
        }
    }
}
