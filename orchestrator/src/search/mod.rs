use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::metrics;
use crate::models::SearchResult;

pub mod cache;
pub mod duckduckgo;

pub use cache::BoundedCache;
pub use duckduckgo::DuckDuckGo;

pub const MIN_RESULTS: usize = 1;
pub const MAX_RESULTS: usize = 10;
pub const DEFAULT_RESULTS: usize = 5;

/// External web-search backend. Returns records in relevance order.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;
}

#[async_trait]
impl<T: SearchBackend + ?Sized> SearchBackend for Arc<T> {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        (**self).search(query, max_results).await
    }
}

pub fn validate_count(count: usize) -> Result<usize> {
    if (MIN_RESULTS..=MAX_RESULTS).contains(&count) {
        Ok(count)
    } else {
        Err(Error::InvalidArgument(format!(
            "result count must be between {} and {}, got {}",
            MIN_RESULTS, MAX_RESULTS, count
        )))
    }
}

type SearchKey = (String, usize);

/// Memoizing adapter over a [`SearchBackend`], keyed by exact `(query, count)`.
///
/// Concurrent misses on the same key wait on one backend call instead of
/// issuing their own.
pub struct SearchProvider {
    backend: Box<dyn SearchBackend>,
    cache: Mutex<BoundedCache<SearchKey, Vec<SearchResult>>>,
    in_flight: Mutex<HashMap<SearchKey, Arc<Mutex<()>>>>,
    timeout: Duration,
}

impl SearchProvider {
    pub fn new(
        backend: impl SearchBackend + 'static,
        capacity: usize,
        ttl: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            backend: Box::new(backend),
            cache: Mutex::new(BoundedCache::new(capacity, ttl)),
            in_flight: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    pub async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchResult>> {
        let count = validate_count(count)?;
        let key = (query.to_string(), count);

        if let Some(hit) = self.cached(&key).await {
            return Ok(hit);
        }

        let slot = self
            .in_flight
            .lock()
            .await
            .entry(key.clone())
            .or_default()
            .clone();
        let guard = slot.lock().await;

        // filled by the caller we waited on
        let outcome = match self.cached(&key).await {
            Some(hit) => Ok(hit),
            None => self.fetch(&key).await,
        };

        drop(guard);
        let mut in_flight = self.in_flight.lock().await;
        // only the map and this caller still hold the slot; release it under
        // the map lock so the last waiter always sees the count reach two
        if Arc::strong_count(&slot) == 2 {
            in_flight.remove(&key);
        }
        drop(slot);
        drop(in_flight);

        outcome
    }

    async fn cached(&self, key: &SearchKey) -> Option<Vec<SearchResult>> {
        let hit = self.cache.lock().await.get(key)?;
        debug!("Search cache hit for '{}' ({})", key.0, key.1);
        metrics::record_search("hit");
        Some(hit)
    }

    async fn fetch(&self, key: &SearchKey) -> Result<Vec<SearchResult>> {
        let (query, count) = (key.0.as_str(), key.1);
        let results = match tokio::time::timeout(self.timeout, self.backend.search(query, count)).await {
            Ok(Ok(results)) => results,
            Ok(Err(e)) => {
                warn!("Search failed for '{}': {}", query, e);
                metrics::record_search("error");
                return Err(e);
            }
            Err(_) => {
                warn!("Search timed out for '{}'", query);
                metrics::record_search("timeout");
                return Err(Error::Timeout {
                    operation: "search",
                    elapsed: self.timeout,
                });
            }
        };

        metrics::record_search("miss");
        self.cache.lock().await.insert(key.clone(), results.clone());
        Ok(results)
    }
}
