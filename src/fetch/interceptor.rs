//! Per-request caching strategies
//!
//! Cross-origin resources (runtime libraries, CDN assets) are large,
//! versioned and rarely change: serve them cache-first. Same-origin
//! application files change between deploys: serve them network-first and
//! fall back to the cache when offline.
//!
//! Cache writes run as background tasks so a response is never held back
//! by its own cache update.

use crate::cache::{CacheHandle, CachedEntry};
use crate::error::{WarmbootError, WarmbootResult};
use crate::fetch::network::Network;
use crate::fetch::request::{Origin, Request, Response};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Strategy applied to one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Serve from cache when present; only consult network on a miss
    CacheFirst,
    /// Always try the network; fall back to cache only on network failure
    NetworkFirst,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CacheFirst => write!(f, "cache-first"),
            Self::NetworkFirst => write!(f, "network-first"),
        }
    }
}

/// Resolves requests against one cache generation and the network
pub struct FetchInterceptor {
    origin: Origin,
    cache: CacheHandle,
    network: Arc<dyn Network>,
    pending_writes: Mutex<JoinSet<()>>,
}

impl FetchInterceptor {
    pub fn new(origin: Origin, cache: CacheHandle, network: Arc<dyn Network>) -> Self {
        Self {
            origin,
            cache,
            network,
            pending_writes: Mutex::new(JoinSet::new()),
        }
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn cache(&self) -> &CacheHandle {
        &self.cache
    }

    /// Strategy for a request, decided from its origin alone
    pub fn strategy_for(&self, request: &Request) -> Strategy {
        if request.is_same_origin(&self.origin) {
            Strategy::NetworkFirst
        } else {
            Strategy::CacheFirst
        }
    }

    /// Resolve a request to a response
    pub async fn handle(&self, request: &Request) -> WarmbootResult<Response> {
        let strategy = self.strategy_for(request);
        debug!("{} {}", strategy, request);

        match strategy {
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::NetworkFirst => self.network_first(request).await,
        }
    }

    async fn cache_first(&self, request: &Request) -> WarmbootResult<Response> {
        if let Some(entry) = self.lookup(request).await {
            debug!("Cache hit {}", request);
            return Ok(entry.into_response());
        }

        debug!("Cache miss {}, fetching", request);
        let response = self.network.fetch(request).await?;
        if response.is_success() {
            self.store_in_background(request, &response);
        }
        Ok(response)
    }

    async fn network_first(&self, request: &Request) -> WarmbootResult<Response> {
        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.store_in_background(request, &response);
                }
                Ok(response)
            }
            Err(err) => {
                debug!("Network failed for {} ({}), trying cache", request, err);
                match self.lookup(request).await {
                    Some(entry) => Ok(entry.into_response()),
                    None => Err(WarmbootError::Unavailable {
                        url: request.url().to_string(),
                    }),
                }
            }
        }
    }

    /// Cache lookup where a read error counts as a miss
    async fn lookup(&self, request: &Request) -> Option<CachedEntry> {
        match self.cache.get(request).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cache read failed for {}: {}", request, e);
                None
            }
        }
    }

    fn store_in_background(&self, request: &Request, response: &Response) {
        let cache = self.cache.clone();
        let request = request.clone();
        let response = response.clone();

        let mut pending = self.pending();
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            if let Err(e) = cache.put(&request, &response).await {
                warn!("Failed to update cache for {}: {}", request, e);
            }
        });
    }

    /// Wait for every background cache write started so far
    pub async fn settle(&self) {
        let mut pending = std::mem::take(&mut *self.pending());
        while pending.join_next().await.is_some() {}
    }

    fn pending(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.pending_writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
