//! Request handlers, one per caching strategy.
//!
//! Handlers share a [`HandlerContext`]: the store, the network and the name
//! of the dynamic generation they write into. Cache reads that fail are
//! logged and treated as misses; cache writes that fail are logged and do
//! not affect the response being returned.

pub mod cache_first;
pub mod network_first;
pub mod stale_while_revalidate;

use std::sync::Arc;

use offcache_client::{Network, Request, Response};
use offcache_core::CacheDb;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

pub use cache_first::cache_first;
pub use network_first::network_first;
pub use stale_while_revalidate::stale_while_revalidate;

use super::strategy::Strategy;

/// Where a response handed to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Cache,
    Network,
    /// Cached root document served in place of an uncached page.
    OfflinePage,
    /// Synthesized image placeholder.
    Placeholder,
    /// Synthesized 503.
    Unavailable,
    /// Not intercepted; fetched straight from the network.
    Passthrough,
}

/// A response plus how it was produced.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub source: Source,
    pub strategy: Option<Strategy>,
}

impl Served {
    pub fn new(response: Response, source: Source) -> Self {
        Self { response, source, strategy: None }
    }

    pub fn cache(response: Response) -> Self {
        Self::new(response, Source::Cache)
    }

    pub fn network(response: Response) -> Self {
        Self::new(response, Source::Network)
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// Shared state for request handlers. Cheap to clone into background tasks.
#[derive(Clone)]
pub struct HandlerContext {
    pub store: CacheDb,
    pub network: Arc<dyn Network>,
    /// Generation that handler writes go to.
    pub dynamic: String,
}

impl HandlerContext {
    pub fn new(store: CacheDb, network: Arc<dyn Network>, dynamic: impl Into<String>) -> Self {
        Self { store, network, dynamic: dynamic.into() }
    }

    /// Generation-agnostic cache lookup. Entries refreshed into the dynamic generation win.
    pub async fn lookup(&self, request: &Request) -> Option<Response> {
        match self.store.match_any(&self.dynamic, &request.cache_key()).await {
            Ok(Some(cached)) => match Response::from_cached(&cached) {
                Ok(response) => {
                    tracing::debug!(url = %request.url, "cache hit");
                    Some(response)
                }
                Err(e) => {
                    tracing::warn!(url = %request.url, error = %e, "unreadable cache entry; treating as miss");
                    None
                }
            },
            Ok(None) => {
                tracing::debug!(url = %request.url, "cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    /// Store a successful response in the dynamic generation. Non-2xx responses are skipped.
    pub async fn remember(&self, request: &Request, response: &Response) {
        if !response.is_success() {
            tracing::debug!(url = %request.url, status = response.status.as_u16(), "not caching non-success response");
            return;
        }

        if let Err(e) = self.store.put_entry(&self.dynamic, &response.to_cached(request)).await {
            tracing::warn!(url = %request.url, generation = %self.dynamic, error = %e, "cache write failed");
        }
    }

    /// Re-fetch `request` in the background and store the result.
    ///
    /// The task's outcome is never reported back; failures are logged at debug.
    pub fn spawn_refresh(&self, request: Request) -> JoinHandle<()> {
        let ctx = self.clone();
        tokio::spawn(async move {
            match ctx.network.fetch(&request).await {
                Ok(response) => ctx.remember(&request, &response).await,
                Err(e) => tracing::debug!(url = %request.url, error = %e, "background refresh failed"),
            }
        })
    }
}
