//! MCP tool implementations.
//!
//! This module contains all tools exposed by the offcache server.

pub mod cache;
pub mod dispatch;
pub mod fetch;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use offcache_client::{FetchClient, FetchConfig, Network, Url};
    use offcache_core::CacheDb;
    use offcache_worker::{Clients, Registration, RouteRules, Worker, WorkerSettings};

    /// Origin nothing listens on, so every network fetch fails fast.
    pub(crate) const DEAD_ORIGIN: &str = "http://127.0.0.1:9";

    pub(crate) fn offline_network() -> Arc<dyn Network> {
        let config = FetchConfig { timeout: std::time::Duration::from_secs(2), ..Default::default() };
        Arc::new(FetchClient::new(config).unwrap())
    }

    /// A registration with an active worker whose manifest is empty.
    pub(crate) async fn registration(store: &CacheDb) -> Registration {
        let origin = Url::parse(DEAD_ORIGIN).unwrap();
        let network = offline_network();
        let registration = Registration::new(origin.clone(), network.clone());
        let settings = WorkerSettings { version: "v1".into(), origin, manifest: vec![], rules: RouteRules::default() };
        let worker = Arc::new(Worker::new(settings, store.clone(), network, Clients::new()));
        registration.register(worker).await.unwrap();
        registration
    }
}
