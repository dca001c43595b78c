//! A single deployed version of the interception worker.

use std::sync::Arc;

use offcache_client::{Method, Network, Request, Url, resolve};
use offcache_core::{AppConfig, Bucket, CacheDb, Error};
use tokio::sync::RwLock;

use crate::clients::Clients;
use crate::fallback::offline_response;
use crate::handlers::{HandlerContext, Served, Source, cache_first, network_first, stale_while_revalidate};
use crate::lifecycle::LifecycleState;
use crate::strategy::{RouteRules, Strategy};

/// What one worker version is built from.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Deploy version; names the `static-` and `dynamic-` generations.
    pub version: String,
    pub origin: Url,
    /// Root-relative URLs cached at install.
    pub manifest: Vec<String>,
    pub rules: RouteRules,
}

impl WorkerSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        Ok(Self {
            version: config.version.clone(),
            origin,
            manifest: config.static_manifest.clone(),
            rules: RouteRules::from_config(config),
        })
    }
}

/// Build an intercepted request from loose inputs.
///
/// `url` may be root-relative; `method` defaults to GET.
pub fn build_request(origin: &Url, url: &str, method: Option<&str>, accept: Option<&str>) -> Result<Request, Error> {
    let url = resolve(origin, url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
    let method = match method {
        Some(m) => Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {m:?}: {e}")))?,
        None => Method::GET,
    };

    let request = Request::new(method, url);
    Ok(match accept {
        Some(accept) => request.with_accept(accept),
        None => request,
    })
}

/// One version of the worker: its generations, routing rules and lifecycle state.
pub struct Worker {
    settings: WorkerSettings,
    ctx: HandlerContext,
    clients: Clients,
    state: RwLock<LifecycleState>,
}

impl Worker {
    pub fn new(settings: WorkerSettings, store: CacheDb, network: Arc<dyn Network>, clients: Clients) -> Self {
        let ctx = HandlerContext::new(store, network, Bucket::Dynamic.generation(&settings.version));
        Self { settings, ctx, clients, state: RwLock::new(LifecycleState::Parsed) }
    }

    pub fn version(&self) -> &str {
        &self.settings.version
    }

    pub fn origin(&self) -> &Url {
        &self.settings.origin
    }

    pub fn manifest(&self) -> &[String] {
        &self.settings.manifest
    }

    pub fn static_generation(&self) -> String {
        Bucket::Static.generation(&self.settings.version)
    }

    pub fn dynamic_generation(&self) -> &str {
        &self.ctx.dynamic
    }

    pub fn store(&self) -> &CacheDb {
        &self.ctx.store
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    pub(crate) fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    pub(crate) async fn set_state(&self, next: LifecycleState) {
        let mut state = self.state.write().await;
        tracing::info!(version = %self.settings.version, from = ?*state, to = ?next, "lifecycle transition");
        *state = next;
    }

    /// Move to `next` if the current state is one of `from`.
    pub(crate) async fn transition(&self, from: &[LifecycleState], next: LifecycleState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if !from.contains(&*state) {
            return Err(Error::Lifecycle(format!(
                "worker {} cannot move from {:?} to {:?}",
                self.settings.version, *state, next
            )));
        }
        tracing::info!(version = %self.settings.version, from = ?*state, to = ?next, "lifecycle transition");
        *state = next;
        Ok(())
    }

    /// Answer one request leaving the page.
    ///
    /// Non-interceptable requests go straight to the network and may fail.
    /// Intercepted requests always produce a response: handler failures are
    /// answered by the offline fallback.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Served, Error> {
        if !request.is_interceptable() {
            let response = self.ctx.network.fetch(request).await?;
            return Ok(Served::new(response, Source::Passthrough));
        }

        let strategy = self.settings.rules.select(request);
        tracing::debug!(url = %request.url, ?strategy, "intercepted");

        let result = match strategy {
            Strategy::NetworkFirst => network_first(&self.ctx, request).await,
            Strategy::CacheFirst => cache_first(&self.ctx, request).await,
            Strategy::StaleWhileRevalidate => stale_while_revalidate(&self.ctx, request).await,
        };

        let served = match result {
            Ok(served) => served,
            Err(e) => {
                tracing::warn!(url = %request.url, ?strategy, error = %e, "handler failed; using offline fallback");
                offline_response(&self.ctx, &self.settings.origin, request).await
            }
        };

        Ok(served.with_strategy(strategy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockNetwork, ORIGIN, seed, url, wait_for_body, worker};
    use offcache_client::StatusCode;

    fn origin() -> Url {
        Url::parse(ORIGIN).unwrap()
    }

    #[test]
    fn test_build_request_defaults() {
        let request = build_request(&origin(), "/css/app.css", None, None).unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url.as_str(), "https://site.example/css/app.css");
        assert_eq!(request.accept(), None);
    }

    #[test]
    fn test_build_request_method_and_accept() {
        let request = build_request(&origin(), "/api/bookmarks", Some("post"), Some("application/json")).unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.accept(), Some("application/json"));
    }

    #[test]
    fn test_build_request_rejects_bad_input() {
        assert!(matches!(build_request(&origin(), "  ", None, None), Err(Error::InvalidUrl(_))));
        assert!(matches!(build_request(&origin(), "/", Some("GE T"), None), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_settings_from_config() {
        let settings = WorkerSettings::from_config(&AppConfig::default()).unwrap();
        assert_eq!(settings.version, "v1.0.0");
        assert_eq!(settings.origin.as_str(), "http://localhost:8080/");
        assert!(!settings.manifest.is_empty());
    }

    #[tokio::test]
    async fn test_generation_names() {
        let store = CacheDb::open_in_memory().await.unwrap();
        let w = worker(&store, &MockNetwork::new(), &Clients::new(), "v3", &[]);
        assert_eq!(w.static_generation(), "static-v3");
        assert_eq!(w.dynamic_generation(), "dynamic-v3");
    }

    #[tokio::test]
    async fn test_non_get_passes_through() {
        let store = CacheDb::open_in_memory().await.unwrap();
        let network = MockNetwork::new();
        network.route("/api/bookmarks", 201, "application/json", "{}");
        let w = worker(&store, &network, &Clients::new(), "v1", &[]);

        let request = Request::new(Method::POST, url("/api/bookmarks"));
        let served = w.handle_fetch(&request).await.unwrap();
        assert_eq!(served.source, Source::Passthrough);
        assert_eq!(served.strategy, None);
        assert_eq!(store.count_entries(w.dynamic_generation()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_passthrough_failure_is_not_masked() {
        let store = CacheDb::open_in_memory().await.unwrap();
        let network = MockNetwork::new();
        network.set_offline(true);
        let w = worker(&store, &network, &Clients::new(), "v1", &[]);

        let request = Request::new(Method::POST, url("/api/bookmarks"));
        assert!(w.handle_fetch(&request).await.is_err());
    }

    #[tokio::test]
    async fn test_intercepted_failure_uses_fallback() {
        let store = CacheDb::open_in_memory().await.unwrap();
        let network = MockNetwork::new();
        network.set_offline(true);
        let w = worker(&store, &network, &Clients::new(), "v1", &[]);
        seed(&store, &w.static_generation(), "/", "text/html", "<h1>home</h1>", None).await;

        let request = Request::get(url("/surah/1.html")).with_accept("text/html");
        let served = w.handle_fetch(&request).await.unwrap();
        assert_eq!(served.source, Source::OfflinePage);
        assert_eq!(served.strategy, Some(Strategy::StaleWhileRevalidate));
        assert_eq!(served.response.text(), "<h1>home</h1>");
    }

    #[tokio::test]
    async fn test_routes_by_strategy() {
        let store = CacheDb::open_in_memory().await.unwrap();
        let network = MockNetwork::new();
        network.route("/css/app.css", 200, "text/css", "a{}");
        let w = worker(&store, &network, &Clients::new(), "v1", &[]);

        let served = w.handle_fetch(&Request::get(url("/css/app.css"))).await.unwrap();
        assert_eq!(served.strategy, Some(Strategy::CacheFirst));
        assert_eq!(served.source, Source::Network);

        network.set_offline(true);
        let served = w.handle_fetch(&Request::get(url("/css/app.css"))).await.unwrap();
        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.response.text(), "a{}");
    }

    #[tokio::test]
    async fn test_revalidated_manifest_page_is_served() {
        let store = CacheDb::open_in_memory().await.unwrap();
        let network = MockNetwork::new();
        network.route("/", 200, "text/html", "<h1>v1</h1>");
        let w = worker(&store, &network, &Clients::new(), "v1", &["/"]);
        w.install().await.unwrap();
        w.activate().await.unwrap();

        network.route("/", 200, "text/html", "<h1>v2</h1>");
        let request = Request::get(url("/")).with_accept("text/html");
        let served = w.handle_fetch(&request).await.unwrap();
        assert_eq!(served.strategy, Some(Strategy::StaleWhileRevalidate));
        assert_eq!(served.response.text(), "<h1>v1</h1>");

        wait_for_body(w.context(), &request, b"<h1>v2</h1>").await;
        let served = w.handle_fetch(&request).await.unwrap();
        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.response.text(), "<h1>v2</h1>");
    }

    #[tokio::test]
    async fn test_offline_network_first_returns_last_network_value() {
        let store = CacheDb::open_in_memory().await.unwrap();
        let network = MockNetwork::new();
        network.route("/api/index.json", 200, "application/json", "old");
        let w = worker(&store, &network, &Clients::new(), "v1", &["/api/index.json"]);
        w.install().await.unwrap();
        w.activate().await.unwrap();

        network.route("/api/index.json", 200, "application/json", "new");
        let request = Request::get(url("/api/index.json"));
        let served = w.handle_fetch(&request).await.unwrap();
        assert_eq!(served.strategy, Some(Strategy::NetworkFirst));
        assert_eq!(served.response.text(), "new");

        network.set_offline(true);
        let served = w.handle_fetch(&request).await.unwrap();
        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.response.text(), "new");
    }

    #[tokio::test]
    async fn test_timeout_takes_fallback_path() {
        let store = CacheDb::open_in_memory().await.unwrap();
        let network = MockNetwork::new();
        network.set_timing_out(true);
        let w = worker(&store, &network, &Clients::new(), "v1", &[]);

        let served = w.handle_fetch(&Request::get(url("/api/bookmarks"))).await.unwrap();
        assert_eq!(served.source, Source::Unavailable);
        assert_eq!(served.response.status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
