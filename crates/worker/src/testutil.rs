//! In-process network and store fixtures for worker tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use offcache_client::header::{CONTENT_TYPE, DATE, HeaderMap, HeaderValue};
use offcache_client::{Network, Request, Response, StatusCode, Url};
use offcache_core::{CacheDb, CachedResponse, Error};
use tokio::sync::watch;

use crate::handlers::HandlerContext;
use crate::{Clients, RouteRules, Worker, WorkerSettings};

pub(crate) const ORIGIN: &str = "https://site.example";

pub(crate) fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

#[derive(Clone)]
struct Route {
    status: u16,
    content_type: String,
    body: Vec<u8>,
}

/// Network double: fixed routes keyed by absolute URL, offline and
/// timeout switches, and a pause gate that holds every fetch until resumed.
pub(crate) struct MockNetwork {
    routes: Mutex<HashMap<String, Route>>,
    offline: AtomicBool,
    timing_out: AtomicBool,
    paused: watch::Sender<bool>,
    calls: AtomicUsize,
}

impl MockNetwork {
    pub(crate) fn new() -> Arc<Self> {
        let (paused, _) = watch::channel(false);
        Arc::new(Self {
            routes: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
            timing_out: AtomicBool::new(false),
            paused,
            calls: AtomicUsize::new(0),
        })
    }

    /// Serve `body` for a root-relative path or absolute URL. Unrouted URLs answer 404.
    pub(crate) fn route(&self, path: &str, status: u16, content_type: &str, body: &str) {
        let key = url(path).to_string();
        let route = Route { status, content_type: content_type.to_string(), body: body.as_bytes().to_vec() };
        self.routes.lock().unwrap().insert(key, route);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail every fetch the way the HTTP client reports an elapsed timeout.
    pub(crate) fn set_timing_out(&self, timing_out: bool) {
        self.timing_out.store(timing_out, Ordering::SeqCst);
    }

    pub(crate) fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub(crate) fn resume(&self) {
        self.paused.send_replace(false);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut gate = self.paused.subscribe();
        let _ = gate.wait_for(|paused| !*paused).await;

        if self.timing_out.load(Ordering::SeqCst) {
            return Err(Error::FetchTimeout(format!("{} after 20000ms", request.url)));
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: offline", request.url)));
        }

        let route = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
        let mut headers = HeaderMap::new();
        headers.insert(DATE, HeaderValue::from_str(&Utc::now().to_rfc2822()).unwrap());

        match route {
            Some(route) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_str(&route.content_type).unwrap());
                let status = StatusCode::from_u16(route.status).unwrap();
                Ok(Response::new(request.url.clone(), status, headers, route.body))
            }
            None => Ok(Response::new(request.url.clone(), StatusCode::NOT_FOUND, headers, "not found")),
        }
    }
}

pub(crate) async fn context(network: Arc<MockNetwork>) -> HandlerContext {
    let store = CacheDb::open_in_memory().await.unwrap();
    HandlerContext::new(store, network, "dynamic-test")
}

/// Write an entry straight into a generation, with an optional `date` header.
pub(crate) async fn seed(
    store: &CacheDb, generation: &str, path: &str, content_type: &str, body: &str, date: Option<DateTime<Utc>>,
) -> CachedResponse {
    let mut headers = vec![("content-type".to_string(), content_type.to_string())];
    if let Some(date) = date {
        headers.push(("date".to_string(), date.to_rfc2822()));
    }
    let entry = CachedResponse::new("GET", url(path).as_str(), 200, headers, body.as_bytes().to_vec());
    store.put_entry(generation, &entry).await.unwrap();
    entry
}

/// Poll the dynamic generation until `request` holds `body`.
pub(crate) async fn wait_for_body(ctx: &HandlerContext, request: &Request, body: &[u8]) {
    let key = request.cache_key();
    for _ in 0..200 {
        if let Ok(Some(entry)) = ctx.store.match_entry(&ctx.dynamic, &key).await
            && entry.body == body
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("background write of {} never landed", request.url);
}

pub(crate) fn settings(version: &str, manifest: &[&str]) -> WorkerSettings {
    WorkerSettings {
        version: version.to_string(),
        origin: Url::parse(ORIGIN).unwrap(),
        manifest: manifest.iter().map(|s| s.to_string()).collect(),
        rules: RouteRules::default(),
    }
}

pub(crate) fn worker(
    store: &CacheDb, network: &Arc<MockNetwork>, clients: &Clients, version: &str, manifest: &[&str],
) -> Arc<Worker> {
    Arc::new(Worker::new(settings(version, manifest), store.clone(), network.clone(), clients.clone()))
}
