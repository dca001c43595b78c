//! Intercepted request model.

use offcache_core::cache::hash::compute_cache_key;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, Url};

/// A request leaving the page, as seen at the interception boundary.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: HeaderMap::new() }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Set the `Accept` header. Values that are not valid header text are dropped.
    pub fn with_accept(mut self, accept: &str) -> Self {
        match HeaderValue::from_str(accept) {
            Ok(value) => {
                self.headers.insert(ACCEPT, value);
            }
            Err(e) => tracing::warn!(accept, error = %e, "ignoring invalid Accept header"),
        }
        self
    }

    pub fn accept(&self) -> Option<&str> {
        self.headers.get(ACCEPT).and_then(|v| v.to_str().ok())
    }

    /// Substring match on the `Accept` header; false when the header is absent.
    pub fn accepts(&self, needle: &str) -> bool {
        self.accept().is_some_and(|accept| accept.contains(needle))
    }

    pub fn accepts_html(&self) -> bool {
        self.accepts("text/html")
    }

    pub fn accepts_image(&self) -> bool {
        self.accepts("image")
    }

    /// Only GET requests over http(s) are intercepted.
    pub fn is_interceptable(&self) -> bool {
        self.method == Method::GET && matches!(self.url.scheme(), "http" | "https")
    }

    /// Store key of the normalized request.
    pub fn cache_key(&self) -> String {
        compute_cache_key(self.method.as_str(), self.url.as_str())
    }
}
