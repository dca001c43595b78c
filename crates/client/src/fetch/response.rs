//! Response model shared by the network and the cache store.

use bytes::Bytes;
use offcache_core::{CachedResponse, Error};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};

use super::Request;

/// A response handed back across the interception boundary.
#[derive(Debug, Clone)]
pub struct Response {
    /// URL the response belongs to (after redirects, for network responses).
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(url: Url, status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self { url, status, headers, body: body.into() }
    }

    /// Build a locally generated response with a single content type.
    pub fn synthesized(url: Url, status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self::new(url, status, headers, body)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Snapshot this response for storage under `request`'s key.
    pub fn to_cached(&self, request: &Request) -> CachedResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        let mut cached = CachedResponse::new(
            request.method.as_str(),
            request.url.as_str(),
            self.status.as_u16(),
            headers,
            self.body.to_vec(),
        );
        cached.status_text = self.status.canonical_reason().map(str::to_string);
        cached
    }

    /// Rebuild a response from a stored snapshot.
    pub fn from_cached(cached: &CachedResponse) -> Result<Self, Error> {
        let url = Url::parse(&cached.url).map_err(|e| Error::CorruptEntry(format!("{}: {e}", cached.url)))?;
        let status = StatusCode::from_u16(cached.status)
            .map_err(|e| Error::CorruptEntry(format!("status {}: {e}", cached.status)))?;

        let mut headers = HeaderMap::with_capacity(cached.headers.len());
        for (name, value) in &cached.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::warn!(header = %name, url = %cached.url, "dropping unreadable cached header"),
            }
        }

        Ok(Self::new(url, status, headers, cached.body.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::DATE;

    #[test]
    fn test_cached_snapshot_keeps_body_and_headers() {
        let url = Url::parse("https://site.example/css/app.css").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/css"));
        headers.insert(DATE, HeaderValue::from_static("Sun, 06 Nov 1994 08:49:37 GMT"));
        let response = Response::new(url.clone(), StatusCode::OK, headers, "body { margin: 0 }");

        let cached = response.to_cached(&Request::get(url));
        assert_eq!(cached.status, 200);
        assert_eq!(cached.status_text.as_deref(), Some("OK"));
        assert_eq!(cached.header("Content-Type"), Some("text/css"));
        assert!(cached.timestamp().is_some());

        let restored = Response::from_cached(&cached).unwrap();
        assert_eq!(restored.body, response.body);
        assert_eq!(restored.content_type(), Some("text/css"));
        assert_eq!(restored.status, StatusCode::OK);
    }

    #[test]
    fn test_from_cached_rejects_bad_url() {
        let mut cached = CachedResponse::new("GET", "https://site.example/", 200, vec![], vec![]);
        cached.url = "not a url".into();
        assert!(matches!(Response::from_cached(&cached), Err(Error::CorruptEntry(_))));
    }

    #[test]
    fn test_synthesized() {
        let url = Url::parse("https://site.example/missing").unwrap();
        let response = Response::synthesized(url, StatusCode::SERVICE_UNAVAILABLE, "text/plain", "offline");
        assert!(!response.is_success());
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(response.text(), "offline");
    }
}
