//! Strategy selection for intercepted requests.
//!
//! Rules are evaluated in order and the first match wins: network-first
//! prefixes, then cache-first prefixes, then HTML documents go
//! stale-while-revalidate, and everything else falls back to network-first.

use offcache_client::{Request, Url};
use offcache_core::AppConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fetch/cache interaction used for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    NetworkFirst,
    CacheFirst,
    StaleWhileRevalidate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    /// Matches the URL path on any host, e.g. `/api/`.
    Path(String),
    /// Matches the start of the absolute URL, e.g. `https://fonts.gstatic.com/`.
    Absolute(String),
}

impl Pattern {
    fn parse(pattern: &str) -> Self {
        if pattern.contains("://") {
            Pattern::Absolute(pattern.to_lowercase())
        } else {
            Pattern::Path(pattern.to_string())
        }
    }

    fn matches(&self, url: &Url) -> bool {
        match self {
            Pattern::Path(prefix) => url.path().starts_with(prefix.as_str()),
            Pattern::Absolute(prefix) => url.as_str().starts_with(prefix.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
struct RouteRule {
    pattern: Pattern,
    strategy: Strategy,
}

/// URL classification rules, fixed at construction.
#[derive(Debug, Clone)]
pub struct RouteRules {
    rules: Vec<RouteRule>,
}

impl RouteRules {
    pub fn new(network_first: &[String], cache_first: &[String]) -> Self {
        let network = network_first
            .iter()
            .map(|p| RouteRule { pattern: Pattern::parse(p), strategy: Strategy::NetworkFirst });
        let cache = cache_first
            .iter()
            .map(|p| RouteRule { pattern: Pattern::parse(p), strategy: Strategy::CacheFirst });
        Self { rules: network.chain(cache).collect() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.network_first, &config.cache_first)
    }

    pub fn select(&self, request: &Request) -> Strategy {
        if let Some(rule) = self.rules.iter().find(|rule| rule.pattern.matches(&request.url)) {
            return rule.strategy;
        }

        if request.accepts_html() { Strategy::StaleWhileRevalidate } else { Strategy::NetworkFirst }
    }
}

impl Default for RouteRules {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}
