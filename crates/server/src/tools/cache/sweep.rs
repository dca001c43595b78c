//! cache_sweep tool implementation.
//!
//! Runs one janitor sweep over the dynamic generation.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use offcache_core::Error;
use offcache_worker::Janitor;

/// Parameters for the cache_sweep tool. Takes none.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheSweepParams {}

pub async fn sweep_impl(janitor: &Janitor, _params: CacheSweepParams) -> Result<CallToolResult, McpError> {
    let report = janitor.sweep().await;

    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize sweep report: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use offcache_core::{CacheDb, CachedResponse};
    use offcache_worker::SweepReport;

    fn dated(url: &str, age: Duration) -> CachedResponse {
        let date = (Utc::now() - age).to_rfc2822();
        CachedResponse::new("GET", url, 200, vec![("date".into(), date)], b"x".to_vec())
    }

    #[tokio::test]
    async fn test_sweep_impl_reports_evictions() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        cache.put_entry("dynamic-v1", &dated("https://site.example/old", Duration::days(10))).await.unwrap();
        cache.put_entry("dynamic-v1", &dated("https://site.example/new", Duration::hours(1))).await.unwrap();

        let janitor = Janitor::new(cache.clone(), "dynamic-v1", Duration::days(7));
        let result = sweep_impl(&janitor, CacheSweepParams {}).await.unwrap();
        let text = result.content[0].as_text().unwrap().text.clone();
        let report: SweepReport = serde_json::from_str(&text).unwrap();

        assert_eq!(report.evicted, 1);
        assert_eq!(report.retained, 1);
        assert_eq!(cache.count_entries("dynamic-v1").await.unwrap(), 1);
    }
}
