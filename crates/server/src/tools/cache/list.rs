//! cache_list tool implementation.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use offcache_core::{CacheDb, Error, GenerationInfo};

/// Parameters for the cache_list tool. Takes none.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    /// Generations in creation order.
    pub generations: Vec<GenerationInfo>,
}

pub async fn list_impl(cache: &CacheDb, _params: CacheListParams) -> Result<CallToolResult, McpError> {
    let generations = cache.generation_info().await?;

    let output = CacheListOutput { generations };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize generations: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use offcache_core::CachedResponse;

    #[tokio::test]
    async fn test_list_impl_empty() {
        let cache = CacheDb::open_in_memory().await.unwrap();

        let result = list_impl(&cache, CacheListParams {}).await.unwrap();
        let text = result.content[0].as_text().unwrap().text.clone();
        let output: CacheListOutput = serde_json::from_str(&text).unwrap();
        assert!(output.generations.is_empty());
    }

    #[tokio::test]
    async fn test_list_impl_counts_entries() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        cache.open_generation("static-v1").await.unwrap();
        let entry = CachedResponse::new("GET", "https://site.example/api/x", 200, vec![], b"{}".to_vec());
        cache.put_entry("dynamic-v1", &entry).await.unwrap();

        let result = list_impl(&cache, CacheListParams {}).await.unwrap();
        let text = result.content[0].as_text().unwrap().text.clone();
        let output: CacheListOutput = serde_json::from_str(&text).unwrap();

        let summary: Vec<_> = output.generations.iter().map(|g| (g.name.as_str(), g.entries)).collect();
        assert_eq!(summary, vec![("static-v1", 0), ("dynamic-v1", 1)]);
    }
}
