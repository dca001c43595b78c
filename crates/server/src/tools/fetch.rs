//! shim_fetch tool implementation.
//!
//! Runs a GET through the active worker, the same path a page request takes.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use offcache_core::Error;
use offcache_worker::{FetchReport, Registration, build_request};

/// Parameters for the shim_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShimFetchParams {
    /// Absolute URL, or a path relative to the configured origin.
    pub url: String,

    /// Optional Accept header, e.g. "text/html" to request a page.
    #[serde(default)]
    pub accept: Option<String>,
}

pub async fn fetch_impl(registration: &Registration, params: ShimFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let request = build_request(registration.origin(), &params.url, None, params.accept.as_deref())?;
    let served = registration.fetch(&request).await?;
    let report = FetchReport::from(&served);

    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize response: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
