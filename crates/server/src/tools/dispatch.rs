//! shim_dispatch tool implementation.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use offcache_core::Error;
use offcache_worker::{Event, Registration};

/// Parameters for the shim_dispatch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShimDispatchParams {
    /// The event, tagged by `kind`, e.g. `{"kind": "sync", "tag": "background-sync"}`.
    pub event: Event,
}

pub async fn dispatch_impl(registration: &Registration, params: ShimDispatchParams) -> Result<CallToolResult, McpError> {
    let outcome = registration.dispatch(params.event).await?;
    let json = serde_json::to_string_pretty(&outcome)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize outcome: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
