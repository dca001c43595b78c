//! Cache-first: serve from any generation, refresh in the background.

use offcache_client::Request;
use offcache_core::Error;

use super::{HandlerContext, Served};

/// Serve a cached copy if one exists, otherwise fetch and store.
///
/// A hit returns immediately; the refresh it spawns is never awaited.
/// A miss propagates network failures to the caller's fallback path.
pub async fn cache_first(ctx: &HandlerContext, request: &Request) -> Result<Served, Error> {
    if let Some(cached) = ctx.lookup(request).await {
        ctx.spawn_refresh(request.clone());
        return Ok(Served::cache(cached));
    }

    let response = ctx.network.fetch(request).await?;
    ctx.remember(request, &response).await;
    Ok(Served::network(response))
}
