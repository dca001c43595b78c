//! Network-first: prefer a live response, fall back to any cached copy.

use offcache_client::Request;
use offcache_core::Error;

use super::{HandlerContext, Served};

pub async fn network_first(ctx: &HandlerContext, request: &Request) -> Result<Served, Error> {
    match ctx.network.fetch(request).await {
        Ok(response) => {
            ctx.remember(request, &response).await;
            Ok(Served::network(response))
        }
        Err(e) => {
            tracing::debug!(url = %request.url, error = %e, "network failed; trying cache");
            ctx.lookup(request).await.map(Served::cache).ok_or(e)
        }
    }
}
