//! Stale-while-revalidate: answer from cache, refresh for next time.

use offcache_client::Request;
use offcache_core::Error;

use super::{HandlerContext, Served};

/// Start the network fetch, then look in the cache without waiting for it.
///
/// With a cached copy the network task is left running detached: it writes
/// the dynamic generation on success and its failure is dropped. Without one
/// the network task is awaited and its result returned.
pub async fn stale_while_revalidate(ctx: &HandlerContext, request: &Request) -> Result<Served, Error> {
    let revalidate = {
        let ctx = ctx.clone();
        let request = request.clone();
        tokio::spawn(async move {
            let result = ctx.network.fetch(&request).await;
            match &result {
                Ok(response) => ctx.remember(&request, response).await,
                Err(e) => tracing::debug!(url = %request.url, error = %e, "revalidation failed"),
            }
            result
        })
    };

    if let Some(cached) = ctx.lookup(request).await {
        return Ok(Served::cache(cached));
    }

    match revalidate.await {
        Ok(result) => result.map(Served::network),
        Err(e) => Err(Error::Network(format!("revalidation task for {} aborted: {e}", request.url))),
    }
}
