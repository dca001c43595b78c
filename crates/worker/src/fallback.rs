//! Last-resort responses for intercepted requests.

use offcache_client::{Request, Response, StatusCode, Url};

use super::handlers::{HandlerContext, Served, Source};

/// Placeholder served for images that are neither reachable nor cached.
pub const PLACEHOLDER_SVG: &str = concat!(
    r##"<svg width="200" height="200" xmlns="http://www.w3.org/2000/svg">"##,
    r##"<rect width="200" height="200" fill="#f0f0f0"/>"##,
    r##"<text x="100" y="100" text-anchor="middle" fill="#999">Image Unavailable</text>"##,
    "</svg>"
);

pub const UNAVAILABLE_BODY: &str = "Offline - Content not available";

/// Produce a response for a request that neither the network nor its
/// handler could satisfy. Never fails.
///
/// Order: any cached copy, the cached root document for HTML requests,
/// an SVG placeholder for images, and finally a plain-text 503.
pub async fn offline_response(ctx: &HandlerContext, origin: &Url, request: &Request) -> Served {
    if let Some(cached) = ctx.lookup(request).await {
        return Served::cache(cached);
    }

    if request.accepts_html() {
        match origin.join("/") {
            Ok(root) => {
                if let Some(page) = ctx.lookup(&Request::get(root)).await {
                    tracing::info!(url = %request.url, "serving cached root document as offline page");
                    return Served::new(page, Source::OfflinePage);
                }
            }
            Err(e) => tracing::warn!(origin = %origin, error = %e, "cannot derive root document URL"),
        }
    }

    if request.accepts_image() {
        let response = Response::synthesized(request.url.clone(), StatusCode::OK, "image/svg+xml", PLACEHOLDER_SVG);
        return Served::new(response, Source::Placeholder);
    }

    let response = Response::synthesized(
        request.url.clone(),
        StatusCode::SERVICE_UNAVAILABLE,
        "text/plain",
        UNAVAILABLE_BODY,
    );
    Served::new(response, Source::Unavailable)
}
