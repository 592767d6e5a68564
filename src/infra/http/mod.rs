mod cache;
mod error;
mod middleware;
mod public;

use std::sync::Arc;

use axum::{
    Router,
    middleware as axum_middleware,
    routing::get,
};

use crate::application::{lookup::RouteLookupCache, posts::PostCache, sitemap::SitemapService};

pub use error::{ApiError, ErrorReport};
pub use middleware::{REQUEST_ID_HEADER, RequestContext, log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub lookup: Arc<RouteLookupCache>,
    pub posts: PostCache,
    pub sitemap: Arc<SitemapService>,
    /// Deployment stage reported by the status endpoint.
    pub environment: Arc<str>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route(
            "/api/cache",
            get(cache::refresh_cache).post(cache::refresh_cache),
        )
        .route("/api/cache/status", get(cache::cache_status))
        .route("/api/posts", get(public::list_posts))
        .route("/api/posts/{slug}", get(public::post_by_slug))
        .route("/api/routes/{first}/{second}", get(public::post_by_route))
        .route("/sitemap.xml", get(public::sitemap))
        .route("/healthz", get(public::healthz))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
