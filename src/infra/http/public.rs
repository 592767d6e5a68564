//! Read endpoints over the cached content.

use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use canopy_api_types::PostListItem;
use time::OffsetDateTime;

use crate::{application::urls::internal_post_href, domain::posts::Post};

use super::{HttpState, error::ApiError};

pub(super) async fn list_posts(State(state): State<HttpState>) -> Response {
    let cache = state.posts.clone();
    match read_post_cache(move || cache.load()).await {
        Ok(posts) => Json(posts.iter().map(list_item).collect::<Vec<PostListItem>>()).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(super) async fn post_by_slug(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Response {
    let cache = state.posts.clone();
    let wanted = slug.clone();
    let found = match read_post_cache(move || cache.find_by_slug(&wanted)).await {
        Ok(found) => found,
        Err(err) => return err.into_response(),
    };
    match found {
        Some(post) => Json(post).into_response(),
        None => ApiError::not_found(
            "infra::http::public::post_by_slug",
            "Post not found",
            format!("no cached post with slug `{slug}`"),
        )
        .into_response(),
    }
}

pub(super) async fn post_by_route(
    State(state): State<HttpState>,
    Path((first, second)): Path<(String, String)>,
) -> Response {
    match state.lookup.get_post_by_route(&first, &second).await {
        Ok(Some(post)) => Json(post).into_response(),
        Ok(None) => ApiError::not_found(
            "infra::http::public::post_by_route",
            "Post not found",
            format!("no post resolved for route `{first}/{second}`"),
        )
        .into_response(),
        Err(err) => ApiError::internal(
            "infra::http::public::post_by_route",
            "Failed to load route lookup",
            err.to_string(),
        )
        .into_response(),
    }
}

pub(super) async fn sitemap(State(state): State<HttpState>) -> Response {
    let sitemap = state.sitemap.clone();
    match read_post_cache(move || sitemap.sitemap_xml(OffsetDateTime::now_utc())).await {
        Ok(xml) => xml_response(xml, "application/xml"),
        Err(err) => err.into_response(),
    }
}

pub(super) async fn healthz() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Run a post cache read on the blocking pool.
async fn read_post_cache<T, F>(read: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(read).await.map_err(|err| {
        ApiError::internal(
            "infra::http::public::read_post_cache",
            "Failed to read post cache",
            err.to_string(),
        )
    })
}

fn list_item(post: &Post) -> PostListItem {
    PostListItem {
        id: post.id.clone(),
        title: post.title.clone(),
        slug: post.slug.clone(),
        description: post.description.clone(),
        date: post.date.clone(),
        cover_image: post.cover_image.clone(),
        author: post.author.clone(),
        tags: post.tags.clone(),
        href: internal_post_href(post),
        reading_time_minutes: post.reading_time_minutes(),
    }
}

fn xml_response(body: String, content_type: &str) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
