//! Cache refresh and status endpoints.

use axum::{Json, extract::State, response::IntoResponse, response::Response};
use canopy_api_types::{RefreshResponse, StatusResponse};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{error, info};

use super::{HttpState, error::ApiError};

const CACHE_LOADED: &str = "cache_loaded";

/// Force a rebuild of the route lookup and report the result.
pub(super) async fn refresh_cache(State(state): State<HttpState>) -> Response {
    info!(target = "canopy::http::cache", "starting route lookup refresh");

    match state.lookup.get_route_lookup_map(true).await {
        Ok(envelope) => {
            info!(
                target = "canopy::http::cache",
                entry_count = envelope.entry_count,
                "refreshed route lookup"
            );
            Json(RefreshResponse {
                success: true,
                message: Some("Route lookup cache refreshed".to_string()),
                entry_count: envelope.lookup.len(),
                last_updated: envelope.last_updated_rfc3339(),
                storage: state.lookup.storage_label().to_string(),
            })
            .into_response()
        }
        Err(err) => {
            error!(target = "canopy::http::cache", error = %err, "refresh failed");
            ApiError::internal(
                "infra::http::cache::refresh_cache",
                "Failed to refresh route lookup cache",
                err.to_string(),
            )
            .into_response()
        }
    }
}

/// Load the lookup without forcing a rebuild and describe it.
pub(super) async fn cache_status(State(state): State<HttpState>) -> Response {
    match state.lookup.get_route_lookup_map(false).await {
        Ok(envelope) => Json(StatusResponse {
            success: true,
            status: CACHE_LOADED.to_string(),
            entry_count: envelope.lookup.len(),
            storage: state.lookup.storage_label().to_string(),
            environment: state.environment.to_string(),
            timestamp: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
        })
        .into_response(),
        Err(err) => {
            error!(target = "canopy::http::cache", error = %err, "status check failed");
            ApiError::internal(
                "infra::http::cache::cache_status",
                "Failed to check cache status",
                err.to_string(),
            )
            .into_response()
        }
    }
}
