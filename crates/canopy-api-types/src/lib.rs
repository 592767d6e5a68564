//! Response bodies exposed by the Canopy HTTP surface.
//!
//! Field names follow the camelCase JSON shape consumed by the site frontend
//! and the deployment cron that calls the refresh endpoint.

use serde::{Deserialize, Serialize};

/// Body returned after a forced rebuild of the route lookup cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub entry_count: usize,
    /// RFC 3339 timestamp of the rebuilt lookup.
    pub last_updated: String,
    /// Human-readable name of the active storage backend.
    pub storage: String,
}

/// Body returned by the read-only status check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    pub status: String,
    pub entry_count: usize,
    pub storage: String,
    pub environment: String,
    pub timestamp: String,
}

/// Uniform failure body for the cache endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub details: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            details: details.into(),
        }
    }
}

/// Listing entry for a cached post; omits the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListItem {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Site-relative link, nested route when available.
    pub href: String,
    pub reading_time_minutes: usize,
}
