//! Two-segment route keys and the persisted lookup envelope.

use std::{collections::BTreeMap, fmt, time::Duration};

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use super::error::DomainError;

/// Composite `"{first}/{second}"` key for nested post routes.
///
/// Segments are taken exactly as the CMS returns them; no case folding or
/// trimming is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    first: String,
    second: String,
}

impl RouteKey {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Result<Self, DomainError> {
        let first = first.into();
        let second = second.into();
        if first.is_empty() || second.is_empty() {
            return Err(DomainError::validation(
                "route segments must both be non-empty",
            ));
        }
        Ok(Self { first, second })
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.first, self.second)
    }
}

/// Route key to document identifier map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteLookup(BTreeMap<String, String>);

impl RouteLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &RouteKey, document_id: impl Into<String>) {
        self.0.insert(key.to_string(), document_id.into());
    }

    pub fn resolve(&self, key: &RouteKey) -> Option<&str> {
        self.0.get(&key.to_string()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Persisted unit wrapping a lookup with its build time.
///
/// `entry_count` is informational and is not checked against `lookup` on
/// read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteLookupEnvelope {
    pub lookup: RouteLookup,
    /// Build time in epoch milliseconds.
    pub last_updated: i64,
    pub entry_count: usize,
}

impl RouteLookupEnvelope {
    pub fn new(lookup: RouteLookup, last_updated: i64) -> Self {
        let entry_count = lookup.len();
        Self {
            lookup,
            last_updated,
            entry_count,
        }
    }

    /// True while `now - last_updated` is strictly below `ttl`.
    pub fn is_fresh(&self, now_ms: i64, ttl: Duration) -> bool {
        is_within_ttl(self.last_updated, now_ms, ttl)
    }

    pub fn last_updated_rfc3339(&self) -> String {
        millis_to_rfc3339(self.last_updated)
    }
}

pub fn is_within_ttl(built_at_ms: i64, now_ms: i64, ttl: Duration) -> bool {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now_ms.saturating_sub(built_at_ms) < ttl_ms
}

pub fn now_millis() -> i64 {
    to_millis(OffsetDateTime::now_utc())
}

pub fn to_millis(instant: OffsetDateTime) -> i64 {
    i64::try_from(instant.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

pub fn millis_to_rfc3339(ms: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .ok()
        .and_then(|instant| instant.format(&Rfc3339).ok())
        .unwrap_or_default()
}
