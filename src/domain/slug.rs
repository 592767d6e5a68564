//! Slug derivation for post titles.
//!
//! Slugs are lowercase kebab-case and carry no uniqueness guarantee: two
//! posts with the same title share a slug, and the first one in cache order
//! wins on lookup. Only ASCII letters and digits survive; every other run of
//! characters collapses into a single dash.

use std::sync::LazyLock;

use regex::Regex;

/// Slug used when a title has no representable characters.
pub const FALLBACK_SLUG: &str = "untitled";

static NON_SLUG_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));

/// Derive a slug from a human-readable title. Never returns an empty string.
pub fn derive_slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    let candidate = NON_SLUG_RUN.replace_all(&lowered, "-");
    let candidate = candidate.trim_matches('-');
    if candidate.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        candidate.to_string()
    }
}
