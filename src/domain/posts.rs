//! Published post records and the text-derived fields computed from them.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::lookup::RouteKey;

/// Maximum number of characters kept from the first body line when a post
/// has no explicit description.
pub const DESCRIPTION_LIMIT: usize = 280;
pub const DESCRIPTION_ELLIPSIS: &str = "...";
pub const UNTITLED: &str = "Untitled";

const WORDS_PER_MINUTE: usize = 200;

static MARKDOWN_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[.*?\]\((.*?)\)").expect("image pattern is valid"));
static BARE_IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(https?://\S+\.(?:png|jpg|jpeg|gif|webp))").expect("image url pattern is valid")
});
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("word pattern is valid"));

/// A single published content item as stored in the post cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub description: String,
    /// RFC 3339 publication date.
    pub date: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_slash: Option<String>,
    #[serde(default, alias = "postTitle", skip_serializing_if = "Option::is_none")]
    pub second_slash: Option<String>,
}

impl Post {
    /// Nested route for this post when both segments are populated.
    pub fn route_key(&self) -> Option<RouteKey> {
        let first = self.first_slash.as_deref()?;
        let second = self.second_slash.as_deref()?;
        RouteKey::new(first, second).ok()
    }

    pub fn has_nested_route(&self) -> bool {
        self.route_key().is_some()
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.content)
    }

    pub fn reading_time_minutes(&self) -> usize {
        reading_time_minutes(&self.content)
    }
}

/// Lightweight document reference returned by the published-posts query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostSummary {
    pub id: String,
    pub created_time: Option<String>,
}

/// Take the first non-blank line of `content`, truncated to
/// [`DESCRIPTION_LIMIT`] characters with a trailing ellipsis when cut.
pub fn derive_description(content: &str) -> String {
    let Some(first) = content.lines().find(|line| !line.trim().is_empty()) else {
        return String::new();
    };

    if first.chars().count() > DESCRIPTION_LIMIT {
        let mut truncated: String = first.chars().take(DESCRIPTION_LIMIT).collect();
        truncated.push_str(DESCRIPTION_ELLIPSIS);
        truncated
    } else {
        first.to_string()
    }
}

/// First image referenced by rendered body text: markdown image syntax
/// first, then any bare URL ending in a known image extension.
pub fn extract_first_image(content: &str) -> Option<String> {
    if let Some(captures) = MARKDOWN_IMAGE.captures(content) {
        return captures.get(1).map(|m| m.as_str().to_string());
    }

    BARE_IMAGE_URL
        .captures(content)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn word_count(content: &str) -> usize {
    NON_WORD.replace_all(content, " ").split_whitespace().count()
}

/// Estimated reading time at 200 words per minute, never below one minute.
pub fn reading_time_minutes(content: &str) -> usize {
    word_count(content).div_ceil(WORDS_PER_MINUTE).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_with_route(first: Option<&str>, second: Option<&str>) -> Post {
        Post {
            id: "page-1".to_string(),
            title: "Routing".to_string(),
            slug: "routing".to_string(),
            cover_image: None,
            description: String::new(),
            date: "2025-03-01T00:00:00.000Z".to_string(),
            content: String::new(),
            author: None,
            tags: Vec::new(),
            category: None,
            first_slash: first.map(str::to_string),
            second_slash: second.map(str::to_string),
        }
    }

    #[test]
    fn long_first_line_is_cut_to_limit_with_ellipsis() {
        let line = format!("Hello world. More text...{}", "x".repeat(300));
        let description = derive_description(&format!("\n\n{line}\nsecond line"));

        assert_eq!(
            description.chars().count(),
            DESCRIPTION_LIMIT + DESCRIPTION_ELLIPSIS.len()
        );
        assert!(description.starts_with("Hello world."));
        assert!(description.ends_with("..."));
        assert_eq!(
            &description[..DESCRIPTION_LIMIT],
            &line[..DESCRIPTION_LIMIT]
        );
    }

    #[test]
    fn short_first_line_is_kept_verbatim() {
        assert_eq!(derive_description("   \nShort intro.\nMore"), "Short intro.");
        assert_eq!(derive_description(""), "");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let line = "é".repeat(DESCRIPTION_LIMIT + 5);
        let description = derive_description(&line);
        assert_eq!(description.chars().count(), DESCRIPTION_LIMIT + 3);
    }

    #[test]
    fn markdown_image_wins_over_bare_url() {
        let content = "See https://cdn.example.com/a.png and ![chart](https://img.example.com/b.jpg)";
        assert_eq!(
            extract_first_image(content).as_deref(),
            Some("https://img.example.com/b.jpg")
        );
    }

    #[test]
    fn bare_image_url_is_case_insensitive() {
        let content = "Logo at https://cdn.example.com/logo.PNG today";
        assert_eq!(
            extract_first_image(content).as_deref(),
            Some("https://cdn.example.com/logo.PNG")
        );
        assert_eq!(extract_first_image("no images here"), None);
    }

    #[test]
    fn route_key_requires_both_segments() {
        assert!(post_with_route(Some("funding"), Some("grants")).has_nested_route());
        assert!(!post_with_route(Some("funding"), None).has_nested_route());
        assert!(!post_with_route(None, Some("grants")).has_nested_route());
        assert!(!post_with_route(Some(""), Some("grants")).has_nested_route());
    }

    #[test]
    fn second_segment_accepts_post_title_alias() {
        let json = r#"{"id":"a","title":"T","slug":"t","date":"2025-01-01","firstSlash":"x","postTitle":"y"}"#;
        let post: Post = serde_json::from_str(json).expect("post");
        assert_eq!(post.second_slash.as_deref(), Some("y"));
        assert_eq!(post.content, "");
    }

    #[test]
    fn word_count_ignores_punctuation() {
        assert_eq!(word_count("Hello, world! It's -- fine."), 5);
        assert_eq!(word_count(""), 0);
        assert_eq!(reading_time_minutes(""), 1);
        assert_eq!(reading_time_minutes(&"word ".repeat(401)), 3);
    }
}
