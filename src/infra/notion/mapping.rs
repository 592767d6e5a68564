//! Page properties to `Post`.

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::warn;

use crate::domain::{
    posts::{self, Post, UNTITLED},
    slug::derive_slug,
};

use super::model::{Page, PropertyValue, RichText};

const TITLE_CANDIDATES: [&str; 4] = ["Project name", "Title", "Name", "Post Title"];
const DESCRIPTION_PROPERTY: &str = "Prioritization Note";
const COVER_PROPERTY: &str = "Attach file";
const DATE_PROPERTY: &str = "createdAt";
const CREATED_BY_PROPERTY: &str = "createdBy";
const ASSIGNEES_PROPERTY: &str = "Assignees";
const TAGS_PROPERTY: &str = "Work Tags";
const FIRST_SLASH_PROPERTY: &str = "firstSlash";
const SECOND_SLASH_PROPERTY: &str = "secondSlash";

/// Build a post from a page and its rendered body.
pub fn page_to_post(page: &Page, content: String) -> Post {
    let title = resolve_title(page);
    let description = first_fragment(page, DESCRIPTION_PROPERTY)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| posts::derive_description(&content));
    let cover_image = cover_url(page).or_else(|| posts::extract_first_image(&content));

    Post {
        id: page.id.clone(),
        slug: derive_slug(&title),
        title,
        cover_image,
        description,
        date: resolve_date(page),
        author: resolve_author(page),
        tags: tags(page),
        category: None,
        first_slash: first_fragment(page, FIRST_SLASH_PROPERTY),
        second_slash: first_fragment(page, SECOND_SLASH_PROPERTY),
        content,
    }
}

/// First populated title among the known candidates, else any title-typed
/// property in document order, else [`UNTITLED`].
pub fn resolve_title(page: &Page) -> String {
    let candidate = TITLE_CANDIDATES.iter().find_map(|name| match page.properties.get(name) {
        Some(PropertyValue::Title { title }) if !title.is_empty() => first_text(title),
        _ => None,
    });
    if let Some(title) = candidate {
        return title;
    }

    warn!(
        target = "canopy::notion::mapping",
        page_id = %page.id,
        available = ?page.properties.keys().collect::<Vec<_>>(),
        "no known title property on page"
    );

    let fallback = page.properties.iter().find_map(|(name, value)| match value {
        PropertyValue::Title { title } => Some((name, first_text(title))),
        _ => None,
    });

    match fallback {
        Some((name, Some(title))) => {
            warn!(
                target = "canopy::notion::mapping",
                page_id = %page.id,
                property = name,
                "using fallback title property"
            );
            title
        }
        _ => UNTITLED.to_string(),
    }
}

fn first_text(fragments: &[RichText]) -> Option<String> {
    fragments
        .first()
        .map(|fragment| fragment.plain_text.clone())
        .filter(|text| !text.is_empty())
}

fn first_fragment(page: &Page, property: &str) -> Option<String> {
    match page.properties.get(property) {
        Some(PropertyValue::RichText { rich_text }) => first_text(rich_text),
        _ => None,
    }
}

fn cover_url(page: &Page) -> Option<String> {
    match page.properties.get(COVER_PROPERTY) {
        Some(PropertyValue::Files { files }) => files.first()?.url().map(str::to_string),
        _ => None,
    }
}

fn resolve_date(page: &Page) -> String {
    if let Some(PropertyValue::Date { date: Some(date) }) = page.properties.get(DATE_PROPERTY) {
        return date.start.clone();
    }
    if let Some(created) = page.created_time.as_ref() {
        return created.clone();
    }
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

fn resolve_author(page: &Page) -> Option<String> {
    if let Some(PropertyValue::CreatedBy { created_by }) = page.properties.get(CREATED_BY_PROPERTY)
        && let Some(name) = created_by.name.as_ref()
    {
        return Some(name.clone());
    }

    match page.properties.get(ASSIGNEES_PROPERTY) {
        Some(PropertyValue::People { people }) => people.first()?.name.clone(),
        _ => None,
    }
}

fn tags(page: &Page) -> Vec<String> {
    match page.properties.get(TAGS_PROPERTY) {
        Some(PropertyValue::MultiSelect { multi_select }) => {
            multi_select.iter().map(|tag| tag.name.clone()).collect()
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(properties: &str) -> Page {
        serde_json::from_str(&format!(
            r#"{{"id": "page-1", "created_time": "2025-01-02T03:04:05.000Z", "properties": {properties}}}"#
        ))
        .expect("page")
    }

    #[test]
    fn maps_known_properties() {
        let page = page(
            r#"{
            "Project name": {"type": "title", "title": [{"plain_text": "My Post!"}]},
            "Prioritization Note": {"type": "rich_text", "rich_text": [{"plain_text": "Why it matters"}]},
            "Attach file": {"type": "files", "files": [{"type": "file", "file": {"url": "https://files.example/cover.jpg"}}]},
            "createdAt": {"type": "date", "date": {"start": "2025-03-04"}},
            "Assignees": {"type": "people", "people": [{"name": "Ada"}]},
            "Work Tags": {"type": "multi_select", "multi_select": [{"name": "Published Blog Post"}, {"name": "ClimateFair"}]},
            "firstSlash": {"type": "rich_text", "rich_text": [{"plain_text": "funding"}]},
            "secondSlash": {"type": "rich_text", "rich_text": [{"plain_text": "grants-101"}]}
        }"#,
        );

        let post = page_to_post(&page, "Body text".to_string());
        assert_eq!(post.title, "My Post!");
        assert_eq!(post.slug, "my-post");
        assert_eq!(post.description, "Why it matters");
        assert_eq!(post.cover_image.as_deref(), Some("https://files.example/cover.jpg"));
        assert_eq!(post.date, "2025-03-04");
        assert_eq!(post.author.as_deref(), Some("Ada"));
        assert_eq!(post.tags, ["Published Blog Post", "ClimateFair"]);
        assert_eq!(post.route_key().map(|k| k.to_string()).as_deref(), Some("funding/grants-101"));
        assert_eq!(post.category, None);
    }

    #[test]
    fn fallback_title_scan_finds_any_title_property() {
        let page = page(
            r#"{
            "Status": {"type": "status", "status": {"name": "Done"}},
            "Headline": {"type": "title", "title": [{"plain_text": "Carbon Markets Explained"}]}
        }"#,
        );
        let title = resolve_title(&page);
        assert_ne!(title, UNTITLED);
        assert_eq!(title, "Carbon Markets Explained");
    }

    #[test]
    fn empty_candidates_are_skipped() {
        let page = page(
            r#"{
            "Project name": {"type": "title", "title": []},
            "Name": {"type": "title", "title": [{"plain_text": "Second Choice"}]}
        }"#,
        );
        assert_eq!(resolve_title(&page), "Second Choice");
    }

    #[test]
    fn missing_fields_fall_back_to_body_and_page_metadata() {
        let page = page(r#"{"Name": {"type": "rich_text", "rich_text": []}}"#);
        let content = "Intro line\n\n![diagram](https://img.example/d.webp)".to_string();

        let post = page_to_post(&page, content);
        assert_eq!(post.title, UNTITLED);
        assert_eq!(post.slug, "untitled");
        assert_eq!(post.description, "Intro line");
        assert_eq!(post.cover_image.as_deref(), Some("https://img.example/d.webp"));
        assert_eq!(post.date, "2025-01-02T03:04:05.000Z");
        assert!(post.tags.is_empty());
        assert!(!post.has_nested_route());
    }
}
