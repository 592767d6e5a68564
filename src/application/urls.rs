//! Public URL construction for blog posts.

use crate::domain::posts::Post;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUrls {
    base: String,
}

impl SiteUrls {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `{site}/blog{path}`.
    pub fn canonical_url(&self, path: &str) -> String {
        if path.is_empty() || path.starts_with('/') {
            format!("{}/blog{path}", self.base)
        } else {
            format!("{}/blog/{path}", self.base)
        }
    }

    pub fn blog_index_url(&self) -> String {
        self.canonical_url("")
    }

    /// Canonical address of a post: the nested route when the post has one.
    pub fn canonical_post_url(&self, post: &Post) -> String {
        match post.route_key() {
            Some(key) => format!("{}/{key}", self.base),
            None => self.canonical_url(&format!("/{}", post.slug)),
        }
    }
}

/// Site-relative link to a post, preferring the nested route.
pub fn internal_post_href(post: &Post) -> String {
    match post.route_key() {
        Some(key) => format!("/{key}"),
        None => format!("/blog/{}", post.slug),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(first: Option<&str>, second: Option<&str>) -> Post {
        Post {
            id: "p".to_string(),
            title: "Climate Finance 101".to_string(),
            slug: "climate-finance-101".to_string(),
            cover_image: None,
            description: String::new(),
            date: "2025-01-01".to_string(),
            content: String::new(),
            author: None,
            tags: Vec::new(),
            category: None,
            first_slash: first.map(str::to_string),
            second_slash: second.map(str::to_string),
        }
    }

    #[test]
    fn nested_posts_use_their_route() {
        let urls = SiteUrls::new("https://climatefair.co/");
        let nested = post(Some("finance"), Some("climate-101"));
        assert_eq!(internal_post_href(&nested), "/finance/climate-101");
        assert_eq!(
            urls.canonical_post_url(&nested),
            "https://climatefair.co/finance/climate-101"
        );
    }

    #[test]
    fn flat_posts_live_under_blog_once() {
        let urls = SiteUrls::new("https://climatefair.co");
        let flat = post(Some("finance"), None);
        assert_eq!(internal_post_href(&flat), "/blog/climate-finance-101");
        assert_eq!(
            urls.canonical_post_url(&flat),
            "https://climatefair.co/blog/climate-finance-101"
        );
    }

    #[test]
    fn canonical_url_adds_missing_slash() {
        let urls = SiteUrls::new("https://example.org");
        assert_eq!(urls.canonical_url("about"), "https://example.org/blog/about");
        assert_eq!(urls.blog_index_url(), "https://example.org/blog");
    }
}
