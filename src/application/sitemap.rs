//! sitemap.xml generation from the post cache.

use time::{
    Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description,
};

use super::{posts::PostCache, urls::SiteUrls};

#[derive(Debug, Clone)]
pub struct SitemapService {
    posts: PostCache,
    urls: SiteUrls,
}

impl SitemapService {
    pub fn new(posts: PostCache, urls: SiteUrls) -> Self {
        Self { posts, urls }
    }

    /// Blog index plus one entry per cached post. Never calls the CMS.
    pub fn sitemap_xml(&self, now: OffsetDateTime) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
        );

        xml.push_str(&sitemap_entry(
            &self.urls.blog_index_url(),
            now.format(&Rfc3339).ok().as_deref(),
            "daily",
            "1.0",
        ));

        for post in self.posts.load() {
            xml.push_str(&sitemap_entry(
                &self.urls.canonical_post_url(&post),
                normalize_lastmod(&post.date).as_deref(),
                "weekly",
                "0.8",
            ));
        }

        xml.push_str("</urlset>\n");
        xml
    }
}

fn sitemap_entry(loc: &str, lastmod: Option<&str>, changefreq: &str, priority: &str) -> String {
    let loc = escape_xml(loc);
    match lastmod {
        Some(lastmod) => format!(
            "  <url><loc>{loc}</loc><lastmod>{lastmod}</lastmod><changefreq>{changefreq}</changefreq><priority>{priority}</priority></url>\n"
        ),
        None => format!(
            "  <url><loc>{loc}</loc><changefreq>{changefreq}</changefreq><priority>{priority}</priority></url>\n"
        ),
    }
}

/// Accept full RFC 3339 timestamps and bare `YYYY-MM-DD` dates.
fn normalize_lastmod(value: &str) -> Option<String> {
    if let Ok(instant) = OffsetDateTime::parse(value, &Rfc3339) {
        return instant.format(&Rfc3339).ok();
    }
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.to_string())
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::domain::posts::Post;

    fn post(slug: &str, date: &str, route: Option<(&str, &str)>) -> Post {
        Post {
            id: slug.to_string(),
            title: slug.to_string(),
            slug: slug.to_string(),
            cover_image: None,
            description: String::new(),
            date: date.to_string(),
            content: String::new(),
            author: None,
            tags: Vec::new(),
            category: None,
            first_slash: route.map(|(first, _)| first.to_string()),
            second_slash: route.map(|(_, second)| second.to_string()),
        }
    }

    #[test]
    fn lists_index_then_cached_posts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = PostCache::new(dir.path().join("posts-cache.json"));
        cache
            .write(&[
                post("flat-post", "2025-02-03", None),
                post("nested", "2025-01-01T10:00:00.000Z", Some(("a&b", "c"))),
            ])
            .expect("write");

        let service = SitemapService::new(cache, SiteUrls::new("https://climatefair.co"));
        let xml = service.sitemap_xml(datetime!(2025-03-01 0:00 UTC));

        let index = xml
            .find("<loc>https://climatefair.co/blog</loc><lastmod>2025-03-01T00:00:00Z</lastmod><changefreq>daily</changefreq><priority>1.0</priority>")
            .expect("index entry");
        let flat = xml
            .find("<loc>https://climatefair.co/blog/flat-post</loc><lastmod>2025-02-03</lastmod><changefreq>weekly</changefreq><priority>0.8</priority>")
            .expect("flat entry");
        assert!(index < flat);
        assert!(xml.contains("<loc>https://climatefair.co/a&amp;b/c</loc><lastmod>2025-01-01T10:00:00Z</lastmod>"));
        assert!(xml.ends_with("</urlset>\n"));
    }

    #[test]
    fn unparseable_dates_omit_lastmod() {
        assert_eq!(normalize_lastmod("yesterday"), None);
        let entry = sitemap_entry("https://x.test/blog/a", None, "weekly", "0.8");
        assert!(!entry.contains("lastmod"));
    }
}
