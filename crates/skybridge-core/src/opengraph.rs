// ABOUTME: Extracts OpenGraph title, description, and image from an HTML page for link cards.
// ABOUTME: Uses lightweight regex scanning of <meta> and <title>; no DOM is built.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static META_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("meta regex compiles"));

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("attr regex compiles")
});

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex compiles"));

/// Metadata used to fill an external embed card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkMetadata {
    pub title: String,
    pub description: String,
    /// Absolute image URL, resolved against the page URL.
    pub image: Option<String>,
}

/// Scan `html` for OpenGraph tags. Missing titles fall back to `<title>` and
/// then to the page URL itself.
pub fn extract_metadata(html: &str, page_url: &Url) -> LinkMetadata {
    let mut og_title = None;
    let mut description = None;
    let mut fallback_description = None;
    let mut image = None;

    for tag in META_RE.find_iter(html) {
        let mut key = None;
        let mut content = None;
        for attr in ATTR_RE.captures_iter(tag.as_str()) {
            let name = attr[1].to_ascii_lowercase();
            let value = attr.get(2).or_else(|| attr.get(3)).map(|m| m.as_str());
            match name.as_str() {
                "property" | "name" => key = value.map(str::to_ascii_lowercase),
                "content" => content = value.map(decode_entities),
                _ => {}
            }
        }
        let (Some(key), Some(content)) = (key, content) else { continue };
        match key.as_str() {
            "og:title" if og_title.is_none() => og_title = Some(content),
            "og:description" if description.is_none() => description = Some(content),
            "description" if fallback_description.is_none() => fallback_description = Some(content),
            "og:image" if image.is_none() => image = page_url.join(content.trim()).ok(),
            _ => {}
        }
    }

    let title = og_title
        .or_else(|| {
            TITLE_RE
                .captures(html)
                .map(|c| decode_entities(c[1].trim()))
                .filter(|t| !t.is_empty())
        })
        .unwrap_or_else(|| page_url.to_string());

    LinkMetadata {
        title: title.trim().to_string(),
        description: description.or(fallback_description).unwrap_or_default().trim().to_string(),
        image: image.map(|u| u.to_string()),
    }
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
