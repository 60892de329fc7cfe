// ABOUTME: ShareContent for the X share popup, plus the link-card and share-page decision rules.
// ABOUTME: Also derives the share page URL from the page address returned by the page backend.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::PostError;

/// Text and link handed to the X share intent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareContent {
    pub url: String,
    pub content: String,
}

impl ShareContent {
    /// Share content before any link or page is known: the raw post text.
    pub fn from_text(text: &str) -> Self {
        Self {
            url: String::new(),
            content: text.to_string(),
        }
    }

    /// Use `link` as the shared URL and drop its first literal occurrence
    /// from the text, since the intent carries it separately.
    pub fn with_link(text: &str, link: &str) -> Self {
        Self {
            url: link.to_string(),
            content: text.replacen(link, "", 1),
        }
    }
}

/// Whether to attach link-card metadata to the post.
///
/// Attached when a link exists and either no share page will be generated
/// for images (`!suppress && no_images`) or the user turned page generation
/// off (`suppress`). The expression is kept in this exact form.
#[allow(clippy::nonminimal_bool)]
pub fn should_attach_card(has_link: bool, suppress: bool, no_images: bool) -> bool {
    has_link && ((!suppress && no_images) || suppress)
}

/// Whether to ask the page backend for a share page after posting.
pub fn should_generate_page(suppress: bool, has_images: bool) -> bool {
    !suppress && has_images
}

/// Where share pages live on the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePageLocation {
    site_base: Url,
    pages_prefix: String,
}

impl SharePageLocation {
    /// `site_base` is normalised to end with `/` and `pages_prefix` loses
    /// surrounding slashes.
    pub fn new(mut site_base: Url, pages_prefix: &str) -> Self {
        if !site_base.path().ends_with('/') {
            let path = format!("{}/", site_base.path());
            site_base.set_path(&path);
        }
        Self {
            site_base,
            pages_prefix: pages_prefix.trim_matches('/').to_string(),
        }
    }

    pub fn site_base(&self) -> &Url {
        &self.site_base
    }

    pub fn pages_prefix(&self) -> &str {
        &self.pages_prefix
    }

    /// Build `{site}{prefix}/{id}@{rkey}/` from a page address `"{id}/{rkey}"`.
    pub fn page_url(&self, page_address: &str) -> Result<String, PostError> {
        let mut parts = page_address.split('/');
        let (Some(id), Some(rkey)) = (parts.next(), parts.next()) else {
            return Err(PostError::Unknown(format!(
                "malformed page address: {}",
                page_address
            )));
        };
        if id.is_empty() || rkey.is_empty() {
            return Err(PostError::Unknown(format!(
                "malformed page address: {}",
                page_address
            )));
        }
        Ok(format!("{}{}/{}@{}/", self.site_base, self.pages_prefix, id, rkey))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_policy_truth_table() {
        // (has_link, suppress, no_images) -> attach
        assert!(should_attach_card(true, false, true));
        assert!(!should_attach_card(true, false, false));
        assert!(should_attach_card(true, true, false));
        assert!(should_attach_card(true, true, true));
        for suppress in [false, true] {
            for no_images in [false, true] {
                assert!(!should_attach_card(false, suppress, no_images));
            }
        }
    }

    #[test]
    fn page_generated_only_for_images_without_suppression() {
        assert!(should_generate_page(false, true));
        assert!(!should_generate_page(true, true));
        assert!(!should_generate_page(false, false));
    }

    #[test]
    fn with_link_removes_first_occurrence_only() {
        let share = ShareContent::with_link("a https://x.test b https://x.test", "https://x.test");
        assert_eq!(share.url, "https://x.test");
        assert_eq!(share.content, "a  b https://x.test");
    }

    #[test]
    fn page_url_joins_site_prefix_and_address() {
        let loc = SharePageLocation::new(Url::parse("https://share.example.com").unwrap(), "posts");
        assert_eq!(
            loc.page_url("did:plc:abc123/3kxyz").unwrap(),
            "https://share.example.com/posts/did:plc:abc123@3kxyz/"
        );
    }

    #[test]
    fn page_url_respects_base_path_and_trims_prefix() {
        let loc = SharePageLocation::new(Url::parse("https://example.com/app").unwrap(), "/posts/");
        assert_eq!(loc.site_base().as_str(), "https://example.com/app/");
        assert_eq!(
            loc.page_url("did:plc:abc/rk").unwrap(),
            "https://example.com/app/posts/did:plc:abc@rk/"
        );
    }

    #[test]
    fn malformed_page_address_is_rejected() {
        let loc = SharePageLocation::new(Url::parse("https://example.com/").unwrap(), "posts");
        assert!(loc.page_url("no-slash").is_err());
        assert!(loc.page_url("/rk").is_err());
    }
}
