// ABOUTME: Opens the X (Twitter) share intent in the user's browser with the post text and link filled in.
// ABOUTME: Failing to open a browser is logged and otherwise ignored.

use url::form_urlencoded;

use skybridge_core::ShareContent;

use crate::collaborators::SharePopup;

pub const X_INTENT_URL: &str = "https://x.com/intent/tweet";

/// Build the share intent URL. An empty `url` is left out of the query.
pub fn intent_url(content: &ShareContent) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("text", &content.content);
    if !content.url.is_empty() {
        query.append_pair("url", &content.url);
    }
    format!("{}?{}", X_INTENT_URL, query.finish())
}

/// Opens the intent with the system browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentPopup;

impl SharePopup for IntentPopup {
    fn open(&self, content: &ShareContent) {
        let target = intent_url(content);
        if let Err(e) = webbrowser::open(&target) {
            tracing::warn!("could not open share popup {}: {}", target, e);
        }
    }
}
