// ABOUTME: Traits for everything the post workflow calls out to: record building, submission, pages, popup.
// ABOUTME: Also defines SessionProvider and StaticSession, the source of the credentials used to post.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use skybridge_core::{
    ApiResponse, CreatedRecord, ImageBlob, PageOutput, PostError, PostRecord, Session,
    ShareContent, StatusFeed,
};

/// Turns draft text into a post record and enriches it with embeds.
/// Intermediate progress goes to the given status feed.
#[async_trait]
pub trait RecordBuilder: Send + Sync {
    /// Build the base record: text, timestamp, and rich-text facets.
    async fn build_base(&self, text: &str, created_at: DateTime<Utc>)
    -> Result<PostRecord, PostError>;

    /// Upload the images and attach them as an images embed.
    async fn attach_images(
        &self,
        record: PostRecord,
        session: &Session,
        images: &[ImageBlob],
        progress: &StatusFeed,
    ) -> Result<PostRecord, PostError>;

    /// Attach link-card metadata for `url` as an external embed.
    async fn attach_link_card(
        &self,
        record: PostRecord,
        session: &Session,
        url: &str,
        progress: &StatusFeed,
    ) -> Result<PostRecord, PostError>;
}

/// Writes a finished record to the user's repo.
#[async_trait]
pub trait RecordApi: Send + Sync {
    /// `Err` is reserved for transport failures; an error payload from the
    /// server comes back as [`ApiResponse::Failure`].
    async fn create_record(
        &self,
        did: &str,
        access_jwt: &str,
        record: &PostRecord,
    ) -> Result<ApiResponse<CreatedRecord>, PostError>;
}

/// Asks the page backend for a share page for a created record.
#[async_trait]
pub trait PageApi: Send + Sync {
    async fn create_page(
        &self,
        access_jwt: &str,
        record_uri: &str,
    ) -> Result<ApiResponse<PageOutput>, PostError>;
}

/// Opens the X share popup. Fire and forget.
pub trait SharePopup: Send + Sync {
    fn open(&self, content: &ShareContent);
}

/// Supplies the signed-in session, if any.
pub trait SessionProvider: Send + Sync {
    fn session(&self) -> Option<Session>;
}

/// A session fixed at construction time.
#[derive(Debug, Clone, Default)]
pub struct StaticSession(Option<Session>);

impl StaticSession {
    pub fn new(session: Option<Session>) -> Self {
        Self(session)
    }
}

impl SessionProvider for StaticSession {
    fn session(&self) -> Option<Session> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_session_returns_what_it_was_given() {
        assert!(StaticSession::default().session().is_none());

        let session = Session {
            did: "did:plc:abc".to_string(),
            access_jwt: "jwt".to_string(),
        };
        let provider = StaticSession::new(Some(session.clone()));
        assert_eq!(provider.session(), Some(session));
    }
}
