// ABOUTME: PostWorkflow drives one post submission from draft to ShareContent, step by step.
// ABOUTME: Publishes status along the way and always clears the processing flag, success or failure.

use std::sync::Arc;

use chrono::Utc;

use skybridge_core::{
    ComposerState, Draft, GraphemeCounter, POST_GRAPHEME_LIMIT, PostError, Session, ShareContent,
    SharePageLocation, StatusFeed, should_attach_card, should_generate_page,
};

use crate::collaborators::{PageApi, RecordApi, RecordBuilder, SharePopup};

pub const STATUS_CONVERTING: &str = "Converting to record...";
pub const STATUS_POSTING: &str = "Posting to Bluesky...";
pub const STATUS_POSTED: &str = "Posted to Bluesky!";
pub const STATUS_GENERATING_PAGE: &str = "Generating Twitter page...";
pub const STATUS_PAGE_READY: &str = "Generated Twitter link!";

/// Sequential post submission over pluggable collaborators.
pub struct PostWorkflow {
    builder: Arc<dyn RecordBuilder>,
    records: Arc<dyn RecordApi>,
    pages: Arc<dyn PageApi>,
    popup: Arc<dyn SharePopup>,
    share_pages: SharePageLocation,
    status: StatusFeed,
}

impl PostWorkflow {
    pub fn new(
        builder: Arc<dyn RecordBuilder>,
        records: Arc<dyn RecordApi>,
        pages: Arc<dyn PageApi>,
        popup: Arc<dyn SharePopup>,
        share_pages: SharePageLocation,
    ) -> Self {
        Self {
            builder,
            records,
            pages,
            popup,
            share_pages,
            status: StatusFeed::new(),
        }
    }

    /// The feed every status message of this workflow goes to.
    pub fn status(&self) -> &StatusFeed {
        &self.status
    }

    /// Submit the draft held by `state`.
    ///
    /// On success the draft is cleared and the share content returned. On
    /// failure an error status is published and the draft is left intact so
    /// the user can retry. `state.processing` is false again either way.
    pub async fn submit(
        &self,
        state: &mut ComposerState,
        session: Option<&Session>,
    ) -> Result<ShareContent, PostError> {
        state.processing = true;
        self.status.info(STATUS_CONVERTING);

        let result = self.run(state.draft(), state.counter(), session).await;

        match &result {
            Ok(share) => {
                tracing::info!("post submitted, share url: {:?}", share.url);
                state.discard();
            }
            Err(err) => {
                tracing::warn!("post failed: {}", err);
                self.status.error(err.status_text());
            }
        }
        state.processing = false;
        result
    }

    async fn run(
        &self,
        draft: &Draft,
        counter: GraphemeCounter,
        session: Option<&Session>,
    ) -> Result<ShareContent, PostError> {
        // The post button is only shown to signed-in users.
        let session = session.ok_or_else(|| {
            PostError::UnexpectedState("post was submitted without a session".to_string())
        })?;

        let count = counter.count(&draft.text);
        if count > POST_GRAPHEME_LIMIT {
            return Err(PostError::Validation(format!(
                "post is {} characters, the limit is {}",
                count, POST_GRAPHEME_LIMIT
            )));
        }

        let mut record = self.builder.build_base(&draft.text, Utc::now()).await?;

        let no_images = draft.images.is_empty();
        if !no_images {
            record = self
                .builder
                .attach_images(record, session, &draft.images, &self.status)
                .await?;
        }

        let link = record.first_link().map(str::to_string);
        let mut share = match &link {
            Some(link) => ShareContent::with_link(&draft.text, link),
            None => ShareContent::from_text(&draft.text),
        };

        let suppress = draft.suppress_card_generation;
        if let Some(link) = &link
            && should_attach_card(true, suppress, no_images)
        {
            record = self
                .builder
                .attach_link_card(record, session, link, &self.status)
                .await?;
        }

        self.status.info(STATUS_POSTING);
        let created = self
            .records
            .create_record(&session.did, &session.access_jwt, &record)
            .await?
            .into_result()?;
        tracing::info!("created record {}", created.uri);
        self.status.info(STATUS_POSTED);

        if should_generate_page(suppress, !no_images) {
            self.status.info(STATUS_GENERATING_PAGE);
            let page = self
                .pages
                .create_page(&session.access_jwt, &created.uri)
                .await?
                .into_result()?;
            match page.uri {
                Some(address) => match self.share_pages.page_url(&address) {
                    Ok(url) => {
                        self.status.info(STATUS_PAGE_READY);
                        share.url = url;
                    }
                    Err(e) => tracing::warn!("ignoring share page: {}", e),
                },
                None => tracing::info!("page backend returned no page for {}", created.uri),
            }
        }

        if draft.auto_popup {
            self.popup.open(&share);
        }

        Ok(share)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skybridge_core::record::{ByteSlice, Facet, FacetFeature};
    use skybridge_core::{ApiFailure, ApiResponse, Embed, ImageBlob, StatusMessage};
    use url::Url;

    use crate::testing::{
        BuilderCall, RecordingPopup, StubPageApi, StubRecordApi, StubRecordBuilder,
    };

    struct Harness {
        builder: Arc<StubRecordBuilder>,
        records: Arc<StubRecordApi>,
        pages: Arc<StubPageApi>,
        popup: Arc<RecordingPopup>,
        workflow: PostWorkflow,
    }

    fn harness(builder: StubRecordBuilder, records: StubRecordApi, pages: StubPageApi) -> Harness {
        let builder = Arc::new(builder);
        let records = Arc::new(records);
        let pages = Arc::new(pages);
        let popup = Arc::new(RecordingPopup::default());
        let workflow = PostWorkflow::new(
            builder.clone(),
            records.clone(),
            pages.clone(),
            popup.clone(),
            SharePageLocation::new(Url::parse("https://share.example.com").unwrap(), "posts"),
        );
        Harness { builder, records, pages, popup, workflow }
    }

    fn default_harness() -> Harness {
        harness(
            StubRecordBuilder::default(),
            StubRecordApi::created("at://did:plc:alice/app.bsky.feed.post/3kpost"),
            StubPageApi::page("did:plc:alice/3kpost"),
        )
    }

    fn session() -> Session {
        Session {
            did: "did:plc:alice".to_string(),
            access_jwt: "jwt-alice".to_string(),
        }
    }

    fn image() -> ImageBlob {
        ImageBlob {
            file_name: "cat.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
            alt: "a cat".to_string(),
        }
    }

    fn link_facet(uri: &str) -> Facet {
        Facet {
            index: ByteSlice { byte_start: 0, byte_end: uri.len() },
            features: vec![FacetFeature::Link { uri: uri.to_string() }],
        }
    }

    fn mention_facet(did: &str) -> Facet {
        Facet {
            index: ByteSlice { byte_start: 0, byte_end: 1 },
            features: vec![FacetFeature::Mention { did: did.to_string() }],
        }
    }

    fn state_with(text: &str, images: Vec<ImageBlob>, suppress: bool) -> ComposerState {
        let mut state = ComposerState::default();
        state.set_text(text);
        state.set_images(images).unwrap();
        state.set_suppress_card_generation(suppress);
        state
    }

    fn card_attached(h: &Harness) -> bool {
        h.builder
            .calls()
            .iter()
            .any(|c| matches!(c, BuilderCall::AttachLinkCard { .. }))
    }

    #[tokio::test]
    async fn missing_session_is_unexpected_state() {
        let h = default_harness();
        let mut state = state_with("hello", vec![], false);

        let err = h.workflow.submit(&mut state, None).await.unwrap_err();

        assert!(matches!(err, PostError::UnexpectedState(_)));
        assert!(h.builder.calls().is_empty());
        assert!(h.records.submitted().is_empty());
        assert!(!state.processing);
        assert_eq!(state.draft().text, "hello");
        let status = h.workflow.status().latest().unwrap();
        assert!(status.is_error);
        assert!(status.text.starts_with("UnexpectedStateError: "));
    }

    #[tokio::test]
    async fn over_limit_fails_before_any_call() {
        let h = default_harness();
        let text = "\u{1F600}".repeat(POST_GRAPHEME_LIMIT + 1);
        let mut state = state_with(&text, vec![image()], false);

        let err = h.workflow.submit(&mut state, Some(&session())).await.unwrap_err();

        assert!(matches!(err, PostError::Validation(_)));
        assert!(h.builder.calls().is_empty());
        assert!(h.records.submitted().is_empty());
        assert!(h.pages.requests().is_empty());
        assert_eq!(state.draft().text, text);
        assert_eq!(state.draft().images.len(), 1);
        assert!(!state.processing);
    }

    #[tokio::test]
    async fn exactly_at_limit_is_accepted() {
        let h = default_harness();
        let mut state = state_with(&"a".repeat(POST_GRAPHEME_LIMIT), vec![], false);
        assert!(h.workflow.submit(&mut state, Some(&session())).await.is_ok());
    }

    #[tokio::test]
    async fn text_with_link_gets_card_and_no_page() {
        let h = harness(
            StubRecordBuilder::with_facets(vec![link_facet("https://example.com/a")]),
            StubRecordApi::created("at://did:plc:alice/app.bsky.feed.post/3k"),
            StubPageApi::page("did:plc:alice/3k"),
        );
        let mut state = state_with("read https://example.com/a now", vec![], false);

        let share = h.workflow.submit(&mut state, Some(&session())).await.unwrap();

        assert!(card_attached(&h));
        assert!(h.pages.requests().is_empty());
        assert_eq!(share.url, "https://example.com/a");
        assert_eq!(share.content, "read  now");
        let submitted = h.records.submitted();
        assert!(matches!(submitted[0].embed, Some(Embed::External { .. })));
    }

    #[tokio::test]
    async fn link_with_image_skips_card_and_generates_page() {
        let h = harness(
            StubRecordBuilder::with_facets(vec![link_facet("https://example.com/a")]),
            StubRecordApi::created("at://did:plc:alice/app.bsky.feed.post/3kpost"),
            StubPageApi::page("did:plc:alice/3kpost"),
        );
        let mut state = state_with("see https://example.com/a", vec![image()], false);

        let share = h.workflow.submit(&mut state, Some(&session())).await.unwrap();

        assert!(!card_attached(&h));
        assert_eq!(
            h.pages.requests(),
            vec![(
                "jwt-alice".to_string(),
                "at://did:plc:alice/app.bsky.feed.post/3kpost".to_string()
            )]
        );
        assert_eq!(share.url, "https://share.example.com/posts/did:plc:alice@3kpost/");
        assert_eq!(share.content, "see ");
        assert!(h.records.submitted()[0].has_images());
    }

    #[tokio::test]
    async fn suppression_with_image_attaches_card_without_page() {
        let h = harness(
            StubRecordBuilder::with_facets(vec![link_facet("https://example.com/a")]),
            StubRecordApi::created("at://did:plc:alice/app.bsky.feed.post/3k"),
            StubPageApi::page("did:plc:alice/3k"),
        );
        let mut state = state_with("https://example.com/a", vec![image()], true);

        let share = h.workflow.submit(&mut state, Some(&session())).await.unwrap();

        assert!(card_attached(&h));
        assert!(h.pages.requests().is_empty());
        assert_eq!(share.url, "https://example.com/a");
    }

    #[tokio::test]
    async fn no_link_never_attaches_card() {
        for (images, suppress) in [(vec![], false), (vec![], true), (vec![image()], true)] {
            let h = default_harness();
            let mut state = state_with("no links here", images, suppress);
            let share = h.workflow.submit(&mut state, Some(&session())).await.unwrap();
            assert!(!card_attached(&h));
            assert_eq!(share.content, "no links here");
        }
    }

    #[tokio::test]
    async fn mention_is_never_the_card_link() {
        let h = harness(
            StubRecordBuilder::with_facets(vec![
                mention_facet("did:plc:bob"),
                link_facet("https://first.example"),
                link_facet("https://second.example"),
            ]),
            StubRecordApi::created("at://did:plc:alice/app.bsky.feed.post/3k"),
            StubPageApi::none(),
        );
        let mut state =
            state_with("@bob.test https://first.example https://second.example", vec![], false);

        let share = h.workflow.submit(&mut state, Some(&session())).await.unwrap();

        assert_eq!(share.url, "https://first.example");
        assert!(h.builder.calls().contains(&BuilderCall::AttachLinkCard {
            url: "https://first.example".to_string()
        }));
    }

    #[tokio::test]
    async fn remote_error_reports_kind_and_keeps_draft() {
        let h = harness(
            StubRecordBuilder::default(),
            StubRecordApi::failing(ApiFailure {
                error: "InvalidRequest".to_string(),
                message: "bad record".to_string(),
            }),
            StubPageApi::none(),
        );
        let mut state = state_with("hello", vec![image()], false);

        let err = h.workflow.submit(&mut state, Some(&session())).await.unwrap_err();

        assert_eq!(
            err,
            PostError::Remote {
                kind: "InvalidRequest".to_string(),
                message: "bad record".to_string()
            }
        );
        assert_eq!(
            h.workflow.status().latest(),
            Some(StatusMessage::error("InvalidRequest: bad record"))
        );
        assert_eq!(state.draft().text, "hello");
        assert_eq!(state.draft().images.len(), 1);
        assert!(h.pages.requests().is_empty());
        assert!(h.popup.opened().is_empty());
        assert!(!state.processing);
    }

    #[tokio::test]
    async fn page_error_after_post_still_keeps_draft() {
        let h = harness(
            StubRecordBuilder::default(),
            StubRecordApi::created("at://did:plc:alice/app.bsky.feed.post/3k"),
            StubPageApi::respond(Ok(ApiResponse::Failure(ApiFailure {
                error: "PageError".to_string(),
                message: "render failed".to_string(),
            }))),
        );
        let mut state = state_with("pic", vec![image()], false);

        let err = h.workflow.submit(&mut state, Some(&session())).await.unwrap_err();

        assert_eq!(err.status_text(), "PageError: render failed");
        assert_eq!(h.records.submitted().len(), 1);
        assert_eq!(state.draft().text, "pic");
        assert!(!state.processing);
    }

    #[tokio::test]
    async fn transport_error_is_unknown() {
        let h = harness(
            StubRecordBuilder::default(),
            StubRecordApi::respond(Err(PostError::Unknown("connection refused".to_string()))),
            StubPageApi::none(),
        );
        let mut state = state_with("hello", vec![], false);

        let err = h.workflow.submit(&mut state, Some(&session())).await.unwrap_err();

        assert_eq!(err.status_text(), "UnknownError: connection refused");
    }

    #[tokio::test]
    async fn empty_page_response_keeps_existing_url() {
        let h = harness(
            StubRecordBuilder::default(),
            StubRecordApi::created("at://did:plc:alice/app.bsky.feed.post/3k"),
            StubPageApi::none(),
        );
        let mut state = state_with("pic", vec![image()], false);

        let share = h.workflow.submit(&mut state, Some(&session())).await.unwrap();

        assert_eq!(h.pages.requests().len(), 1);
        assert_eq!(share.url, "");
        assert_eq!(share.content, "pic");
    }

    #[tokio::test]
    async fn success_resets_draft_and_reports_progress() {
        let h = default_harness();
        let mut rx = h.workflow.status().subscribe();
        let mut state = state_with("pic", vec![image()], false);
        state.set_auto_popup(true);

        let share = h.workflow.submit(&mut state, Some(&session())).await.unwrap();

        assert!(state.draft().text.is_empty());
        assert!(state.draft().images.is_empty());
        assert_eq!(state.count(), 0);
        assert!(!state.processing);
        assert!(state.draft().auto_popup);

        let mut seen = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            assert!(!msg.is_error);
            seen.push(msg.text);
        }
        assert_eq!(
            seen,
            vec![
                STATUS_CONVERTING.to_string(),
                "Uploading image 1/1...".to_string(),
                STATUS_POSTING.to_string(),
                STATUS_POSTED.to_string(),
                STATUS_GENERATING_PAGE.to_string(),
                STATUS_PAGE_READY.to_string(),
            ]
        );
        assert_eq!(h.popup.opened(), vec![share]);
    }

    #[tokio::test]
    async fn popup_not_opened_when_disabled() {
        let h = default_harness();
        let mut state = state_with("hello", vec![], false);
        h.workflow.submit(&mut state, Some(&session())).await.unwrap();
        assert!(h.popup.opened().is_empty());
    }

    #[tokio::test]
    async fn builder_failure_after_base_keeps_draft() {
        let h = harness(
            StubRecordBuilder::failing_images(PostError::Remote {
                kind: "PayloadTooLarge".to_string(),
                message: "blob too big".to_string(),
            }),
            StubRecordApi::created("at://did:plc:alice/app.bsky.feed.post/3k"),
            StubPageApi::none(),
        );
        let mut state = state_with("pic", vec![image()], false);

        let err = h.workflow.submit(&mut state, Some(&session())).await.unwrap_err();

        assert_eq!(err.kind(), "PayloadTooLarge");
        assert!(h.records.submitted().is_empty());
        assert_eq!(state.draft().images.len(), 1);
        assert!(!state.processing);
    }
}
