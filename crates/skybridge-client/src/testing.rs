// ABOUTME: Test utilities for skybridge-client: stub collaborators that record every call they receive.
// ABOUTME: Used to drive PostWorkflow without a PDS, a page backend, or a browser.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use skybridge_core::record::{BlobRef, CidLink, EmbeddedImage, ExternalCard, Facet};
use skybridge_core::{
    ApiFailure, ApiResponse, CreatedRecord, Embed, ImageBlob, PageOutput, PostError, PostRecord,
    Session, ShareContent, StatusFeed,
};

use crate::collaborators::{PageApi, RecordApi, RecordBuilder, SharePopup};

/// A call made to [`StubRecordBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderCall {
    BuildBase { text: String },
    AttachImages { count: usize },
    AttachLinkCard { url: String },
}

/// A fake blob reference, as if `bytes` had been uploaded.
pub fn fake_blob(mime_type: &str, size: usize) -> BlobRef {
    BlobRef {
        blob_type: "blob".to_string(),
        reference: CidLink {
            link: format!("bafkreistub{}", size),
        },
        mime_type: mime_type.to_string(),
        size: size as u64,
    }
}

/// Record builder that attaches preset facets instead of detecting them.
#[derive(Debug, Default)]
pub struct StubRecordBuilder {
    facets: Vec<Facet>,
    image_error: Option<PostError>,
    calls: Mutex<Vec<BuilderCall>>,
}

impl StubRecordBuilder {
    /// Every built record carries these facets.
    pub fn with_facets(facets: Vec<Facet>) -> Self {
        Self {
            facets,
            ..Self::default()
        }
    }

    /// `attach_images` fails with `error`.
    pub fn failing_images(error: PostError) -> Self {
        Self {
            image_error: Some(error),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<BuilderCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, call: BuilderCall) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
    }
}

#[async_trait]
impl RecordBuilder for StubRecordBuilder {
    async fn build_base(
        &self,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<PostRecord, PostError> {
        self.record(BuilderCall::BuildBase { text: text.to_string() });
        let mut record = PostRecord::new(text, created_at);
        record.facets = self.facets.clone();
        Ok(record)
    }

    async fn attach_images(
        &self,
        mut record: PostRecord,
        _session: &Session,
        images: &[ImageBlob],
        progress: &StatusFeed,
    ) -> Result<PostRecord, PostError> {
        self.record(BuilderCall::AttachImages { count: images.len() });
        if let Some(err) = &self.image_error {
            return Err(err.clone());
        }
        let total = images.len();
        let mut embedded = Vec::with_capacity(total);
        for (i, image) in images.iter().enumerate() {
            progress.info(format!("Uploading image {}/{}...", i + 1, total));
            embedded.push(EmbeddedImage {
                alt: image.alt.clone(),
                image: fake_blob(&image.mime_type, image.bytes.len()),
            });
        }
        record.embed = Some(Embed::Images { images: embedded });
        Ok(record)
    }

    async fn attach_link_card(
        &self,
        mut record: PostRecord,
        _session: &Session,
        url: &str,
        _progress: &StatusFeed,
    ) -> Result<PostRecord, PostError> {
        self.record(BuilderCall::AttachLinkCard { url: url.to_string() });
        record.embed = Some(Embed::External {
            external: ExternalCard {
                uri: url.to_string(),
                title: url.to_string(),
                description: String::new(),
                thumb: None,
            },
        });
        Ok(record)
    }
}

/// Record API returning a fixed response and keeping every submitted record.
#[derive(Debug)]
pub struct StubRecordApi {
    response: Result<ApiResponse<CreatedRecord>, PostError>,
    submitted: Mutex<Vec<PostRecord>>,
}

impl StubRecordApi {
    pub fn respond(response: Result<ApiResponse<CreatedRecord>, PostError>) -> Self {
        Self {
            response,
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Succeed with the given AT URI.
    pub fn created(uri: &str) -> Self {
        Self::respond(Ok(ApiResponse::Success(CreatedRecord {
            uri: uri.to_string(),
            cid: "bafyreistub".to_string(),
        })))
    }

    /// Answer with an error payload.
    pub fn failing(failure: ApiFailure) -> Self {
        Self::respond(Ok(ApiResponse::Failure(failure)))
    }

    pub fn submitted(&self) -> Vec<PostRecord> {
        self.submitted.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl RecordApi for StubRecordApi {
    async fn create_record(
        &self,
        _did: &str,
        _access_jwt: &str,
        record: &PostRecord,
    ) -> Result<ApiResponse<CreatedRecord>, PostError> {
        self.submitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        self.response.clone()
    }
}

/// Page API returning a fixed response and keeping `(access_jwt, record_uri)` pairs.
#[derive(Debug)]
pub struct StubPageApi {
    response: Result<ApiResponse<PageOutput>, PostError>,
    requests: Mutex<Vec<(String, String)>>,
}

impl StubPageApi {
    pub fn respond(response: Result<ApiResponse<PageOutput>, PostError>) -> Self {
        Self {
            response,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Succeed with page address `"{id}/{rkey}"`.
    pub fn page(address: &str) -> Self {
        Self::respond(Ok(ApiResponse::Success(PageOutput {
            uri: Some(address.to_string()),
        })))
    }

    /// Succeed without generating a page (`{}`).
    pub fn none() -> Self {
        Self::respond(Ok(ApiResponse::Success(PageOutput::default())))
    }

    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl PageApi for StubPageApi {
    async fn create_page(
        &self,
        access_jwt: &str,
        record_uri: &str,
    ) -> Result<ApiResponse<PageOutput>, PostError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((access_jwt.to_string(), record_uri.to_string()));
        self.response.clone()
    }
}

/// Popup that remembers what it was asked to open.
#[derive(Debug, Default)]
pub struct RecordingPopup {
    opened: Mutex<Vec<ShareContent>>,
}

impl RecordingPopup {
    pub fn opened(&self) -> Vec<ShareContent> {
        self.opened.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SharePopup for RecordingPopup {
    fn open(&self, content: &ShareContent) {
        self.opened
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(content.clone());
    }
}
