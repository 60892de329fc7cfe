// ABOUTME: RecordBuilder backed by the PDS: detects facets, resolves mentions, uploads images and card thumbnails.
// ABOUTME: Link cards are filled from the target page's OpenGraph tags fetched over HTTP.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use url::Url;

use skybridge_core::opengraph::{LinkMetadata, extract_metadata};
use skybridge_core::record::{BlobRef, EmbeddedImage, ExternalCard};
use skybridge_core::richtext::{DetectedKind, detect_facets};
use skybridge_core::{
    Embed, ImageBlob, MAX_IMAGES, PostError, PostRecord, Session, StatusFeed,
};

use crate::collaborators::RecordBuilder;
use crate::xrpc::{XrpcClient, transport_error};

/// Upper bound for a link-card thumbnail; the PDS rejects larger blobs.
pub const MAX_THUMB_BYTES: usize = 1_000_000;

/// How much of a linked page is read when looking for OpenGraph tags.
/// The tags live in `<head>`, so the rest is never needed.
pub const MAX_PAGE_BYTES: usize = 1_000_000;

const USER_AGENT: &str = concat!("skybridge/", env!("CARGO_PKG_VERSION"));

pub struct AtprotoRecordBuilder {
    xrpc: Arc<XrpcClient>,
    http: reqwest::Client,
}

impl AtprotoRecordBuilder {
    pub fn new(xrpc: Arc<XrpcClient>, timeout: Duration) -> Result<Self, PostError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(transport_error)?;
        Ok(Self { xrpc, http })
    }

    async fn fetch_metadata(&self, page_url: &Url) -> Result<LinkMetadata, PostError> {
        let resp = self
            .http
            .get(page_url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(transport_error)?;
        let body = read_limited(resp, MAX_PAGE_BYTES).await?;
        if !body.complete {
            tracing::debug!("read only the first {} bytes of {}", MAX_PAGE_BYTES, page_url);
        }
        let html = String::from_utf8_lossy(&body.bytes);
        Ok(extract_metadata(&html, page_url))
    }

    async fn upload_thumb(&self, session: &Session, image_url: &str) -> Result<BlobRef, PostError> {
        let resp = self
            .http
            .get(image_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(transport_error)?;
        let mime_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_else(|| "image/jpeg".to_string());
        if !mime_type.starts_with("image/") {
            return Err(PostError::Unknown(format!("thumbnail is {}, not an image", mime_type)));
        }
        if let Some(len) = resp.content_length()
            && len > MAX_THUMB_BYTES as u64
        {
            return Err(PostError::Unknown(format!(
                "thumbnail is {} bytes, limit is {}",
                len, MAX_THUMB_BYTES
            )));
        }
        let body = read_limited(resp, MAX_THUMB_BYTES).await?;
        if !body.complete {
            return Err(PostError::Unknown(format!(
                "thumbnail is over the {} byte limit",
                MAX_THUMB_BYTES
            )));
        }
        self.xrpc.upload_blob(session, body.bytes, &mime_type).await
    }
}

struct LimitedBody {
    bytes: Vec<u8>,
    /// False when the body went past the limit and reading stopped early.
    complete: bool,
}

/// Read at most `limit` bytes of a response body, chunk by chunk.
async fn read_limited(mut resp: reqwest::Response, limit: usize) -> Result<LimitedBody, PostError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = resp.chunk().await.map_err(transport_error)? {
        let room = limit - bytes.len();
        if chunk.len() > room {
            bytes.extend_from_slice(&chunk[..room]);
            return Ok(LimitedBody { bytes, complete: false });
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(LimitedBody { bytes, complete: true })
}

#[async_trait]
impl RecordBuilder for AtprotoRecordBuilder {
    async fn build_base(
        &self,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<PostRecord, PostError> {
        let mut record = PostRecord::new(text, created_at);
        for detected in detect_facets(text) {
            let handle = match &detected.kind {
                DetectedKind::Mention { handle } => Some(handle.clone()),
                _ => None,
            };
            match handle {
                Some(handle) => match self.xrpc.resolve_handle(&handle).await {
                    Ok(did) => record.facets.push(detected.into_mention_facet(did)),
                    // unresolvable mentions stay plain text
                    Err(e) => tracing::debug!("dropping mention @{}: {}", handle, e),
                },
                None => record.facets.extend(detected.into_facet()),
            }
        }
        Ok(record)
    }

    async fn attach_images(
        &self,
        mut record: PostRecord,
        session: &Session,
        images: &[ImageBlob],
        progress: &StatusFeed,
    ) -> Result<PostRecord, PostError> {
        if images.len() > MAX_IMAGES {
            return Err(PostError::Validation(format!(
                "at most {} images can be attached, got {}",
                MAX_IMAGES,
                images.len()
            )));
        }
        let total = images.len();
        let mut embedded = Vec::with_capacity(total);
        for (i, image) in images.iter().enumerate() {
            progress.info(format!("Uploading image {}/{}...", i + 1, total));
            let blob = self
                .xrpc
                .upload_blob(session, image.bytes.clone(), &image.mime_type)
                .await?;
            embedded.push(EmbeddedImage {
                alt: image.alt.clone(),
                image: blob,
            });
        }
        record.embed = Some(Embed::Images { images: embedded });
        Ok(record)
    }

    async fn attach_link_card(
        &self,
        mut record: PostRecord,
        session: &Session,
        url: &str,
        progress: &StatusFeed,
    ) -> Result<PostRecord, PostError> {
        progress.info("Fetching link card...");
        let page_url = Url::parse(url)
            .map_err(|e| PostError::Validation(format!("invalid link {}: {}", url, e)))?;

        let metadata = match self.fetch_metadata(&page_url).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("link card for {} has no metadata: {}", url, e);
                LinkMetadata {
                    title: url.to_string(),
                    ..LinkMetadata::default()
                }
            }
        };

        let thumb = match &metadata.image {
            Some(image_url) => {
                progress.info("Uploading link card thumbnail...");
                match self.upload_thumb(session, image_url).await {
                    Ok(blob) => Some(blob),
                    Err(e) => {
                        tracing::warn!("skipping link card thumbnail {}: {}", image_url, e);
                        None
                    }
                }
            }
            None => None,
        };

        if record.has_images() {
            tracing::warn!("link card for {} replaces the images embed", url);
        }
        record.embed = Some(Embed::External {
            external: ExternalCard {
                uri: url.to_string(),
                title: metadata.title,
                description: metadata.description,
                thumb,
            },
        });
        Ok(record)
    }
}
