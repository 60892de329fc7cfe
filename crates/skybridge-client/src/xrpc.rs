// ABOUTME: reqwest-based XRPC client for the user's PDS: login, handle resolution, blob upload, record creation.
// ABOUTME: Error bodies are decoded into ApiFailure; transport problems become PostError::Unknown.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use skybridge_core::record::{BlobRef, POST_COLLECTION};
use skybridge_core::{ApiResponse, CreatedRecord, PostError, PostRecord, Session};

use crate::collaborators::RecordApi;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionOutput {
    did: String,
    access_jwt: String,
}

#[derive(Debug, Deserialize)]
struct ResolveHandleOutput {
    did: String,
}

#[derive(Debug, Deserialize)]
struct UploadBlobOutput {
    blob: BlobRef,
}

/// Client for the XRPC endpoints skybridge needs.
#[derive(Debug, Clone)]
pub struct XrpcClient {
    client: reqwest::Client,
    pds_url: Url,
}

impl XrpcClient {
    pub fn new(pds_url: Url, timeout: Duration) -> Result<Self, PostError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;
        Ok(Self::with_client(client, pds_url))
    }

    /// Use an existing reqwest client, sharing its connection pool.
    pub fn with_client(client: reqwest::Client, pds_url: Url) -> Self {
        Self { client, pds_url }
    }

    fn endpoint(&self, nsid: &str) -> String {
        format!("{}/xrpc/{}", self.pds_url.as_str().trim_end_matches('/'), nsid)
    }

    /// Log in with a handle or DID and an app password.
    pub async fn create_session(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Session, PostError> {
        tracing::debug!("creating session for {}", identifier);
        let resp = self
            .client
            .post(self.endpoint("com.atproto.server.createSession"))
            .json(&json!({ "identifier": identifier, "password": password }))
            .send()
            .await
            .map_err(transport_error)?;
        let output: CreateSessionOutput = decode_response(resp).await?.into_result()?;
        tracing::info!("signed in as {}", output.did);
        Ok(Session {
            did: output.did,
            access_jwt: output.access_jwt,
        })
    }

    /// Resolve a handle such as `alice.bsky.social` to its DID.
    pub async fn resolve_handle(&self, handle: &str) -> Result<String, PostError> {
        let resp = self
            .client
            .get(self.endpoint("com.atproto.identity.resolveHandle"))
            .query(&[("handle", handle)])
            .send()
            .await
            .map_err(transport_error)?;
        let output: ResolveHandleOutput = decode_response(resp).await?.into_result()?;
        Ok(output.did)
    }

    /// Upload raw bytes and return the blob reference to embed.
    pub async fn upload_blob(
        &self,
        session: &Session,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> Result<BlobRef, PostError> {
        tracing::debug!("uploading {} byte blob ({})", bytes.len(), mime_type);
        let resp = self
            .client
            .post(self.endpoint("com.atproto.repo.uploadBlob"))
            .bearer_auth(&session.access_jwt)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await
            .map_err(transport_error)?;
        let output: UploadBlobOutput = decode_response(resp).await?.into_result()?;
        Ok(output.blob)
    }
}

#[async_trait]
impl RecordApi for XrpcClient {
    async fn create_record(
        &self,
        did: &str,
        access_jwt: &str,
        record: &PostRecord,
    ) -> Result<ApiResponse<CreatedRecord>, PostError> {
        let resp = self
            .client
            .post(self.endpoint("com.atproto.repo.createRecord"))
            .bearer_auth(access_jwt)
            .json(&json!({
                "repo": did,
                "collection": POST_COLLECTION,
                "record": record,
            }))
            .send()
            .await
            .map_err(transport_error)?;
        decode_response(resp).await
    }
}

pub(crate) fn transport_error(err: reqwest::Error) -> PostError {
    PostError::Unknown(err.to_string())
}

/// Read a JSON body as either an error payload or `T`. Bodies that are
/// neither (an HTML 502 page, say) become [`PostError::Unknown`], as does a
/// non-2xx answer whose body happens to fit `T`.
pub(crate) async fn decode_response<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<ApiResponse<T>, PostError> {
    let status = resp.status();
    let body = resp.bytes().await.map_err(transport_error)?;
    let decoded = serde_json::from_slice::<ApiResponse<T>>(&body).map_err(|e| {
        PostError::Unknown(format!(
            "unexpected response (HTTP {}): {}",
            status.as_u16(),
            e
        ))
    })?;
    match decoded {
        ApiResponse::Success(_) if !status.is_success() => Err(PostError::Unknown(format!(
            "request failed (HTTP {})",
            status.as_u16()
        ))),
        decoded => Ok(decoded),
    }
}
