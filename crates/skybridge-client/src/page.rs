// ABOUTME: HTTP client for the share page backend that renders an X-friendly page for a post.
// ABOUTME: Sends the created record's AT URI with the user's access token and returns the page address.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use url::Url;

use skybridge_core::{ApiResponse, PageOutput, PostError};

use crate::collaborators::PageApi;
use crate::xrpc::{decode_response, transport_error};

/// Page backend reached at a single POST endpoint.
#[derive(Debug, Clone)]
pub struct HttpPageApi {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpPageApi {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, PostError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl PageApi for HttpPageApi {
    async fn create_page(
        &self,
        access_jwt: &str,
        record_uri: &str,
    ) -> Result<ApiResponse<PageOutput>, PostError> {
        tracing::debug!("requesting share page for {}", record_uri);
        let resp = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(access_jwt)
            .json(&json!({ "uri": record_uri }))
            .send()
            .await
            .map_err(transport_error)?;
        decode_response(resp).await
    }
}
