// ABOUTME: Wire shapes for XRPC and page backend responses, including the shared error payload.
// ABOUTME: ApiResponse distinguishes an error body from a success body before the workflow acts on it.

use serde::{Deserialize, Serialize};

use crate::error::PostError;

/// Error body returned by XRPC endpoints and the page backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiFailure {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

/// Either an error payload or a successful body. The failure shape is tried
/// first because it requires the `error` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiResponse<T> {
    Failure(ApiFailure),
    Success(T),
}

impl<T> ApiResponse<T> {
    /// Treat an error payload as a [`PostError::Remote`] whose kind is the
    /// response's error code.
    pub fn into_result(self) -> Result<T, PostError> {
        match self {
            ApiResponse::Success(value) => Ok(value),
            ApiResponse::Failure(failure) => Err(PostError::Remote {
                kind: failure.error,
                message: failure.message,
            }),
        }
    }
}

/// Output of `com.atproto.repo.createRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRecord {
    pub uri: String,
    pub cid: String,
}

/// Output of the page backend. `uri` is `"{id}/{rkey}"` when a page was made.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOutput {
    #[serde(default)]
    pub uri: Option<String>,
}
