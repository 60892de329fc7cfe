// ABOUTME: Configuration loading and validation for skybridge, read once from environment variables.
// ABOUTME: Covers the PDS, share site, page backend, HTTP timeout, and the credentials used to sign in.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use skybridge_core::{PostError, Session, SharePageLocation};

use crate::xrpc::XrpcClient;

pub const DEFAULT_PDS_URL: &str = "https://bsky.social";
pub const DEFAULT_PAGES_PREFIX: &str = "posts";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not set")]
    Missing { var: &'static str },

    #[error("{var} is not a valid URL: {value}")]
    InvalidUrl { var: &'static str, value: String },

    #[error("SKYBRIDGE_PAGES_PREFIX must not be empty")]
    EmptyPagesPrefix,

    #[error("SKYBRIDGE_HTTP_TIMEOUT_SECS must be a positive integer, got {0}")]
    InvalidTimeout(String),
}

/// How to obtain a session.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Log in with `com.atproto.server.createSession`.
    AppPassword { identifier: String, password: String },
    /// Use an existing access token as-is.
    Token(Session),
    None,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::AppPassword { identifier, .. } => f
                .debug_struct("AppPassword")
                .field("identifier", identifier)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::Token(session) => f
                .debug_struct("Token")
                .field("did", &session.did)
                .field("access_jwt", &"<redacted>")
                .finish(),
            Credentials::None => f.write_str("None"),
        }
    }
}

impl Credentials {
    /// Turn the credentials into a session, logging in if needed.
    pub async fn establish(&self, xrpc: &XrpcClient) -> Result<Option<Session>, PostError> {
        match self {
            Credentials::AppPassword { identifier, password } => {
                xrpc.create_session(identifier, password).await.map(Some)
            }
            Credentials::Token(session) => Ok(Some(session.clone())),
            Credentials::None => Ok(None),
        }
    }
}

/// skybridge configuration. Fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct SkybridgeConfig {
    pub pds_url: Url,
    pub share_pages: SharePageLocation,
    pub page_api_url: Url,
    pub http_timeout: Duration,
    pub credentials: Credentials,
}

impl SkybridgeConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - SKYBRIDGE_PDS_URL: PDS base URL (default: https://bsky.social)
    /// - SKYBRIDGE_SITE_URL: share site base URL (required)
    /// - SKYBRIDGE_PAGES_PREFIX: path segment for share pages (default: posts)
    /// - SKYBRIDGE_PAGE_API_URL: page backend endpoint (default: {site}api/page)
    /// - SKYBRIDGE_HTTP_TIMEOUT_SECS: per-request timeout (default: 30)
    /// - SKYBRIDGE_IDENTIFIER + SKYBRIDGE_APP_PASSWORD: log in with an app password
    /// - SKYBRIDGE_DID + SKYBRIDGE_ACCESS_JWT: use an existing session
    pub fn from_env() -> Result<Self, ConfigError> {
        let pds_url = parse_url(
            "SKYBRIDGE_PDS_URL",
            non_empty_env("SKYBRIDGE_PDS_URL").unwrap_or_else(|| DEFAULT_PDS_URL.to_string()),
        )?;

        let site_url = parse_url(
            "SKYBRIDGE_SITE_URL",
            non_empty_env("SKYBRIDGE_SITE_URL").ok_or(ConfigError::Missing {
                var: "SKYBRIDGE_SITE_URL",
            })?,
        )?;

        let pages_prefix = non_empty_env("SKYBRIDGE_PAGES_PREFIX")
            .unwrap_or_else(|| DEFAULT_PAGES_PREFIX.to_string());
        if pages_prefix.trim_matches('/').is_empty() {
            return Err(ConfigError::EmptyPagesPrefix);
        }
        let share_pages = SharePageLocation::new(site_url, &pages_prefix);

        let page_api_url = match non_empty_env("SKYBRIDGE_PAGE_API_URL") {
            Some(raw) => parse_url("SKYBRIDGE_PAGE_API_URL", raw)?,
            None => share_pages
                .site_base()
                .join("api/page")
                .map_err(|_| ConfigError::InvalidUrl {
                    var: "SKYBRIDGE_PAGE_API_URL",
                    value: format!("{}api/page", share_pages.site_base()),
                })?,
        };

        let http_timeout = match non_empty_env("SKYBRIDGE_HTTP_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        let credentials = match (
            non_empty_env("SKYBRIDGE_IDENTIFIER"),
            non_empty_env("SKYBRIDGE_APP_PASSWORD"),
            non_empty_env("SKYBRIDGE_DID"),
            non_empty_env("SKYBRIDGE_ACCESS_JWT"),
        ) {
            (Some(identifier), Some(password), _, _) => {
                Credentials::AppPassword { identifier, password }
            }
            (_, _, Some(did), Some(access_jwt)) => Credentials::Token(Session { did, access_jwt }),
            _ => Credentials::None,
        };

        Ok(Self {
            pds_url,
            share_pages,
            page_api_url,
            http_timeout,
            credentials,
        })
    }
}

/// Read an env var and return `Some(value)` only if it is non-empty after trimming.
fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|v| {
        let trimmed = v.trim().to_string();
        if trimmed.is_empty() { None } else { Some(trimmed) }
    })
}

fn parse_url(var: &'static str, value: String) -> Result<Url, ConfigError> {
    Url::parse(&value).map_err(|_| ConfigError::InvalidUrl { var, value })
}
