// ABOUTME: The app.bsky.feed.post record subset skybridge builds: text, facets, and embeds.
// ABOUTME: Field names and $type tags follow the AT Protocol lexicon wire format.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Collection NSID for Bluesky posts.
pub const POST_COLLECTION: &str = "app.bsky.feed.post";

/// A Bluesky post record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(rename = "$type")]
    pub record_type: String,
    pub text: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<Facet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<Embed>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub langs: Vec<String>,
}

impl PostRecord {
    /// Create a bare post with no facets or embed. The timestamp is written
    /// as RFC 3339 with millisecond precision.
    pub fn new(text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            record_type: POST_COLLECTION.to_string(),
            text: text.into(),
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            facets: Vec::new(),
            embed: None,
            langs: Vec::new(),
        }
    }

    /// The URI of the first link facet, in facet order. Mentions and tags
    /// never qualify.
    pub fn first_link(&self) -> Option<&str> {
        self.facets.iter().find_map(|facet| {
            facet.features.iter().find_map(|feature| match feature {
                FacetFeature::Link { uri } => Some(uri.as_str()),
                _ => None,
            })
        })
    }

    pub fn has_images(&self) -> bool {
        matches!(self.embed, Some(Embed::Images { .. }))
    }
}

/// A rich-text annotation over a UTF-8 byte range of the post text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    pub index: ByteSlice,
    pub features: Vec<FacetFeature>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByteSlice {
    pub byte_start: usize,
    pub byte_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum FacetFeature {
    #[serde(rename = "app.bsky.richtext.facet#link")]
    Link { uri: String },
    #[serde(rename = "app.bsky.richtext.facet#mention")]
    Mention { did: String },
    #[serde(rename = "app.bsky.richtext.facet#tag")]
    Tag { tag: String },
}

/// Reference to a blob previously stored with `com.atproto.repo.uploadBlob`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobRef {
    #[serde(rename = "$type")]
    pub blob_type: String,
    #[serde(rename = "ref")]
    pub reference: CidLink,
    pub mime_type: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CidLink {
    #[serde(rename = "$link")]
    pub link: String,
}

/// Post embeds. The lexicon allows exactly one per post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum Embed {
    #[serde(rename = "app.bsky.embed.images")]
    Images { images: Vec<EmbeddedImage> },
    #[serde(rename = "app.bsky.embed.external")]
    External { external: ExternalCard },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedImage {
    pub alt: String,
    pub image: BlobRef,
}

/// Link-card metadata for an external embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCard {
    pub uri: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb: Option<BlobRef>,
}
