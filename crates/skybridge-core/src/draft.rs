// ABOUTME: Draft post contents, the session credentials, and ComposerState which owns both UI flags.
// ABOUTME: ComposerState keeps the grapheme count in sync with the text and decides button enablement.

use serde::{Deserialize, Serialize};

use crate::error::PostError;
use crate::grapheme::{GraphemeCounter, POST_GRAPHEME_LIMIT};

/// Bluesky accepts at most four images per post.
pub const MAX_IMAGES: usize = 4;

/// Credentials needed to write to the user's repo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub did: String,
    pub access_jwt: String,
}

/// An image picked for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub alt: String,
}

impl std::fmt::Debug for ImageBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBlob")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .field("alt", &self.alt)
            .finish()
    }
}

/// The post being composed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
    pub images: Vec<ImageBlob>,
    /// Open the X share intent automatically after posting.
    pub auto_popup: bool,
    /// The user will attach their own image on X, so no share page is
    /// generated. Link-card metadata is still attached to the post.
    pub suppress_card_generation: bool,
}

impl Draft {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.images.is_empty()
    }
}

/// Everything the compose form tracks, in one place.
#[derive(Debug, Clone, Default)]
pub struct ComposerState {
    draft: Draft,
    count: usize,
    counter: GraphemeCounter,
    pub processing: bool,
}

impl ComposerState {
    pub fn new(counter: GraphemeCounter) -> Self {
        Self {
            counter,
            ..Self::default()
        }
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn counter(&self) -> GraphemeCounter {
        self.counter
    }

    /// Replace the text and recount.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.draft.text = text.into();
        self.count = self.counter.count(&self.draft.text);
    }

    /// Replace the picked images. More than [`MAX_IMAGES`] is rejected and
    /// leaves the current selection alone.
    pub fn set_images(&mut self, images: Vec<ImageBlob>) -> Result<(), PostError> {
        if images.len() > MAX_IMAGES {
            return Err(PostError::Validation(format!(
                "at most {} images can be attached, got {}",
                MAX_IMAGES,
                images.len()
            )));
        }
        self.draft.images = images;
        Ok(())
    }

    pub fn set_auto_popup(&mut self, enabled: bool) {
        self.draft.auto_popup = enabled;
    }

    pub fn set_suppress_card_generation(&mut self, suppress: bool) {
        self.draft.suppress_card_generation = suppress;
    }

    /// Counter highlight: the text is over the grapheme limit.
    pub fn over_limit(&self) -> bool {
        self.count > POST_GRAPHEME_LIMIT
    }

    /// The post button is enabled for a non-empty draft within the grapheme
    /// limit while nothing is in flight.
    pub fn can_submit(&self) -> bool {
        !self.draft.is_empty() && !self.over_limit() && !self.processing
    }

    /// The discard button is enabled for a non-empty draft.
    pub fn can_discard(&self) -> bool {
        !self.draft.is_empty()
    }

    /// Clear text and images. The toggles are preferences and survive.
    pub fn discard(&mut self) {
        self.draft.text.clear();
        self.draft.images.clear();
        self.count = 0;
    }
}
