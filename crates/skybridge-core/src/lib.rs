// ABOUTME: Core library for skybridge, containing the draft, record, status, and error types.
// ABOUTME: Nothing here performs I/O; network collaborators live in skybridge-client.

pub mod api;
pub mod draft;
pub mod error;
pub mod grapheme;
pub mod opengraph;
pub mod record;
pub mod richtext;
pub mod share;
pub mod status;

pub use api::{ApiFailure, ApiResponse, CreatedRecord, PageOutput};
pub use draft::{ComposerState, Draft, ImageBlob, MAX_IMAGES, Session};
pub use error::PostError;
pub use grapheme::{GraphemeCounter, POST_GRAPHEME_LIMIT, Segmentation};
pub use record::{Embed, Facet, FacetFeature, PostRecord};
pub use share::{SharePageLocation, ShareContent, should_attach_card, should_generate_page};
pub use status::{StatusFeed, StatusMessage};
