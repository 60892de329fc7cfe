// ABOUTME: Counts user-perceived characters in post text for the 300 grapheme limit.
// ABOUTME: Falls back to UTF-16 code units, which over-counts emoji and combining sequences.

use unicode_segmentation::UnicodeSegmentation;

/// Maximum number of graphemes a post may contain.
pub const POST_GRAPHEME_LIMIT: usize = 300;

/// How text length is measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Segmentation {
    /// Extended grapheme clusters. A family emoji counts as one.
    #[default]
    Graphemes,
    /// Raw UTF-16 code units, for environments without segmentation support.
    /// Multi-unit characters count more than once; this is a known limitation.
    CodeUnits,
}

/// Counts text length using the configured segmentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphemeCounter {
    segmentation: Segmentation,
}

impl GraphemeCounter {
    pub fn new(segmentation: Segmentation) -> Self {
        Self { segmentation }
    }

    pub fn count(&self, text: &str) -> usize {
        match self.segmentation {
            Segmentation::Graphemes => text.graphemes(true).count(),
            Segmentation::CodeUnits => text.encode_utf16().count(),
        }
    }
}
