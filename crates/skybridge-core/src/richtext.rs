// ABOUTME: Detects links, @mentions, and #tags in post text and reports their UTF-8 byte ranges.
// ABOUTME: Mentions come back as handles; turning them into DIDs is the record builder's job.

use std::sync::LazyLock;

use regex::Regex;

use crate::record::{ByteSlice, Facet, FacetFeature};

const MAX_TAG_CHARS: usize = 64;

/// Bare domains (no scheme) are only linked for these TLDs, so prose like
/// "end.Next" does not turn into a link.
const BARE_DOMAIN_TLDS: &[&str] = &[
    "com", "net", "org", "io", "dev", "app", "social", "jp", "co", "me", "xyz", "info",
];

static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|[\s(])(?P<mention>@(?P<handle>(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?\.)+[a-zA-Z](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?))",
    )
    .expect("mention regex compiles")
});

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|[\s(])(?P<url>(?P<scheme>https?://)?(?:[a-zA-Z0-9-]+\.)+(?P<tld>[a-zA-Z]{2,})(?::\d+)?(?:[/?#]\S*)?)",
    )
    .expect("url regex compiles")
});

// Both the ASCII and the fullwidth hash start a tag.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(?P<tag>[#＃](?P<name>[^\s#＃]+))").expect("tag regex compiles")
});

static TRAILING_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{P}+$").expect("punctuation regex compiles"));

/// What a detected span refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectedKind {
    Link { uri: String },
    Mention { handle: String },
    Tag { tag: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedFacet {
    pub index: ByteSlice,
    pub kind: DetectedKind,
}

impl DetectedFacet {
    /// Convert into a record facet. Mentions need a resolved DID, so they
    /// return `None` here; see [`DetectedFacet::into_mention_facet`].
    pub fn into_facet(self) -> Option<Facet> {
        let feature = match self.kind {
            DetectedKind::Link { uri } => FacetFeature::Link { uri },
            DetectedKind::Tag { tag } => FacetFeature::Tag { tag },
            DetectedKind::Mention { .. } => return None,
        };
        Some(Facet { index: self.index, features: vec![feature] })
    }

    pub fn into_mention_facet(self, did: String) -> Facet {
        Facet {
            index: self.index,
            features: vec![FacetFeature::Mention { did }],
        }
    }
}

/// Find every link, mention, and tag in `text`, ordered by byte offset.
pub fn detect_facets(text: &str) -> Vec<DetectedFacet> {
    let mut found = Vec::new();

    for caps in MENTION_RE.captures_iter(text) {
        let (Some(m), Some(handle)) = (caps.name("mention"), caps.name("handle")) else {
            continue;
        };
        found.push(DetectedFacet {
            index: ByteSlice { byte_start: m.start(), byte_end: m.end() },
            kind: DetectedKind::Mention { handle: handle.as_str().to_lowercase() },
        });
    }

    for caps in URL_RE.captures_iter(text) {
        let Some(m) = caps.name("url") else { continue };
        let has_scheme = caps.name("scheme").is_some();
        if !has_scheme {
            let tld = caps.name("tld").map(|t| t.as_str().to_lowercase()).unwrap_or_default();
            if !BARE_DOMAIN_TLDS.contains(&tld.as_str()) {
                continue;
            }
        }
        let trimmed = trim_url(m.as_str());
        let uri = if has_scheme {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };
        found.push(DetectedFacet {
            index: ByteSlice { byte_start: m.start(), byte_end: m.start() + trimmed.len() },
            kind: DetectedKind::Link { uri },
        });
    }

    for caps in TAG_RE.captures_iter(text) {
        let (Some(m), Some(name)) = (caps.name("tag"), caps.name("name")) else {
            continue;
        };
        // symbols such as '+' stay, so "#c++" is the tag "c++"
        let tag = TRAILING_PUNCT_RE.replace(name.as_str(), "");
        let tag: &str = &tag;
        if tag.is_empty()
            || tag.chars().count() > MAX_TAG_CHARS
            || tag.chars().all(|c| c.is_ascii_digit())
        {
            continue;
        }
        let end = name.start() + tag.len();
        found.push(DetectedFacet {
            index: ByteSlice { byte_start: m.start(), byte_end: end },
            kind: DetectedKind::Tag { tag: tag.to_string() },
        });
    }

    found.sort_by_key(|f| f.index.byte_start);
    found
}

/// Drop trailing sentence punctuation and a closing paren that has no
/// opening partner inside the URL.
fn trim_url(raw: &str) -> &str {
    let mut url = raw.trim_end_matches(['.', ',', ';', ':', '!', '?', '"', '\'']);
    if url.ends_with(')') && !url.contains('(') {
        url = &url[..url.len() - 1];
    }
    url
}
