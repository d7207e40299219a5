//! Artifact links discovered on index pages.

use percent_encoding::percent_decode_str;
use url::Url;

/// Archive extensions an index link may carry; anything else is skipped
pub const SUPPORTED_FORMATS: &[&str] = &[
    ".tar.gz",
    ".whl",
    ".zip",
    ".tar.bz2",
    ".tar.xz",
    ".tar.Z",
    ".tar",
];

// Multi-part extensions have to be checked before the plain last-dot split
const MULTI_PART_FORMATS: &[&str] = &[".tar.gz", ".tar.bz2", ".tar.xz", ".tar.Z"];

// Suffixes the original treats as source distributions when bucketing
// release files (note: suffix match, so plain `.bz2`/`.xz` count too)
const SDIST_SUFFIXES: &[&str] = &[".tar.gz", ".zip", ".bz2", ".xz", ".Z", ".tar"];

/// One downloadable artifact reference discovered on an index page.
/// Immutable once created from an anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    url: Url,
    requires_python: Option<String>,
}

impl Link {
    pub fn new(url: Url, requires_python: Option<String>) -> Self {
        Self {
            url,
            requires_python,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// URL with the hash fragment stripped, for downloaders
    pub fn url_without_fragment(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.to_string()
    }

    /// Python-requirement marker from the anchor, if any
    pub fn requires_python(&self) -> Option<&str> {
        self.requires_python.as_deref()
    }

    /// Percent-decoded final path segment
    pub fn filename(&self) -> String {
        let segment = self
            .url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .unwrap_or("");

        percent_decode_str(segment).decode_utf8_lossy().into_owned()
    }

    /// File extension, preferring multi-part archive extensions
    pub fn extension(&self) -> Option<String> {
        let filename = self.filename();

        for format in MULTI_PART_FORMATS {
            if filename.ends_with(format) {
                return Some((*format).to_string());
            }
        }

        filename.rfind('.').map(|idx| filename[idx..].to_string())
    }

    /// Filename with the extension split off
    pub fn stem(&self) -> String {
        let filename = self.filename();
        match self.extension() {
            Some(ext) => filename[..filename.len() - ext.len()].to_string(),
            None => filename,
        }
    }

    /// Is the extension one of the supported archive formats?
    pub fn is_supported(&self) -> bool {
        match self.extension() {
            Some(ext) => SUPPORTED_FORMATS.contains(&ext.as_str()),
            None => false,
        }
    }

    pub fn is_wheel(&self) -> bool {
        self.filename().ends_with(".whl")
    }

    pub fn is_sdist(&self) -> bool {
        let filename = self.filename();
        SDIST_SUFFIXES.iter().any(|suffix| filename.ends_with(suffix))
    }

    /// Hash algorithm and digest from the URL fragment (`#sha256=...`)
    pub fn hash_pair(&self) -> Option<(String, String)> {
        let fragment = self.url.fragment()?;
        let (name, digest) = fragment.split_once('=')?;
        if name.is_empty() || digest.is_empty() {
            return None;
        }

        Some((name.to_string(), digest.to_string()))
    }

    /// `alg:digest` form used in file records
    pub fn file_hash(&self) -> Option<String> {
        self.hash_pair().map(|(name, digest)| format!("{name}:{digest}"))
    }
}
