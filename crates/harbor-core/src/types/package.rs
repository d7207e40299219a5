//! Resolved package types.
//!
//! A `Package` is one concrete release located on an index: name, version,
//! where it came from, and the release metadata needed to build a
//! dependency graph.

use serde::{Deserialize, Serialize};

use super::version::Version;

/// Kind of source a package was resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A plain HTML directory-listing ("simple") index
    Legacy,
}

/// Provenance of a resolved package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSource {
    pub kind: SourceKind,
    /// Configured name of the source repository
    pub reference: String,
    /// Base URL of the source repository
    pub url: String,
}

/// One distributable file of a release: filename plus `alg:digest` hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file: String,
    pub hash: Option<String>,
}

/// Metadata fetched for one release
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseMetadata {
    pub summary: String,
    pub requires_dist: Vec<String>,
    pub requires_python: Option<String>,
    pub files: Vec<FileRecord>,
    /// Format tag of the cached encoding; entries with a stale tag are
    /// recomputed instead of trusted
    pub cache_version: String,
}

/// A resolved package release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: Version,
    pub source: Option<PackageSource>,
    pub metadata: ReleaseMetadata,
}

impl Package {
    /// Create a package with empty metadata and no provenance
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            source: None,
            metadata: ReleaseMetadata::default(),
        }
    }

    /// Stamp this package with its source repository
    pub fn with_source(mut self, kind: SourceKind, reference: impl Into<String>, url: impl Into<String>) -> Self {
        self.source = Some(PackageSource {
            kind,
            reference: reference.into(),
            url: url.into(),
        });
        self
    }

    /// Identity used for memoized lookups: name and version
    pub fn is_same_release(&self, name: &str, version: &Version) -> bool {
        self.name.eq_ignore_ascii_case(name) && &self.version == version
    }
}
