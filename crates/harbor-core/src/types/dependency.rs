//! Dependency specification types.

use super::constraint::VersionConstraint;
use super::version::VersionError;

/// A requested package: name, accepted versions and resolution options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub constraint: VersionConstraint,
    /// Explicit source repository to resolve from, if any
    pub source_name: Option<String>,
    pub extras: Vec<String>,
    pub allows_prereleases: bool,
}

impl Dependency {
    /// Create a dependency with an explicit constraint
    pub fn new(name: impl Into<String>, constraint: VersionConstraint) -> Self {
        Self {
            name: name.into(),
            constraint,
            source_name: None,
            extras: Vec::new(),
            allows_prereleases: false,
        }
    }

    /// Create a dependency that accepts any version
    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, VersionConstraint::any())
    }

    /// Create a dependency from a raw constraint string
    pub fn parse(name: impl Into<String>, constraint: &str) -> Result<Self, VersionError> {
        Ok(Self::new(name, VersionConstraint::parse(constraint)?))
    }

    /// Pin this dependency to a named source repository
    pub fn with_source(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    /// Request an extra for this dependency
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extras.push(extra.into());
        self
    }

    /// Opt in to prerelease versions
    pub fn allow_prereleases(mut self) -> Self {
        self.allows_prereleases = true;
        self
    }
}
