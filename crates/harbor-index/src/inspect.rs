//! Release metadata extraction collaborator.
//!
//! Turning distribution files into dependency metadata (downloading a
//! wheel or sdist and reading its requirements) is a heavy, separately
//! owned task. Index clients delegate it through this trait and only
//! assemble the result.

use harbor_core::{HarborResult, Version};

/// Distribution URLs of one release, bucketed by kind
#[derive(Debug, Clone, Default)]
pub struct DistributionUrls {
    pub wheels: Vec<String>,
    pub sdists: Vec<String>,
}

/// What metadata extraction yields for one release
#[derive(Debug, Clone, Default)]
pub struct ReleaseProbe {
    pub summary: String,
    pub requires_dist: Vec<String>,
    pub requires_python: Option<String>,
}

/// Extracts dependency metadata from a release's distribution files
pub trait ReleaseInspector: Send + Sync {
    fn inspect(
        &self,
        name: &str,
        version: &Version,
        extras: &[String],
        urls: &DistributionUrls,
    ) -> HarborResult<ReleaseProbe>;
}

/// Inspector that extracts nothing; useful when only hashes and file
/// listings are needed, and in tests
#[derive(Debug, Default)]
pub struct NoopInspector;

impl ReleaseInspector for NoopInspector {
    fn inspect(
        &self,
        _name: &str,
        _version: &Version,
        _extras: &[String],
        _urls: &DistributionUrls,
    ) -> HarborResult<ReleaseProbe> {
        Ok(ReleaseProbe::default())
    }
}
