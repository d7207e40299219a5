//! The repository capability interface.
//!
//! Every index kind (legacy HTML, in-memory, future API-based sources)
//! exposes the same contract: find candidate releases for a dependency,
//! fetch one release, list its distribution links. The pool aggregates
//! values of this trait without caring which kind they are.

use parking_lot::Mutex;

use harbor_core::{canonicalize_name, Dependency, HarborError, HarborResult, Link, Package, Version};

/// Contract shared by every package source
pub trait Repository: Send + Sync {
    /// Configured name of this repository
    fn name(&self) -> &str;

    /// Candidate releases matching a dependency; an absent package is an
    /// empty result, not an error
    fn find_packages(&self, dependency: &Dependency) -> HarborResult<Vec<Package>>;

    /// One specific release with full metadata
    fn package(&self, name: &str, version: &Version, extras: &[String]) -> HarborResult<Package>;

    /// Distribution links for an already-resolved package
    fn find_links_for_package(&self, package: &Package) -> HarborResult<Vec<Link>>;

    /// Keyword search; only meaningful when `supports_search` is true
    fn search(&self, query: &str) -> HarborResult<Vec<Package>>;

    /// Legacy HTML indexes cannot search by keyword
    fn supports_search(&self) -> bool {
        true
    }
}

/// A plain in-memory package source. Backs tests and ad-hoc sources; the
/// matching rules are the same as any other repository's.
pub struct InMemoryRepository {
    name: String,
    packages: Mutex<Vec<Package>>,
}

impl InMemoryRepository {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            packages: Mutex::new(Vec::new()),
        }
    }

    pub fn add_package(&self, package: Package) {
        self.packages.lock().push(package);
    }

    pub fn len(&self) -> usize {
        self.packages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.lock().is_empty()
    }
}

impl Repository for InMemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_packages(&self, dependency: &Dependency) -> HarborResult<Vec<Package>> {
        let constraint = &dependency.constraint;
        let allow_prereleases = dependency.allows_prereleases || constraint.has_unstable_bound();
        let wanted = canonicalize_name(&dependency.name);

        let mut packages = Vec::new();
        let mut ignored_prereleases = Vec::new();

        for package in self.packages.lock().iter() {
            if canonicalize_name(&package.name) != wanted {
                continue;
            }

            if package.version.is_unstable() && !allow_prereleases {
                if constraint.is_any() {
                    ignored_prereleases.push(package.clone());
                }
                continue;
            }

            if constraint.allows(&package.version) {
                packages.push(package.clone());
            }
        }

        // an index holding only prereleases still answers an unconstrained ask
        if packages.is_empty() && constraint.is_any() {
            packages = ignored_prereleases;
        }

        Ok(packages)
    }

    fn package(&self, name: &str, version: &Version, _extras: &[String]) -> HarborResult<Package> {
        self.packages
            .lock()
            .iter()
            .find(|p| p.is_same_release(name, version))
            .cloned()
            .ok_or_else(|| HarborError::release_not_found(name, version))
    }

    fn find_links_for_package(&self, _package: &Package) -> HarborResult<Vec<Link>> {
        Ok(Vec::new())
    }

    fn search(&self, query: &str) -> HarborResult<Vec<Package>> {
        let query = query.to_lowercase();
        Ok(self
            .packages
            .lock()
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&query))
            .cloned()
            .collect())
    }
}
