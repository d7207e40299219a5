//! Prioritized aggregation of repositories.
//!
//! A pool holds the configured repositories in consultation order: an
//! optional default first, then primaries in insertion order, then
//! secondaries. Lookups walk that order and the first repository that
//! answers wins; later repositories are never consulted for the same
//! question. A pool may delegate to a parent pool when it has no answer
//! of its own.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use harbor_core::{Dependency, HarborError, HarborResult, Link, Package, Version};

use crate::repository::Repository;

/// Ordered collection of repositories with first-match-wins lookups
pub struct RepositoryPool {
    repositories: Vec<Arc<dyn Repository>>,
    /// Repository name to its position in `repositories`
    lookup: HashMap<String, usize>,
    has_default: bool,
    /// Index of the first secondary repository, if any
    secondary_start: Option<usize>,
    ignore_repository_names: bool,
    parent: Option<Arc<RepositoryPool>>,
    /// Packages resolved through this pool, in resolution order
    resolved: Mutex<Vec<Package>>,
}

impl RepositoryPool {
    pub fn new() -> Self {
        Self {
            repositories: Vec::new(),
            lookup: HashMap::new(),
            has_default: false,
            secondary_start: None,
            ignore_repository_names: false,
            parent: None,
            resolved: Mutex::new(Vec::new()),
        }
    }

    /// Delegate lookups this pool cannot answer to a parent pool.
    /// Acyclic by construction: the parent must already exist.
    pub fn with_parent(mut self, parent: Arc<RepositoryPool>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Treat a dependency's source name as a hint rather than a filter
    pub fn ignore_repository_names(mut self, ignore: bool) -> Self {
        self.ignore_repository_names = ignore;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn has_default(&self) -> bool {
        self.has_default
    }

    pub fn has_primary_repositories(&self) -> bool {
        self.secondary_start.unwrap_or(self.repositories.len()) > usize::from(self.has_default)
    }

    /// Repositories in consultation order
    pub fn repositories(&self) -> &[Arc<dyn Repository>] {
        &self.repositories
    }

    pub fn repository(&self, name: &str) -> Option<&Arc<dyn Repository>> {
        self.lookup
            .get(&name.to_lowercase())
            .map(|&idx| &self.repositories[idx])
    }

    pub fn has_repository(&self, name: &str) -> bool {
        self.lookup.contains_key(&name.to_lowercase())
    }

    /// Add a primary repository, after the default and existing primaries
    /// but before any secondary
    pub fn add_repository(&mut self, repository: Arc<dyn Repository>) -> HarborResult<&mut Self> {
        self.add(repository, false, false)
    }

    /// Add the default repository at the front; at most one is allowed
    pub fn add_default(&mut self, repository: Arc<dyn Repository>) -> HarborResult<&mut Self> {
        self.add(repository, true, false)
    }

    /// Add a secondary repository, consulted after every primary and only
    /// for lookups that name it
    pub fn add_secondary(&mut self, repository: Arc<dyn Repository>) -> HarborResult<&mut Self> {
        self.add(repository, false, true)
    }

    fn add(
        &mut self,
        repository: Arc<dyn Repository>,
        default: bool,
        secondary: bool,
    ) -> HarborResult<&mut Self> {
        // names are case-insensitive; the lookup key is the lower-cased form
        let name = repository.name().to_lowercase();
        if self.lookup.contains_key(&name) {
            return Err(HarborError::config(format!(
                "A repository with the name [{name}] already exists"
            )));
        }

        let index = if default {
            if self.has_default {
                return Err(HarborError::config(
                    "Only one repository can be the default",
                ));
            }
            self.has_default = true;
            0
        } else if secondary {
            if self.secondary_start.is_none() {
                self.secondary_start = Some(self.repositories.len());
            }
            self.repositories.len()
        } else {
            // after existing primaries, before any secondary
            self.secondary_start.unwrap_or(self.repositories.len())
        };

        // shift the positions of everything that moves right
        for position in self.lookup.values_mut() {
            if *position >= index {
                *position += 1;
            }
        }
        if !secondary {
            if let Some(start) = self.secondary_start.as_mut() {
                *start += 1;
            }
        }

        debug!(repository = %name, index, default, secondary, "repository added to pool");

        self.repositories.insert(index, repository);
        self.lookup.insert(name, index);

        Ok(self)
    }

    /// Remove a repository by name; unknown names are ignored
    pub fn remove_repository(&mut self, name: &str) -> &mut Self {
        let Some(index) = self.lookup.remove(&name.to_lowercase()) else {
            return self;
        };

        self.repositories.remove(index);
        if index == 0 && self.has_default {
            self.has_default = false;
        }

        for position in self.lookup.values_mut() {
            if *position > index {
                *position -= 1;
            }
        }

        if let Some(start) = self.secondary_start {
            let start = if start > index { start - 1 } else { start };
            // drops to None when the last secondary is gone
            self.secondary_start = (start < self.repositories.len()).then_some(start);
        }

        self
    }

    /// Packages resolved through unnamed `package` lookups, in resolution
    /// order. An accumulation record for inspection; lookups never read it.
    pub fn resolved_packages(&self) -> Vec<Package> {
        self.resolved.lock().clone()
    }

    /// Resolve one release. A named source restricts the lookup to that
    /// repository; otherwise repositories are consulted in order and the
    /// first holder wins. Falls back to the parent pool before failing.
    pub fn package(
        &self,
        name: &str,
        version: &Version,
        extras: &[String],
        repository_name: Option<&str>,
    ) -> HarborResult<Package> {
        let repository_name = repository_name.filter(|_| !self.ignore_repository_names);

        if let Some(repository_name) = repository_name {
            if !self.has_repository(repository_name) && self.parent.is_none() {
                return Err(HarborError::config(format!(
                    "Repository [{repository_name}] does not exist",
                )));
            }

            if let Some(repository) = self.repository(repository_name) {
                match repository.package(name, version, extras) {
                    Ok(package) => return Ok(package),
                    // the named repository lacks it; the parent may not
                    Err(HarborError::PackageNotFound { .. }) => {},
                    Err(error) => return Err(error),
                }
            }
        } else {
            for repository in &self.repositories {
                match repository.package(name, version, extras) {
                    Ok(package) => {
                        self.resolved.lock().push(package.clone());
                        return Ok(package);
                    },
                    // an absent release defers to the next repository;
                    // anything else is a real failure
                    Err(HarborError::PackageNotFound { .. }) => continue,
                    Err(error) => return Err(error),
                }
            }
        }

        if let Some(parent) = &self.parent {
            return parent.package(name, version, extras, repository_name);
        }

        Err(HarborError::release_not_found(name, version))
    }

    /// Candidate releases for a dependency. A named source queries only
    /// that repository; an unnamed dependency scans the default and the
    /// primaries in order, taking the first non-empty answer. Secondaries
    /// only answer lookups that name them.
    pub fn find_packages(&self, dependency: &Dependency) -> HarborResult<Vec<Package>> {
        let source_name = dependency
            .source_name
            .as_deref()
            .filter(|_| !self.ignore_repository_names);

        if let Some(source_name) = source_name {
            if let Some(repository) = self.repository(source_name) {
                return repository.find_packages(dependency);
            }
            if let Some(parent) = &self.parent {
                return parent.find_packages(dependency);
            }
            return Err(HarborError::config(format!(
                "Repository [{source_name}] does not exist",
            )));
        }

        let boundary = self.secondary_start.unwrap_or(self.repositories.len());
        for repository in &self.repositories[..boundary] {
            let packages = repository.find_packages(dependency)?;
            if !packages.is_empty() {
                return Ok(packages);
            }
        }

        if let Some(parent) = &self.parent {
            return parent.find_packages(dependency);
        }

        Ok(Vec::new())
    }

    /// Distribution links for a resolved package, first answer wins
    pub fn find_links_for_package(&self, package: &Package) -> HarborResult<Vec<Link>> {
        for repository in &self.repositories {
            let links = repository.find_links_for_package(package)?;
            if !links.is_empty() {
                return Ok(links);
            }
        }

        if let Some(parent) = &self.parent {
            return parent.find_links_for_package(package);
        }

        Ok(Vec::new())
    }

    /// Keyword search across every repository that supports it,
    /// concatenated in consultation order
    pub fn search(&self, query: &str) -> HarborResult<Vec<Package>> {
        let mut results = Vec::new();

        for repository in &self.repositories {
            if !repository.supports_search() {
                continue;
            }
            results.extend(repository.search(query)?);
        }

        if let Some(parent) = &self.parent {
            results.extend(parent.search(query)?);
        }

        Ok(results)
    }
}

impl Default for RepositoryPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RepositoryPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.repositories.iter().map(|r| r.name()).collect();
        f.debug_struct("RepositoryPool")
            .field("repositories", &names)
            .field("has_default", &self.has_default)
            .field("secondary_start", &self.secondary_start)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;

    fn repo(name: &str) -> Arc<InMemoryRepository> {
        Arc::new(InMemoryRepository::new(name))
    }

    fn repo_with(name: &str, packages: &[(&str, &str)]) -> Arc<InMemoryRepository> {
        let repo = repo(name);
        for (pkg, version) in packages {
            repo.add_package(Package::new(*pkg, Version::parse(version).unwrap()));
        }
        repo
    }

    fn order(pool: &RepositoryPool) -> Vec<&str> {
        pool.repositories().iter().map(|r| r.name()).collect()
    }

    #[test]
    fn test_consultation_order() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(repo("p1")).unwrap();
        pool.add_secondary(repo("s1")).unwrap();
        pool.add_repository(repo("p2")).unwrap();
        pool.add_default(repo("default")).unwrap();
        pool.add_repository(repo("p3")).unwrap();

        // default first, primaries in insertion order, secondaries last
        assert_eq!(order(&pool), vec!["default", "p1", "p2", "p3", "s1"]);

        // the name lookup tracks every shift
        for name in ["default", "p1", "p2", "p3", "s1"] {
            assert_eq!(pool.repository(name).unwrap().name(), name);
        }
    }

    #[test]
    fn test_only_one_default() {
        let mut pool = RepositoryPool::new();
        pool.add_default(repo("d1")).unwrap();

        let err = pool.add_default(repo("d2")).unwrap_err();
        assert!(matches!(err, HarborError::Config { .. }));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(repo("internal")).unwrap();

        assert!(pool.add_repository(repo("internal")).is_err());
        assert!(pool.add_secondary(repo("internal")).is_err());
    }

    #[test]
    fn test_remove_repository_reindexes() {
        let mut pool = RepositoryPool::new();
        pool.add_default(repo("default")).unwrap();
        pool.add_repository(repo("p1")).unwrap();
        pool.add_repository(repo("p2")).unwrap();
        pool.add_secondary(repo("s1")).unwrap();

        pool.remove_repository("p1");

        assert_eq!(order(&pool), vec!["default", "p2", "s1"]);
        assert_eq!(pool.repository("p2").unwrap().name(), "p2");
        assert!(pool.has_default());

        pool.remove_repository("default");
        assert!(!pool.has_default());

        // unknown names are a no-op
        pool.remove_repository("nope");
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_find_packages_first_match_wins() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(repo_with("first", &[("demo", "1.0")])).unwrap();
        pool.add_repository(repo_with("second", &[("demo", "1.0"), ("demo", "2.0")]))
            .unwrap();

        let found = pool.find_packages(&Dependency::any("demo")).unwrap();

        // answers are never merged across repositories
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].version, Version::parse("1.0").unwrap());
    }

    #[test]
    fn test_find_packages_skips_empty_repositories() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(repo("empty")).unwrap();
        pool.add_repository(repo_with("stocked", &[("demo", "2.0")])).unwrap();

        let found = pool.find_packages(&Dependency::any("demo")).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_secondaries_answer_only_named_lookups() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(repo("primary")).unwrap();
        pool.add_secondary(repo_with("extra", &[("demo", "1.0")])).unwrap();

        // unnamed scan stops at the primary boundary
        assert!(pool.find_packages(&Dependency::any("demo")).unwrap().is_empty());

        let dep = Dependency::any("demo").with_source("extra");
        assert_eq!(pool.find_packages(&dep).unwrap().len(), 1);
    }

    #[test]
    fn test_named_lookup_requires_a_known_repository() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(repo("primary")).unwrap();

        let dep = Dependency::any("demo").with_source("nope");
        let err = pool.find_packages(&dep).unwrap_err();

        assert!(matches!(err, HarborError::Config { .. }));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_ignore_repository_names_widens_the_lookup() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(repo_with("primary", &[("demo", "1.0")])).unwrap();
        let pool = pool.ignore_repository_names(true);

        let dep = Dependency::any("demo").with_source("nope");
        assert_eq!(pool.find_packages(&dep).unwrap().len(), 1);
    }

    #[test]
    fn test_parent_delegation() {
        let mut parent = RepositoryPool::new();
        parent
            .add_repository(repo_with("upstream", &[("demo", "3.0")]))
            .unwrap();
        let parent = Arc::new(parent);

        let mut pool = RepositoryPool::new();
        pool.add_repository(repo("local")).unwrap();
        let pool = pool.with_parent(parent);

        // unnamed misses fall through to the parent
        let found = pool.find_packages(&Dependency::any("demo")).unwrap();
        assert_eq!(found.len(), 1);

        // so do lookups naming a repository this pool does not know
        let dep = Dependency::any("demo").with_source("upstream");
        assert_eq!(pool.find_packages(&dep).unwrap().len(), 1);

        let version = Version::parse("3.0").unwrap();
        let package = pool.package("demo", &version, &[], None).unwrap();
        assert_eq!(package.version, version);
    }

    #[test]
    fn test_package_walks_repositories_in_order() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(repo("empty")).unwrap();
        pool.add_repository(repo_with("stocked", &[("demo", "1.0")])).unwrap();

        let version = Version::parse("1.0").unwrap();
        let package = pool.package("demo", &version, &[], None).unwrap();
        assert_eq!(package.name, "demo");

        // every unnamed resolution is recorded, repeats included
        assert_eq!(pool.resolved_packages().len(), 1);
        pool.package("demo", &version, &[], None).unwrap();
        assert_eq!(pool.resolved_packages().len(), 2);
    }

    #[test]
    fn test_named_lookup_ignores_earlier_resolutions() {
        use harbor_core::SourceKind;

        let version = Version::parse("1.0").unwrap();
        let stocked = |name: &str| {
            let repository = repo(name);
            repository.add_package(Package::new("demo", version.clone()).with_source(
                SourceKind::Legacy,
                name,
                format!("https://{name}.example/simple"),
            ));
            repository
        };

        let mut pool = RepositoryPool::new();
        pool.add_repository(stocked("r1")).unwrap();
        pool.add_repository(stocked("r2")).unwrap();

        let unnamed = pool.package("demo", &version, &[], None).unwrap();
        assert_eq!(unnamed.source.as_ref().unwrap().reference, "r1");

        // naming the other repository must actually consult it
        let named = pool.package("demo", &version, &[], Some("r2")).unwrap();
        assert_eq!(named.source.as_ref().unwrap().reference, "r2");

        // named lookups are not recorded
        assert_eq!(pool.resolved_packages().len(), 1);
    }

    #[test]
    fn test_repository_names_are_case_insensitive() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(repo_with("Internal", &[("demo", "1.0")])).unwrap();

        assert!(pool.has_repository("INTERNAL"));
        assert_eq!(pool.repository("internal").unwrap().name(), "Internal");

        let dep = Dependency::any("demo").with_source("Internal");
        assert_eq!(pool.find_packages(&dep).unwrap().len(), 1);

        let version = Version::parse("1.0").unwrap();
        assert!(pool.package("demo", &version, &[], Some("iNtErNaL")).is_ok());

        pool.remove_repository("inTERNal");
        assert!(pool.is_empty());
    }

    #[test]
    fn test_debug_lists_repositories_in_order() {
        let mut pool = RepositoryPool::new();
        pool.add_default(repo("main")).unwrap();
        pool.add_repository(repo("p1")).unwrap();

        let rendered = format!("{pool:?}");
        assert!(rendered.contains(r#"["main", "p1"]"#));
    }

    #[test]
    fn test_package_missing_everywhere_names_the_version() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(repo("empty")).unwrap();

        let err = pool
            .package("demo", &Version::parse("1.0").unwrap(), &[], None)
            .unwrap_err();

        assert_eq!(err.to_string(), "Package 'demo' not found at version '1.0'");
    }

    #[test]
    fn test_package_with_unknown_named_repository_is_a_config_error() {
        let mut pool = RepositoryPool::new();
        pool.add_repository(repo("primary")).unwrap();

        let err = pool
            .package("demo", &Version::parse("1.0").unwrap(), &[], Some("nope"))
            .unwrap_err();

        assert!(matches!(err, HarborError::Config { .. }));
    }

    #[test]
    fn test_search_concatenates_capable_repositories() {
        struct NoSearch(InMemoryRepository);
        impl Repository for NoSearch {
            fn name(&self) -> &str {
                self.0.name()
            }
            fn find_packages(&self, dependency: &Dependency) -> HarborResult<Vec<Package>> {
                self.0.find_packages(dependency)
            }
            fn package(&self, name: &str, version: &Version, extras: &[String]) -> HarborResult<Package> {
                self.0.package(name, version, extras)
            }
            fn find_links_for_package(&self, package: &Package) -> HarborResult<Vec<Link>> {
                self.0.find_links_for_package(package)
            }
            fn search(&self, _query: &str) -> HarborResult<Vec<Package>> {
                panic!("must not be consulted");
            }
            fn supports_search(&self) -> bool {
                false
            }
        }

        let unsearchable = NoSearch(InMemoryRepository::new("legacy"));
        unsearchable
            .0
            .add_package(Package::new("demo", Version::parse("1.0").unwrap()));

        let mut pool = RepositoryPool::new();
        pool.add_repository(Arc::new(unsearchable)).unwrap();
        pool.add_repository(repo_with("searchable", &[("demo", "2.0")])).unwrap();

        let results = pool.search("demo").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].version, Version::parse("2.0").unwrap());
    }

    #[test]
    fn test_has_primary_repositories() {
        let mut pool = RepositoryPool::new();
        assert!(!pool.has_primary_repositories());

        pool.add_default(repo("default")).unwrap();
        assert!(!pool.has_primary_repositories());

        pool.add_secondary(repo("s1")).unwrap();
        assert!(!pool.has_primary_repositories());

        pool.add_repository(repo("p1")).unwrap();
        assert!(pool.has_primary_repositories());
    }
}
