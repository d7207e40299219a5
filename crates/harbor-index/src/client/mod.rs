//! Client for legacy (plain HTML directory-listing) package indexes.
//!
//! Fetches `{base}/{canonical-name}/` pages, derives candidate versions
//! from the anchors, filters them against the dependency's constraint and
//! prerelease policy, and caches results at two granularities: matched
//! version lists (short TTL) and per-release metadata (immutable once a
//! version is published).

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use tracing::{debug, warn};

use harbor_core::{
    canonicalize_name, Dependency, FileRecord, HarborError, HarborResult, Link, Package,
    ReleaseMetadata, SourceKind, Version,
};

use crate::auth::{authenticated_url, CredentialProvider, Credentials};
use crate::cache::{CacheStore, FileCache, MemoryCache};
use crate::inspect::{DistributionUrls, NoopInspector, ReleaseInspector};
use crate::page::IndexPage;
use crate::repository::Repository;

/// Format tag for cached release metadata; bump when the encoding changes
pub const CACHE_VERSION: &str = "2";

/// How long a matched-version list stays fresh
pub const MATCHES_TTL: Duration = Duration::from_secs(5 * 60);

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Builder for [`LegacyIndexClient`]
pub struct LegacyIndexClientBuilder {
    name: String,
    url: String,
    provider: Option<Arc<dyn CredentialProvider>>,
    inspector: Arc<dyn ReleaseInspector>,
    cache_dir: Option<PathBuf>,
    cert: Option<PathBuf>,
    client_cert: Option<PathBuf>,
    disable_cache: bool,
    timeout: Duration,
    matches_ttl: Duration,
}

impl LegacyIndexClientBuilder {
    /// Ask a credential provider for basic-auth credentials at build time
    pub fn credential_provider(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Inject the release-metadata extraction collaborator
    pub fn inspector(mut self, inspector: Arc<dyn ReleaseInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    /// Directory for this repository's file-backed release cache; without
    /// one, release metadata is only cached in memory
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Path to a PEM CA certificate to trust
    pub fn cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.cert = Some(path.into());
        self
    }

    /// Path to a PEM client certificate to present
    pub fn client_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_cert = Some(path.into());
        self
    }

    /// Bypass the matched-version and release caches entirely
    pub fn disable_cache(mut self) -> Self {
        self.disable_cache = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override how long matched-version lists stay fresh
    pub fn matches_ttl(mut self, ttl: Duration) -> Self {
        self.matches_ttl = ttl;
        self
    }

    pub fn build(self) -> HarborResult<LegacyIndexClient> {
        if self.name == "pypi" {
            return Err(HarborError::config(
                "The name [pypi] is reserved for repositories",
            ));
        }

        let url = self.url.trim_end_matches('/').to_string();

        let credentials = self
            .provider
            .as_ref()
            .and_then(|provider| provider.credentials_for_url(&url));

        let mut builder = Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("harbor/", env!("CARGO_PKG_VERSION")));

        if let Some(credentials) = &credentials {
            let value = format!(
                "Basic {}",
                BASE64.encode(format!("{}:{}", credentials.username, credentials.password))
            );
            let mut headers = HeaderMap::new();
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&value).map_err(|e| {
                    HarborError::repository(&url, "invalid basic-auth credentials", e)
                })?,
            );
            builder = builder.default_headers(headers);
        }

        if let Some(path) = &self.cert {
            let pem = std::fs::read(path).map_err(|e| {
                HarborError::io(format!("failed to read CA certificate {}", path.display()), e)
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| HarborError::repository(&url, "invalid CA certificate", e))?;
            builder = builder.add_root_certificate(cert);
        }

        if let Some(path) = &self.client_cert {
            let pem = std::fs::read(path).map_err(|e| {
                HarborError::io(format!("failed to read client certificate {}", path.display()), e)
            })?;
            let identity = reqwest::Identity::from_pem(&pem)
                .map_err(|e| HarborError::repository(&url, "invalid client certificate", e))?;
            builder = builder.identity(identity);
        }

        let session = builder
            .build()
            .map_err(|e| HarborError::repository(&url, "failed to build HTTP client", e))?;

        let releases: Box<dyn CacheStore<ReleaseMetadata>> = match &self.cache_dir {
            Some(dir) => Box::new(FileCache::new(dir.join(&self.name))?),
            None => Box::new(MemoryCache::new()),
        };

        Ok(LegacyIndexClient {
            name: self.name,
            url,
            session,
            credentials,
            matches: MemoryCache::new(),
            releases,
            resolved: MemoryCache::new(),
            inspector: self.inspector,
            disable_cache: self.disable_cache,
            matches_ttl: self.matches_ttl,
        })
    }
}

/// A client for one legacy HTML package index
pub struct LegacyIndexClient {
    name: String,
    url: String,
    session: Client,
    credentials: Option<Credentials>,
    /// Matched-version lists keyed by `name` or `name:constraint`
    matches: MemoryCache<Vec<Version>>,
    /// Release metadata keyed by `name:version`; immutable once published
    releases: Box<dyn CacheStore<ReleaseMetadata>>,
    /// Already-resolved packages, keyed like `releases`
    resolved: MemoryCache<Package>,
    inspector: Arc<dyn ReleaseInspector>,
    disable_cache: bool,
    matches_ttl: Duration,
}

impl LegacyIndexClient {
    pub fn builder(name: impl Into<String>, url: impl Into<String>) -> LegacyIndexClientBuilder {
        LegacyIndexClientBuilder {
            name: name.into(),
            url: url.into(),
            provider: None,
            inspector: Arc::new(NoopInspector),
            cache_dir: None,
            cert: None,
            client_cert: None,
            disable_cache: false,
            timeout: DEFAULT_TIMEOUT,
            matches_ttl: MATCHES_TTL,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// URL with inline credentials, for display and debugging only
    pub fn authenticated_url(&self) -> String {
        match &self.credentials {
            Some(credentials) => authenticated_url(&self.url, credentials),
            None => self.url.clone(),
        }
    }

    /// Find all releases of a dependency's package that its constraint
    /// allows.
    ///
    /// The matched-version cache key is `name` or `name:constraint` and
    /// deliberately does not encode the prerelease flag: a hit computed
    /// under a different prerelease policy is returned unchanged.
    pub fn find_packages(&self, dependency: &Dependency) -> HarborResult<Vec<Package>> {
        let constraint = &dependency.constraint;

        // a range explicitly bounded by a prerelease must permit prereleases
        let allow_prereleases =
            dependency.allows_prereleases || constraint.has_unstable_bound();

        let mut key = dependency.name.clone();
        if !constraint.is_any() {
            key = format!("{key}:{constraint}");
        }

        let mut ignored_prereleases = Vec::new();

        let cached = (!self.disable_cache).then(|| self.matches.get(&key)).flatten();
        let versions = match cached {
            Some(versions) => versions,
            None => {
                let Some(page) = self.fetch_page(&canonicalize_name(&dependency.name))? else {
                    return Ok(Vec::new());
                };

                let mut versions = Vec::new();
                for version in page.versions() {
                    if version.is_unstable() && !allow_prereleases {
                        if constraint.is_any() {
                            // needed when every version of the package is a prerelease
                            ignored_prereleases.push(version);
                        }
                        continue;
                    }

                    if constraint.allows(&version) {
                        versions.push(version);
                    }
                }

                if !self.disable_cache {
                    self.matches.put(&key, versions.clone(), Some(self.matches_ttl));
                }

                versions
            },
        };

        let mut packages = Vec::new();
        for bucket in [&versions, &ignored_prereleases] {
            for version in bucket {
                packages.push(self.stamp(Package::new(dependency.name.clone(), version.clone())));
            }

            debug!(
                count = packages.len(),
                package = %dependency.name,
                constraint = %constraint,
                "matching packages found"
            );

            // we have matching packages, or the constraint is not (*)
            if !packages.is_empty() || !constraint.is_any() {
                break;
            }
        }

        Ok(packages)
    }

    /// Retrieve full release information for one version.
    ///
    /// This is a heavy task the first time around: distribution files have
    /// to be inspected to learn the release's requirements. Results are
    /// cached, so subsequent calls are fast.
    pub fn package(&self, name: &str, version: &Version, extras: &[String]) -> HarborResult<Package> {
        let key = format!("{}:{}", canonicalize_name(name), version);

        if let Some(package) = self.resolved.get(&key) {
            return Ok(package);
        }

        let metadata = if self.disable_cache {
            self.release_info(name, version, extras)?
        } else {
            let cached = self
                .releases
                .get(&key)
                .filter(|metadata| metadata.cache_version == CACHE_VERSION);

            match cached {
                Some(metadata) => metadata,
                None => {
                    let metadata = self.release_info(name, version, extras)?;
                    self.releases.put(&key, metadata.clone(), None);
                    metadata
                },
            }
        };

        let mut package = Package::new(name.to_string(), version.clone());
        package.metadata = metadata;
        let package = self.stamp(package);

        self.resolved.put(&key, package.clone(), None);

        Ok(package)
    }

    /// Distribution links for an already-resolved package; empty when the
    /// index has no page for it
    pub fn find_links_for_package(&self, package: &Package) -> HarborResult<Vec<Link>> {
        let Some(page) = self.fetch_page(&canonicalize_name(&package.name))? else {
            return Ok(Vec::new());
        };

        Ok(page.links_for_version(&package.version).collect())
    }

    fn release_info(
        &self,
        name: &str,
        version: &Version,
        extras: &[String],
    ) -> HarborResult<ReleaseMetadata> {
        let page = self
            .fetch_page(&canonicalize_name(name))?
            .ok_or_else(|| HarborError::package_not_found(name))?;

        let links: Vec<Link> = page.links_for_version(version).collect();
        if links.is_empty() {
            return Err(HarborError::release_not_found(name, version));
        }

        let mut urls = DistributionUrls::default();
        let mut files = Vec::new();

        for link in &links {
            if link.is_wheel() {
                urls.wheels.push(link.url_without_fragment());
            } else if link.is_sdist() {
                urls.sdists.push(link.url_without_fragment());
            }

            files.push(FileRecord {
                file: link.filename(),
                hash: link.file_hash(),
            });
        }

        let probe = self.inspector.inspect(name, version, extras, &urls)?;

        Ok(ReleaseMetadata {
            summary: probe.summary,
            requires_dist: probe.requires_dist,
            requires_python: probe.requires_python,
            files,
            cache_version: CACHE_VERSION.to_string(),
        })
    }

    /// GET one index page. 401/403 and 404 degrade to "absent"; any other
    /// failure is a repository error carrying the URL.
    fn fetch_page(&self, canonical_name: &str) -> HarborResult<Option<IndexPage>> {
        let url = format!("{}/{}/", self.url, canonical_name);

        let response = self
            .session
            .get(&url)
            .send()
            .map_err(|e| HarborError::repository(&url, "request failed", e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(%url, "authorization error accessing index");
            return Ok(None);
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(HarborError::Repository {
                url: url.clone(),
                message: format!("status {status}"),
                source: None,
            });
        }

        let final_url = response.url().clone();
        if final_url.as_str() != url {
            debug!(request = %url, response = %final_url, "response URL differs from request URL");
        }

        let headers = response.headers().clone();
        let body = response
            .bytes()
            .map_err(|e| HarborError::repository(&url, "failed to read response body", e))?;

        Ok(Some(IndexPage::new(final_url, &body, &headers)))
    }

    fn stamp(&self, package: Package) -> Package {
        package.with_source(SourceKind::Legacy, &self.name, &self.url)
    }
}

impl fmt::Debug for LegacyIndexClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyIndexClient")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("disable_cache", &self.disable_cache)
            .field("matches_ttl", &self.matches_ttl)
            .finish_non_exhaustive()
    }
}

impl Repository for LegacyIndexClient {
    fn name(&self) -> &str {
        self.name()
    }

    fn find_packages(&self, dependency: &Dependency) -> HarborResult<Vec<Package>> {
        self.find_packages(dependency)
    }

    fn package(&self, name: &str, version: &Version, extras: &[String]) -> HarborResult<Package> {
        self.package(name, version, extras)
    }

    fn find_links_for_package(&self, package: &Package) -> HarborResult<Vec<Link>> {
        self.find_links_for_package(package)
    }

    fn search(&self, _query: &str) -> HarborResult<Vec<Package>> {
        // legacy HTML indexes have no keyword search endpoint
        Ok(Vec::new())
    }

    fn supports_search(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests;
