//! Package index clients and repository pool for Harbor
//!
//! This crate locates package releases across a prioritized set of package
//! indexes: a client for legacy (plain HTML directory-listing) indexes with
//! two-level caching, and a pool that orders multiple indexes by priority
//! tier with optional fallback to a parent scope.

pub mod auth;
pub mod cache;
pub mod client;
pub mod inspect;
pub mod page;
pub mod pool;
pub mod repository;

// Re-export main types
pub use auth::{authenticated_url, CredentialProvider, Credentials, NoCredentials, StaticCredentials};
pub use cache::{CacheEntry, CacheStore, FileCache, MemoryCache};
pub use client::{LegacyIndexClient, LegacyIndexClientBuilder, CACHE_VERSION, MATCHES_TTL};
pub use inspect::{DistributionUrls, NoopInspector, ReleaseInspector, ReleaseProbe};
pub use page::IndexPage;
pub use pool::RepositoryPool;
pub use repository::{InMemoryRepository, Repository};
