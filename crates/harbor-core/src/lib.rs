//! # harbor-core
//!
//! Core types shared across the Harbor source-resolution crates.
//!
//! This crate provides:
//! - Version and VersionConstraint types for PEP 440-flavored versioning
//! - Dependency, Package and Link types for release resolution
//! - HarborError enum for unified error handling
//! - Name canonicalization helpers
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, Package, Link, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{HarborError, HarborResult};
pub use types::{
    Dependency, FileRecord, Link, Package, PackageSource, ReleaseMetadata, SourceKind, Version,
    VersionConstraint, VersionError,
};
pub use utils::canonicalize_name;
