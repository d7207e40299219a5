//! Core data types for Harbor source resolution.
//!
//! This module provides the fundamental types used throughout Harbor:
//! - Version and constraint types for release filtering
//! - Dependency and Package structures
//! - Link references to downloadable artifacts

pub mod constraint;
pub mod dependency;
pub mod link;
pub mod package;
pub mod version;

// Re-export all public types
pub use constraint::{Comparator, Op, VersionConstraint};
pub use dependency::Dependency;
pub use link::Link;
pub use package::{FileRecord, Package, PackageSource, ReleaseMetadata, SourceKind};
pub use version::{PreTag, Version, VersionError};
