//! Error types and result aliases for Harbor operations.
//!
//! Provides a unified error type that covers all error conditions
//! across the Harbor crates with actionable error messages.

use thiserror::Error;

use crate::types::VersionError;

/// Unified error type for all Harbor operations
#[derive(Error, Debug)]
pub enum HarborError {
    // Resolution errors
    #[error("Package '{name}' not found{}", version_suffix(.version))]
    PackageNotFound {
        name: String,
        version: Option<String>,
    },

    /// A repository answered with an unexpected HTTP status, or the
    /// transport itself failed (DNS, connection refused, ...).
    #[error("Repository error for {url}: {message}")]
    Repository {
        url: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Configuration errors (reserved names, duplicate default, unknown
    // named repository)
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Cache errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Version(#[from] VersionError),
}

fn version_suffix(version: &Option<String>) -> String {
    match version {
        Some(version) => format!(" at version '{version}'"),
        None => String::new(),
    }
}

/// Result type alias for Harbor operations
pub type HarborResult<T> = Result<T, HarborError>;

impl HarborError {
    /// Create a not-found error for a package name
    pub fn package_not_found(name: impl Into<String>) -> Self {
        Self::PackageNotFound {
            name: name.into(),
            version: None,
        }
    }

    /// Create a not-found error naming both package and version
    pub fn release_not_found(name: impl Into<String>, version: impl ToString) -> Self {
        Self::PackageNotFound {
            name: name.into(),
            version: Some(version.to_string()),
        }
    }

    /// Create a repository error wrapping an underlying failure
    pub fn repository<E>(url: impl Into<String>, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Repository {
            url: url.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Check if this error is recoverable by retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(self, HarborError::Repository { .. } | HarborError::Io { .. })
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            HarborError::PackageNotFound { .. } => {
                Some("Check the package name spelling or the configured package indexes")
            },
            HarborError::Repository { .. } => {
                Some("Check your internet connection and the index URL, then try again")
            },
            HarborError::Config { .. } => Some("Review the repository configuration"),
            _ => None,
        }
    }
}
