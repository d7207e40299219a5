//! Utility helpers shared across Harbor crates.

/// Canonicalize a package name for index lookups: lower-case, dots become
/// hyphens. The result is the path segment fetched from an index
/// (`{base}/{canonical-name}/`).
pub fn canonicalize_name(name: &str) -> String {
    name.to_lowercase().replace('.', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_name() {
        assert_eq!(canonicalize_name("Flask"), "flask");
        assert_eq!(canonicalize_name("zope.interface"), "zope-interface");
        assert_eq!(canonicalize_name("ruamel.yaml.clib"), "ruamel-yaml-clib");
        assert_eq!(canonicalize_name("requests"), "requests");
    }
}
