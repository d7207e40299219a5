//! PEP 440-flavored version type.
//!
//! Python package indexes publish versions such as `1.2.3`, `4.0a1`,
//! `2.0.post1` or `1!1.0.dev2`. This module provides parsing, canonical
//! display and total ordering for that scheme. Trailing zero release
//! segments are insignificant, so `1.0` and `1.0.0` compare equal.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)^
          v?
          (?:(?P<epoch>\d+)!)?
          (?P<release>\d+(?:\.\d+)*)
          (?:[-_.]?(?P<pre_tag>alpha|a|beta|b|preview|pre|rc|c)[-_.]?(?P<pre_n>\d+)?)?
          (?P<post>-(?P<post_n1>\d+)|[-_.]?(?:post|rev|r)[-_.]?(?P<post_n2>\d+)?)?
          (?P<dev>[-_.]?dev[-_.]?(?P<dev_n>\d+)?)?
          (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
        $",
    )
    .expect("version pattern")
});

/// Pre-release phase, ordered alpha < beta < release candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreTag {
    Alpha,
    Beta,
    ReleaseCandidate,
}

impl PreTag {
    fn from_label(label: &str) -> Self {
        match label {
            "a" | "alpha" => PreTag::Alpha,
            "b" | "beta" => PreTag::Beta,
            // "c", "rc", "pre" and "preview" all normalize to rc
            _ => PreTag::ReleaseCandidate,
        }
    }

    /// Canonical spelling used by `Display`
    pub fn label(&self) -> &'static str {
        match self {
            PreTag::Alpha => "a",
            PreTag::Beta => "b",
            PreTag::ReleaseCandidate => "rc",
        }
    }
}

/// A parsed package version
#[derive(Debug, Clone)]
pub struct Version {
    pub epoch: u64,
    pub release: Vec<u64>,
    pub pre: Option<(PreTag, u64)>,
    pub post: Option<u64>,
    pub dev: Option<u64>,
    pub local: Option<String>,
}

/// Version parsing and validation errors
#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Invalid version format: {input}")]
    InvalidFormat { input: String },

    #[error("Invalid number in version: {component}")]
    InvalidNumber { component: String },

    #[error("Invalid version constraint: {constraint}")]
    InvalidConstraint { constraint: String },
}

fn parse_number(component: &str) -> Result<u64, VersionError> {
    component.parse().map_err(|_| VersionError::InvalidNumber {
        component: component.to_string(),
    })
}

impl Version {
    /// Parse a version string
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        text.parse()
    }

    /// Build a plain release version from its segments
    pub fn from_release(release: Vec<u64>) -> Self {
        Self {
            epoch: 0,
            release,
            pre: None,
            post: None,
            dev: None,
            local: None,
        }
    }

    /// A version is unstable when it carries a pre-release or dev segment
    pub fn is_unstable(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    /// Release segments with insignificant trailing zeroes removed
    fn trimmed_release(&self) -> &[u64] {
        let mut len = self.release.len();
        while len > 1 && self.release[len - 1] == 0 {
            len -= 1;
        }
        &self.release[..len]
    }

    // Pre-release key: a bare dev release sorts before any pre-release of
    // the same release, a final release sorts after all of them.
    fn pre_key(&self) -> (u8, u8, u64) {
        match self.pre {
            Some((tag, n)) => (1, tag as u8 + 1, n),
            None if self.post.is_none() && self.dev.is_some() => (0, 0, 0),
            None => (2, 0, 0),
        }
    }

    fn post_key(&self) -> (u8, u64) {
        match self.post {
            Some(n) => (1, n),
            None => (0, 0),
        }
    }

    fn dev_key(&self) -> (u8, u64) {
        match self.dev {
            Some(n) => (0, n),
            None => (1, 0),
        }
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim().to_lowercase();
        let caps = VERSION_RE
            .captures(&input)
            .ok_or_else(|| VersionError::InvalidFormat {
                input: s.trim().to_string(),
            })?;

        let epoch = match caps.name("epoch") {
            Some(m) => parse_number(m.as_str())?,
            None => 0,
        };

        let mut release = Vec::new();
        for part in caps["release"].split('.') {
            release.push(parse_number(part)?);
        }

        let pre = match caps.name("pre_tag") {
            Some(tag) => {
                let n = match caps.name("pre_n") {
                    Some(m) => parse_number(m.as_str())?,
                    None => 0,
                };
                Some((PreTag::from_label(tag.as_str()), n))
            },
            None => None,
        };

        let post = if caps.name("post").map_or(false, |m| !m.as_str().is_empty()) {
            let n = match caps.name("post_n1").or_else(|| caps.name("post_n2")) {
                Some(m) => parse_number(m.as_str())?,
                None => 0,
            };
            Some(n)
        } else {
            None
        };

        let dev = if caps.name("dev").map_or(false, |m| !m.as_str().is_empty()) {
            let n = match caps.name("dev_n") {
                Some(m) => parse_number(m.as_str())?,
                None => 0,
            };
            Some(n)
        } else {
            None
        };

        let local = caps.name("local").map(|m| m.as_str().to_string());

        Ok(Version {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }

        let release: Vec<String> = self.release.iter().map(u64::to_string).collect();
        write!(f, "{}", release.join("."))?;

        if let Some((tag, n)) = self.pre {
            write!(f, "{}{}", tag.label(), n)?;
        }

        if let Some(n) = self.post {
            write!(f, ".post{n}")?;
        }

        if let Some(n) = self.dev {
            write!(f, ".dev{n}")?;
        }

        if let Some(ref local) = self.local {
            write!(f, "+{local}")?;
        }

        Ok(())
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| self.trimmed_release().cmp(other.trimmed_release()))
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| self.post_key().cmp(&other.post_key()))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
            .then_with(|| self.local.cmp(&other.local))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Equality must agree with the ordering, so `1.0` == `1.0.0`
impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.epoch.hash(state);
        self.trimmed_release().hash(state);
        self.pre_key().hash(state);
        self.post_key().hash(state);
        self.dev_key().hash(state);
        self.local.hash(state);
    }
}

// Versions are cached as their canonical string representation
impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_release() {
        let v = Version::parse("1.2.3").unwrap();
        assert_eq!(v.epoch, 0);
        assert_eq!(v.release, vec![1, 2, 3]);
        assert_eq!(v.pre, None);
        assert!(!v.is_unstable());
    }

    #[test]
    fn test_parse_two_segment_release() {
        let v = Version::parse("2.1").unwrap();
        assert_eq!(v.release, vec![2, 1]);
    }

    #[test]
    fn test_parse_prerelease() {
        let v = Version::parse("4.0a1").unwrap();
        assert_eq!(v.release, vec![4, 0]);
        assert_eq!(v.pre, Some((PreTag::Alpha, 1)));
        assert!(v.is_unstable());

        let v = Version::parse("1.0rc2").unwrap();
        assert_eq!(v.pre, Some((PreTag::ReleaseCandidate, 2)));

        // alternate spellings normalize
        let v = Version::parse("1.0-beta.3").unwrap();
        assert_eq!(v.pre, Some((PreTag::Beta, 3)));
    }

    #[test]
    fn test_parse_post_dev_epoch_local() {
        let v = Version::parse("1.0.post1").unwrap();
        assert_eq!(v.post, Some(1));
        assert!(!v.is_unstable());

        let v = Version::parse("1.0.dev2").unwrap();
        assert_eq!(v.dev, Some(2));
        assert!(v.is_unstable());

        let v = Version::parse("1!2.0").unwrap();
        assert_eq!(v.epoch, 1);

        let v = Version::parse("1.0+cpu.1").unwrap();
        assert_eq!(v.local.as_deref(), Some("cpu.1"));
    }

    #[test]
    fn test_invalid_versions() {
        assert!(Version::parse("not-a-version").is_err());
        assert!(Version::parse("").is_err());
        assert!(Version::parse("1.0.oops").is_err());
    }

    #[test]
    fn test_trailing_zeroes_are_insignificant() {
        let short = Version::parse("1.0").unwrap();
        let long = Version::parse("1.0.0").unwrap();

        assert_eq!(short, long);

        use std::collections::HashSet;
        let mut seen = HashSet::new();
        seen.insert(short);
        assert!(!seen.insert(long));
    }

    #[test]
    fn test_ordering() {
        let parse = |s: &str| Version::parse(s).unwrap();

        assert!(parse("1.9") < parse("2.1"));
        assert!(parse("4.0a1") < parse("4.0"));
        assert!(parse("4.0a1") < parse("4.0b1"));
        assert!(parse("1.0.dev1") < parse("1.0a1"));
        assert!(parse("1.0a1.dev1") < parse("1.0a1"));
        assert!(parse("1.0") < parse("1.0.post1"));
        assert!(parse("2.0") < parse("1!1.0"));
    }

    #[test]
    fn test_display_canonical() {
        let cases = [
            ("1.2.3", "1.2.3"),
            ("4.0A1", "4.0a1"),
            ("1.0-preview2", "1.0rc2"),
            ("1.0.post1", "1.0.post1"),
            ("1!1.0.dev2", "1!1.0.dev2"),
        ];

        for (input, expected) in cases {
            assert_eq!(Version::parse(input).unwrap().to_string(), expected);
        }
    }

    #[test]
    fn test_serde_round_trip() {
        let v = Version::parse("4.0a1").unwrap();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"4.0a1\"");

        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn version_round_trip(
            epoch in 0u64..10,
            release in prop::collection::vec(0u64..1000, 1..4),
            pre in prop::option::of((0u8..3, 0u64..50)),
            post in prop::option::of(0u64..50),
            dev in prop::option::of(0u64..50),
        ) {
            let pre = pre.map(|(tag, n)| {
                let tag = match tag {
                    0 => PreTag::Alpha,
                    1 => PreTag::Beta,
                    _ => PreTag::ReleaseCandidate,
                };
                (tag, n)
            });

            let original = Version { epoch, release, pre, post, dev, local: None };
            let parsed = Version::parse(&original.to_string()).unwrap();

            prop_assert_eq!(&parsed, &original);
            prop_assert_eq!(parsed.to_string(), original.to_string());
        }
    }

    proptest! {
        #[test]
        fn ordering_is_transitive(
            a in prop::collection::vec(0u64..20, 1..4),
            b in prop::collection::vec(0u64..20, 1..4),
            c in prop::collection::vec(0u64..20, 1..4),
        ) {
            let a = Version::from_release(a);
            let b = Version::from_release(b);
            let c = Version::from_release(c);

            if a < b && b < c {
                prop_assert!(a < c);
            }
        }
    }
}
