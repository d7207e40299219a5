//! Version constraints.
//!
//! A constraint is either `Any` (`*`) or a comma-separated AND-list of
//! comparators (`>=2.0,<3.0`, `^1.2`, `==4.0a1`, ...). Constraints decide
//! which releases a dependency accepts; the canonical `Display` form is
//! also used as part of cache keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::version::{Version, VersionError};

/// Comparison operator for version constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Exact,     // ==1.0.0
    NotEqual,  // !=1.0.0
    Greater,   // >1.0.0
    GreaterEq, // >=1.0.0
    Less,      // <1.0.0
    LessEq,    // <=1.0.0
    Caret,     // ^1.0.0
    Tilde,     // ~1.0.0
}

impl Op {
    fn symbol(&self) -> &'static str {
        match self {
            Op::Exact => "==",
            Op::NotEqual => "!=",
            Op::Greater => ">",
            Op::GreaterEq => ">=",
            Op::Less => "<",
            Op::LessEq => "<=",
            Op::Caret => "^",
            Op::Tilde => "~",
        }
    }
}

/// Individual version comparator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparator {
    pub op: Op,
    pub version: Version,
}

/// Predicate over versions describing which releases a dependency accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionConstraint {
    Any,
    Comparators(Vec<Comparator>),
}

impl VersionConstraint {
    /// The constraint that allows every version
    pub fn any() -> Self {
        VersionConstraint::Any
    }

    /// Parse a constraint string; `*` and the empty string mean "any"
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        text.parse()
    }

    pub fn is_any(&self) -> bool {
        matches!(self, VersionConstraint::Any)
    }

    /// Does this constraint allow the given version?
    pub fn allows(&self, version: &Version) -> bool {
        match self {
            VersionConstraint::Any => true,
            VersionConstraint::Comparators(comparators) => {
                comparators.iter().all(|c| c.matches(version))
            },
        }
    }

    /// True when a stated range boundary is itself an unstable version.
    ///
    /// A range explicitly bounded by a prerelease (e.g. `>=2.0b1`) must
    /// permit prereleases even when the caller did not opt in.
    pub fn has_unstable_bound(&self) -> bool {
        match self {
            VersionConstraint::Any => false,
            VersionConstraint::Comparators(comparators) => comparators.iter().any(|c| {
                !matches!(c.op, Op::Exact | Op::NotEqual) && c.version.is_unstable()
            }),
        }
    }
}

impl Comparator {
    /// Check if a version matches this comparator
    pub fn matches(&self, version: &Version) -> bool {
        match self.op {
            Op::Exact => version == &self.version,
            Op::NotEqual => version != &self.version,
            Op::Greater => version > &self.version,
            Op::GreaterEq => version >= &self.version,
            Op::Less => version < &self.version,
            Op::LessEq => version <= &self.version,
            Op::Caret => version >= &self.version && version < &self.caret_upper(),
            Op::Tilde => version >= &self.version && version < &self.tilde_upper(),
        }
    }

    // ^1.2.3 -> <2.0.0, ^0.2.3 -> <0.3.0, ^0.0 -> <0.1
    fn caret_upper(&self) -> Version {
        let mut upper = self.version.release.clone();
        match upper.iter().position(|&n| n != 0) {
            Some(i) => {
                upper.truncate(i + 1);
                upper[i] += 1;
            },
            None => {
                let last = upper.len() - 1;
                upper[last] += 1;
            },
        }

        Version::from_release(upper)
    }

    // ~1.2.3 -> <1.3.0, ~1.2 -> <1.3, ~1 -> <2
    fn tilde_upper(&self) -> Version {
        let release = &self.version.release;
        let idx = if release.len() == 1 { 0 } else { 1 };
        let mut upper = release[..=idx].to_vec();
        upper[idx] += 1;

        Version::from_release(upper)
    }
}

impl FromStr for VersionConstraint {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() || input == "*" {
            return Ok(VersionConstraint::Any);
        }

        let mut comparators = Vec::new();
        for part in input.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(VersionError::InvalidConstraint {
                    constraint: s.to_string(),
                });
            }

            let (op, rest) = if let Some(rest) = part.strip_prefix("==") {
                (Op::Exact, rest)
            } else if let Some(rest) = part.strip_prefix("!=") {
                (Op::NotEqual, rest)
            } else if let Some(rest) = part.strip_prefix(">=") {
                (Op::GreaterEq, rest)
            } else if let Some(rest) = part.strip_prefix("<=") {
                (Op::LessEq, rest)
            } else if let Some(rest) = part.strip_prefix('>') {
                (Op::Greater, rest)
            } else if let Some(rest) = part.strip_prefix('<') {
                (Op::Less, rest)
            } else if let Some(rest) = part.strip_prefix('^') {
                (Op::Caret, rest)
            } else if let Some(rest) = part.strip_prefix("~=") {
                (Op::Tilde, rest)
            } else if let Some(rest) = part.strip_prefix('~') {
                (Op::Tilde, rest)
            } else if let Some(rest) = part.strip_prefix('=') {
                (Op::Exact, rest)
            } else {
                (Op::Exact, part)
            };

            let version = Version::parse(rest.trim())?;
            comparators.push(Comparator { op, version });
        }

        Ok(VersionConstraint::Comparators(comparators))
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Any => write!(f, "*"),
            VersionConstraint::Comparators(comparators) => {
                let parts: Vec<String> = comparators
                    .iter()
                    .map(|c| format!("{}{}", c.op.symbol(), c.version))
                    .collect();
                write!(f, "{}", parts.join(","))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_any() {
        assert!(VersionConstraint::parse("*").unwrap().is_any());
        assert!(VersionConstraint::parse("").unwrap().is_any());
        assert!(VersionConstraint::parse("  ").unwrap().is_any());
    }

    #[test]
    fn test_range_constraint() {
        let constraint = VersionConstraint::parse(">=2.0").unwrap();

        assert!(!constraint.is_any());
        assert!(constraint.allows(&version("2.1")));
        assert!(constraint.allows(&version("2.0")));
        assert!(!constraint.allows(&version("1.9")));
    }

    #[test]
    fn test_compound_constraint() {
        let constraint = VersionConstraint::parse(">=1.0, <2.0").unwrap();

        assert!(constraint.allows(&version("1.5")));
        assert!(!constraint.allows(&version("2.0")));
        assert!(!constraint.allows(&version("0.9")));
    }

    #[test]
    fn test_exact_and_not_equal() {
        let exact = VersionConstraint::parse("==1.2").unwrap();
        assert!(exact.allows(&version("1.2.0")));
        assert!(!exact.allows(&version("1.2.5")));

        let not_equal = VersionConstraint::parse("!=1.2").unwrap();
        assert!(!not_equal.allows(&version("1.2")));
        assert!(not_equal.allows(&version("1.3")));
    }

    #[test]
    fn test_caret() {
        let constraint = VersionConstraint::parse("^1.2.3").unwrap();
        assert!(constraint.allows(&version("1.2.3")));
        assert!(constraint.allows(&version("1.9.0")));
        assert!(!constraint.allows(&version("2.0.0")));
        assert!(!constraint.allows(&version("1.2.2")));

        let zero_major = VersionConstraint::parse("^0.2.3").unwrap();
        assert!(zero_major.allows(&version("0.2.9")));
        assert!(!zero_major.allows(&version("0.3.0")));
    }

    #[test]
    fn test_tilde() {
        let constraint = VersionConstraint::parse("~1.2.3").unwrap();
        assert!(constraint.allows(&version("1.2.9")));
        assert!(!constraint.allows(&version("1.3.0")));

        let major_only = VersionConstraint::parse("~1").unwrap();
        assert!(major_only.allows(&version("1.9")));
        assert!(!major_only.allows(&version("2.0")));
    }

    #[test]
    fn test_unstable_bounds() {
        assert!(VersionConstraint::parse(">=2.0b1").unwrap().has_unstable_bound());
        assert!(VersionConstraint::parse("<1.0a1").unwrap().has_unstable_bound());
        assert!(!VersionConstraint::parse(">=2.0").unwrap().has_unstable_bound());
        // an exact pin is not a range boundary
        assert!(!VersionConstraint::parse("==2.0b1").unwrap().has_unstable_bound());
        assert!(!VersionConstraint::any().has_unstable_bound());
    }

    #[test]
    fn test_display_is_canonical() {
        assert_eq!(VersionConstraint::any().to_string(), "*");
        assert_eq!(
            VersionConstraint::parse(">=1.0, <2.0").unwrap().to_string(),
            ">=1.0,<2.0"
        );
        assert_eq!(VersionConstraint::parse("1.2.3").unwrap().to_string(), "==1.2.3");
    }

    #[test]
    fn test_invalid_constraint() {
        assert!(VersionConstraint::parse(">=not.a.version").is_err());
        assert!(VersionConstraint::parse(">=1.0,,<2.0").is_err());
    }
}
