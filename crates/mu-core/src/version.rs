//! Firmware version ordering
//!
//! RouterOS release trains carry `alpha`/`beta` qualifiers inside the minor
//! segment (`7.15beta4`), which neither lexicographic nor semver ordering
//! handles. [`VersionKey`] turns such a string into a totally ordered key:
//!
//! ```
//! use mu_core::VersionKey;
//!
//! let alpha: VersionKey = "7.15alpha3".parse().unwrap();
//! let beta: VersionKey = "7.15beta1".parse().unwrap();
//! let release: VersionKey = "7.15".parse().unwrap();
//! assert!(alpha < beta && beta < release);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::VersionError;

/// Pre-release stage of a minor version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Alpha = -2,
    Beta = -1,
    Release = 0,
}

impl Stage {
    fn classify(word: &str) -> Self {
        let word = word.to_ascii_lowercase();
        if word.contains("alpha") {
            Stage::Alpha
        } else if word.contains("beta") {
            Stage::Beta
        } else {
            Stage::Release
        }
    }
}

/// Result of comparing an installed or candidate version against another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOrdering {
    Lower,
    EqualOrHigher,
}

/// Comparable key derived from a firmware version string
#[derive(Debug, Clone)]
pub struct VersionKey {
    major: u32,
    minor: u32,
    stage: Stage,
    tail: u32,
    patch: Option<u32>,
    raw: String,
}

impl VersionKey {
    /// Parse a version string such as `7.16`, `7.15.2` or `7.15beta4`
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(VersionError::Empty);
        }

        let mut segments = raw.split('.');
        let major = segments
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(|| VersionError::InvalidMajor(raw.to_string()))?;

        let (minor, stage, tail) = match segments.next() {
            Some(segment) => parse_minor(segment)
                .ok_or_else(|| VersionError::InvalidMinor(raw.to_string()))?,
            None => (0, Stage::Release, 0),
        };

        let patch = match segments.next() {
            Some(segment) => Some(
                segment
                    .parse::<u32>()
                    .map_err(|_| VersionError::InvalidPatch(raw.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            major,
            minor,
            stage,
            tail,
            patch,
            raw: raw.to_string(),
        })
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn patch(&self) -> Option<u32> {
        self.patch
    }

    /// Whether this is an alpha or beta build
    pub fn is_prerelease(&self) -> bool {
        self.stage != Stage::Release
    }

    // A missing patch orders as patch 0 so that equality stays transitive.
    fn sort_key(&self) -> (u32, u32, Stage, u32, u32) {
        (
            self.major,
            self.minor,
            self.stage,
            self.tail,
            self.patch.unwrap_or(0),
        )
    }
}

/// Split `15`, `15beta4` or `15rc1` into (minor, stage, tail number)
fn parse_minor(segment: &str) -> Option<(u32, Stage, u32)> {
    let digits_end = segment
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(segment.len());
    let (number, rest) = segment.split_at(digits_end);
    let minor = number.parse::<u32>().ok()?;

    if rest.is_empty() {
        return Some((minor, Stage::Release, 0));
    }
    if !rest.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let tail_start = rest
        .rfind(|c: char| !c.is_ascii_digit())
        .map_or(0, |i| i + 1);
    let tail = match &rest[tail_start..] {
        "" => 0,
        digits => digits.parse::<u32>().ok()?,
    };

    Some((minor, Stage::classify(rest), tail))
}

impl FromStr for VersionKey {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for VersionKey {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for VersionKey {}

impl PartialOrd for VersionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Compare `a` against `b`
pub fn compare(a: &str, b: &str) -> Result<VersionOrdering, VersionError> {
    let a = VersionKey::parse(a)?;
    let b = VersionKey::parse(b)?;
    Ok(if a < b {
        VersionOrdering::Lower
    } else {
        VersionOrdering::EqualOrHigher
    })
}

/// Returns true if `a` is strictly lower than `b`
pub fn is_lower(a: &str, b: &str) -> Result<bool, VersionError> {
    Ok(compare(a, b)? == VersionOrdering::Lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> VersionKey {
        VersionKey::parse(s).unwrap()
    }

    #[test]
    fn test_parse_release() {
        let v = key("7.16");
        assert_eq!(v.major(), 7);
        assert_eq!(v.minor(), 16);
        assert_eq!(v.stage(), Stage::Release);
        assert_eq!(v.patch(), None);
        assert!(!v.is_prerelease());
    }

    #[test]
    fn test_parse_patch() {
        let v = key("7.15.2");
        assert_eq!(v.minor(), 15);
        assert_eq!(v.patch(), Some(2));
    }

    #[test]
    fn test_parse_prerelease() {
        let v = key("7.15beta4");
        assert_eq!(v.minor(), 15);
        assert_eq!(v.stage(), Stage::Beta);
        assert!(v.is_prerelease());
        assert_eq!(key("7.15alpha3").stage(), Stage::Alpha);
        assert_eq!(key("7.15rc1").stage(), Stage::Release);
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(
            VersionKey::parse("x.15"),
            Err(VersionError::InvalidMajor("x.15".to_string()))
        );
        assert_eq!(VersionKey::parse(""), Err(VersionError::Empty));
        assert!(matches!(
            VersionKey::parse("7.beta"),
            Err(VersionError::InvalidMinor(_))
        ));
        assert!(matches!(
            VersionKey::parse("7.15.x"),
            Err(VersionError::InvalidPatch(_))
        ));
    }

    #[test]
    fn test_stage_ordering_ignores_suffix_magnitude() {
        assert!(key("7.15alpha99") < key("7.15beta1"));
        assert!(key("7.15beta99") < key("7.15"));
        assert!(key("7.15alpha3") < key("7.15beta1"));
        assert!(key("7.15beta1") < key("7.15"));
        assert!(key("7.15") < key("7.16"));
    }

    #[test]
    fn test_major_is_decisive() {
        assert!(key("6.49.10") < key("7.1"));
        assert!(key("10.0") > key("9.99"));
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        assert!(key("7.9") < key("7.10"));
        assert!(key("7.15beta9") < key("7.15beta10"));
    }

    #[test]
    fn test_missing_patch_is_zero() {
        assert_eq!(key("7.15"), key("7.15.0"));
        assert!(key("7.15") < key("7.15.1"));
        assert!(key("7.15.1") < key("7.15.2"));
    }

    #[test]
    fn test_compare_equal_or_higher() {
        assert_eq!(compare("7.15", "7.15").unwrap(), VersionOrdering::EqualOrHigher);
        assert_eq!(compare("7.16", "7.15").unwrap(), VersionOrdering::EqualOrHigher);
        assert_eq!(compare("7.15", "7.16").unwrap(), VersionOrdering::Lower);
        assert!(is_lower("7.15", "7.16").unwrap());
        assert!(!is_lower("7.16", "7.16").unwrap());
        assert!(is_lower("abc", "7.16").is_err());
    }

    #[test]
    fn test_order_is_antisymmetric_and_transitive() {
        let samples = [
            "6.48.6", "7.1", "7.9", "7.10", "7.15alpha3", "7.15beta1", "7.15beta9", "7.15",
            "7.15.0", "7.15.1", "7.16rc2", "7.16", "8.0beta1",
        ];
        let keys: Vec<VersionKey> = samples.iter().map(|s| key(s)).collect();

        for a in &keys {
            assert_eq!(a.cmp(a), Ordering::Equal);
            for b in &keys {
                assert_eq!(a.cmp(b), b.cmp(a).reverse(), "{a} vs {b}");
                for c in &keys {
                    if a <= b && b <= c {
                        assert!(a <= c, "{a} <= {b} <= {c}");
                    }
                }
            }
        }
    }
}
