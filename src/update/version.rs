//! Semantic version parsing for release tags and the running build
//!
//! Tags may carry a leading `v`. Unreleased builds report the literal `dev`,
//! which parses to [`DEV_BASELINE`] so that any published release is newer.
//! Ordering follows semver precedence: build metadata never takes part in a
//! comparison.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::error::ParseError;

/// Build tag reported by unreleased builds.
pub const DEV_VERSION: &str = "dev";

/// Version assigned to `dev` builds.
pub const DEV_BASELINE: &str = "0.0.1";

/// A successfully parsed semantic version.
#[derive(Debug, Clone)]
pub struct Version(semver::Version);

impl Version {
    /// Parse a version string, stripping a leading `v`.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let trimmed = raw.strip_prefix('v').unwrap_or(raw);
        let trimmed = if trimmed == DEV_VERSION {
            DEV_BASELINE
        } else {
            trimmed
        };

        semver::Version::parse(trimmed)
            .map(Self)
            .map_err(|source| ParseError {
                raw: raw.to_owned(),
                source,
            })
    }

    /// Semver precedence: major, minor, patch, then pre-release.
    pub fn compare(&self, other: &Self) -> Ordering {
        let (a, b) = (&self.0, &other.0);
        (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
    }

    pub fn as_semver(&self) -> &semver::Version {
        &self.0
    }
}

/// Free-function form of [`Version::parse`].
pub fn parse(raw: &str) -> Result<Version, ParseError> {
    Version::parse(raw)
}

/// Free-function form of [`Version::compare`].
pub fn compare(a: &Version, b: &Version) -> Ordering {
    a.compare(b)
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl FromStr for Version {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
