//! Version comparison for installed packages.
//!
//! Two numbering schemes are understood: dotted numeric assembly versions
//! (`1.2.3.4`) and semantic versions (`1.2.3-beta.1+build`). Assembly versions
//! are tried first because they are the common case for installer metadata.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A version numbering scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Dotted numeric, two to four components.
    Assembly,
    /// Semantic versioning 2.0.
    Semantic,
}

/// Outcome of comparing a candidate version against an installed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Candidate is older than or equal to the installed version.
    LessOrEqual,
    /// Candidate is strictly newer.
    Greater,
    /// At least one of the two strings could not be parsed.
    Unparseable,
}

impl From<Ordering> for Comparison {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Greater => Comparison::Greater,
            Ordering::Less | Ordering::Equal => Comparison::LessOrEqual,
        }
    }
}

/// Dotted numeric version: `major.minor[.build[.revision]]`.
///
/// Absent trailing components sort before present ones, so `1.0 < 1.0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssemblyVersion {
    pub major: u32,
    pub minor: u32,
    pub build: Option<u32>,
    pub revision: Option<u32>,
}

/// Error returned when a string is not a valid assembly version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAssemblyVersionError(String);

impl fmt::Display for ParseAssemblyVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid assembly version: {:?}", self.0)
    }
}

impl std::error::Error for ParseAssemblyVersionError {}

impl FromStr for AssemblyVersion {
    type Err = ParseAssemblyVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseAssemblyVersionError(s.to_string());

        let parts = s
            .split('.')
            .map(parse_component)
            .collect::<Option<Vec<u32>>>()
            .ok_or_else(err)?;

        match parts.as_slice() {
            [major, minor] => Ok(Self {
                major: *major,
                minor: *minor,
                build: None,
                revision: None,
            }),
            [major, minor, build] => Ok(Self {
                major: *major,
                minor: *minor,
                build: Some(*build),
                revision: None,
            }),
            [major, minor, build, revision] => Ok(Self {
                major: *major,
                minor: *minor,
                build: Some(*build),
                revision: Some(*revision),
            }),
            _ => Err(err()),
        }
    }
}

/// Components are unsigned decimal integers no larger than `i32::MAX`.
fn parse_component(part: &str) -> Option<u32> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse::<u32>().ok().filter(|n| *n <= i32::MAX as u32)
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{}", build)?;
        }
        if let Some(revision) = self.revision {
            write!(f, ".{}", revision)?;
        }
        Ok(())
    }
}

/// Version comparator - pure functions over version strings.
pub struct VersionComparator;

impl VersionComparator {
    /// Compare `candidate` against `installed` under a single scheme.
    pub fn compare(scheme: Scheme, candidate: &str, installed: &str) -> Comparison {
        let ordering = match scheme {
            Scheme::Assembly => Self::compare_assembly(candidate, installed),
            Scheme::Semantic => Self::compare_semantic(candidate, installed),
        };
        ordering.map_or(Comparison::Unparseable, Comparison::from)
    }

    /// Compare using assembly versions first and semantic versions only if
    /// either string is not an assembly version.
    pub fn resolve(candidate: &str, installed: &str) -> Comparison {
        match Self::compare(Scheme::Assembly, candidate, installed) {
            Comparison::Unparseable => Self::compare(Scheme::Semantic, candidate, installed),
            parsed => parsed,
        }
    }

    fn compare_assembly(candidate: &str, installed: &str) -> Option<Ordering> {
        let candidate = candidate.parse::<AssemblyVersion>().ok()?;
        let installed = installed.parse::<AssemblyVersion>().ok()?;
        Some(candidate.cmp(&installed))
    }

    fn compare_semantic(candidate: &str, installed: &str) -> Option<Ordering> {
        let candidate = semver::Version::parse(candidate).ok()?;
        let installed = semver::Version::parse(installed).ok()?;
        Some(semver_precedence(&candidate, &installed))
    }
}

/// SemVer precedence: build metadata does not participate.
fn semver_precedence(a: &semver::Version, b: &semver::Version) -> Ordering {
    (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
}
