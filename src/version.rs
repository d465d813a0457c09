//! Loose version parsing and the conservative range-greater comparison.
//!
//! Release tags ("10.0", "snapshot_20211225") and the version strings clangd
//! reports about itself ("Ubuntu clangd version 13.0.0-2~ubuntu20.04") are
//! rarely strict semver, so everything here is parsed as a *range*: a version
//! with missing components stands for every concrete version it could be.
//! An upgrade is only signaled when the released range is unambiguously newer
//! than the installed one.

use crate::error::{InstallerError, Result};
use crate::github::Release;
use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;
use std::fmt;
use std::path::Path;

/// Minimum glibc required by the upstream Linux binaries.
pub const MIN_GLIBC: &str = "2.18";

/// Literal marker clangd prints in its `--version` output.
const VERSION_MARKER: &str = "clangd version ";

/// Vendors whose clangd builds carry version numbers that do not track
/// upstream releases, so comparing against upstream tags is meaningless.
const INCOMPARABLE_VENDORS: &[&str] = &["apple"];

static RANGE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?").unwrap());

// Word-boundary anchored so digits embedded in a longer word, like the date
// in "snapshot_20201231", are not mistaken for a version.
static SEARCH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bv?(\d+)(?:\.(\d+))?(?:\.(\d+))?").unwrap());

static GLIBC_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)glibc\D*(\d+(?:\.\d+)+)").unwrap());

/// A loose semantic-version range. `15` means "any 15.x.y", `15.0` means
/// "any 15.0.y", and `15.0.6` is the single version 15.0.6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    major: u64,
    minor: Option<u64>,
    patch: Option<u64>,
}

impl VersionRange {
    pub fn parse(s: &str) -> Result<Self> {
        let caps = RANGE_REGEX
            .captures(s.trim())
            .ok_or_else(|| InstallerError::UnparseableVersion(s.trim().to_string()))?;
        Self::from_captures(&caps, s.trim())
    }

    /// Find a version token anywhere in free-form text, e.g. a release
    /// display name like "clangd 11.0.0".
    pub fn search(text: &str) -> Result<Self> {
        let caps = SEARCH_REGEX
            .captures(text)
            .ok_or_else(|| InstallerError::UnparseableVersion(text.trim().to_string()))?;
        Self::from_captures(&caps, text.trim())
    }

    fn from_captures(caps: &regex::Captures<'_>, source: &str) -> Result<Self> {
        let number = |i: usize| -> Result<Option<u64>> {
            caps.get(i)
                .map(|m| m.as_str().parse())
                .transpose()
                .map_err(|_| InstallerError::UnparseableVersion(source.to_string()))
        };
        Ok(VersionRange {
            major: number(1)?
                .ok_or_else(|| InstallerError::UnparseableVersion(source.to_string()))?,
            minor: number(2)?,
            patch: number(3)?,
        })
    }

    /// The smallest concrete version satisfying this range.
    pub fn min_version(&self) -> Version {
        Version::new(self.major, self.minor.unwrap_or(0), self.patch.unwrap_or(0))
    }

    /// The first concrete version above every version satisfying this range.
    fn upper_bound(&self) -> Version {
        match (self.minor, self.patch) {
            (Some(minor), Some(patch)) => Version::new(self.major, minor, patch + 1),
            (Some(minor), None) => Version::new(self.major, minor + 1, 0),
            (None, _) => Version::new(self.major + 1, 0, 0),
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.major)?;
        if let Some(minor) = self.minor {
            write!(f, ".{minor}")?;
            if let Some(patch) = self.patch {
                write!(f, ".{patch}")?;
            }
        }
        Ok(())
    }
}

/// True when the minimum version satisfying `newer` sits strictly above every
/// version satisfying `older`. Ambiguous overlaps compare as "not greater".
pub fn range_greater(newer: &VersionRange, older: &VersionRange) -> bool {
    newer.min_version() >= older.upper_bound()
}

/// Version a release advertises, preferring the tag over the display name.
pub fn released(release: &Release) -> Result<VersionRange> {
    VersionRange::parse(&release.tag_name)
        .or_else(|_| VersionRange::search(&release.name))
        .map_err(|_| {
            InstallerError::UnparseableVersion(format!(
                "release '{}' (tag '{}')",
                release.name, release.tag_name
            ))
        })
}

/// Version an installed clangd reports about itself.
pub async fn installed(clangd: &Path) -> Result<VersionRange> {
    let output = tokio::process::Command::new(clangd)
        .arg("--version")
        .output()
        .await?;
    parse_version_output(&String::from_utf8_lossy(&output.stdout))
}

fn parse_version_output(output: &str) -> Result<VersionRange> {
    let marker = output
        .find(VERSION_MARKER)
        .ok_or_else(|| InstallerError::UnparseableVersion(output.trim().to_string()))?;

    // Text before the marker is a vendor label, e.g.
    // "Ubuntu clangd version 13.0.0-2~ubuntu20.04".
    let vendor = output[..marker].trim();
    if !vendor.is_empty() {
        let label = vendor.to_lowercase();
        if INCOMPARABLE_VENDORS.iter().any(|v| label.contains(v)) {
            return Err(InstallerError::IncomparableVersion {
                vendor: vendor.to_string(),
                output: output.trim().to_string(),
            });
        }
    }

    // Take the version up to the first whitespace or '~', stripping vendor
    // patch suffixes.
    let rest = &output[marker + VERSION_MARKER.len()..];
    let raw = rest
        .split(|c: char| c.is_whitespace() || c == '~')
        .next()
        .unwrap_or("");
    VersionRange::parse(raw)
}

#[derive(Debug, Clone)]
pub struct UpgradeCheck {
    pub old: VersionRange,
    pub new: VersionRange,
    pub upgrade_available: bool,
}

/// Decide whether `release` is a genuine upgrade over the binary at `clangd`.
pub async fn upgrade(release: &Release, clangd: &Path) -> Result<UpgradeCheck> {
    let new = released(release)?;
    let old = installed(clangd).await?;
    let upgrade_available = range_greater(&new, &old);
    tracing::debug!(%old, %new, upgrade_available, "compared clangd versions");
    Ok(UpgradeCheck {
        old,
        new,
        upgrade_available,
    })
}

/// Detected glibc version, if it is confidently older than `min`.
///
/// Returns `None` when the probe fails, its first line does not look like a
/// glibc banner, or the detected version is new enough. An inconclusive probe
/// never blocks installation.
pub async fn old_glibc(probe: &[String], min: &VersionRange) -> Option<VersionRange> {
    let (cmd, args) = probe.split_first()?;
    let output = tokio::process::Command::new(cmd)
        .args(args)
        .output()
        .await
        .ok()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let found = parse_glibc_line(stdout.lines().next()?)?;
    range_greater(min, &found).then_some(found)
}

fn parse_glibc_line(line: &str) -> Option<VersionRange> {
    let caps = GLIBC_REGEX.captures(line)?;
    VersionRange::parse(&caps[1]).ok()
}
