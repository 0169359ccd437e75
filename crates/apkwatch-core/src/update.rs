use chrono::NaiveDateTime;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::CheckError;

/// Latest available update of one application for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestUpdate {
    pub download_url: String,
    pub version: String,
    pub publish_date: Option<String>,
    pub file_size_bytes: Option<u64>,
    pub file_hash: Option<String>,
    pub first_release_has_assets: bool,
}

impl LatestUpdate {
    /// Start an update record; the URL must be an absolute http(s) URL.
    ///
    /// # Errors
    /// Returns [`CheckError::InvalidDownloadUrl`] for anything else.
    pub fn new(
        download_url: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, CheckError> {
        let download_url = download_url.into();
        validate_download_url(&download_url)?;
        Ok(Self {
            download_url,
            version: version.into(),
            publish_date: None,
            file_size_bytes: None,
            file_hash: None,
            first_release_has_assets: true,
        })
    }

    #[must_use]
    pub fn published(mut self, publish_date: Option<String>) -> Self {
        self.publish_date = publish_date;
        self
    }

    #[must_use]
    pub fn size(mut self, file_size_bytes: Option<u64>) -> Self {
        self.file_size_bytes = file_size_bytes;
        self
    }

    #[must_use]
    pub fn hash(mut self, file_hash: Option<String>) -> Self {
        self.file_hash = file_hash;
        self
    }

    #[must_use]
    pub fn first_release_has_assets(mut self, value: bool) -> Self {
        self.first_release_has_assets = value;
        self
    }
}

fn validate_download_url(url: &str) -> Result<(), CheckError> {
    let invalid = |details: String| CheckError::InvalidDownloadUrl {
        url: url.to_string(),
        details,
    };
    let parsed = reqwest::Url::parse(url).map_err(|error| invalid(error.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme `{}`", parsed.scheme())));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(())
}

/// Strip a single leading `v`/`V` from a release tag.
#[must_use]
pub fn strip_version_prefix(tag: &str) -> &str {
    tag.strip_prefix(['v', 'V']).unwrap_or(tag)
}

/// Format of versions derived from a build time, for rolling builds.
pub(crate) const TIMESTAMP_VERSION_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Whether `latest` is strictly newer than `current`.
///
/// Semver-like versions, build timestamps and dotted numeric versions with an
/// optional numeric revision (`112.0.5615.137-1`) are compared by value.
/// Versions of any other shape only count as newer when they differ.
#[must_use]
pub fn is_newer_version(latest: &str, current: &str) -> bool {
    let latest = strip_version_prefix(latest);
    let current = strip_version_prefix(current);
    if let (Some(latest), Some(current)) = (parse_semver(latest), parse_semver(current)) {
        return latest > current;
    }
    if let (Some(latest), Some(current)) = (parse_build_time(latest), parse_build_time(current)) {
        return latest > current;
    }
    if let (Some(latest), Some(current)) =
        (DottedVersion::parse(latest), DottedVersion::parse(current))
    {
        return latest > current;
    }
    latest != current
}

fn parse_build_time(version: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(version, TIMESTAMP_VERSION_FORMAT).ok()
}

/// Dotted all-numeric version with any number of parts, as Chromium uses,
/// plus an optional numeric packaging revision after `-`.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct DottedVersion {
    parts: Vec<u64>,
    revision: Option<u64>,
}

impl DottedVersion {
    fn parse(version: &str) -> Option<Self> {
        let (core, revision) = match version.split_once('-') {
            Some((core, revision)) => (core, Some(revision.parse().ok()?)),
            None => (version, None),
        };
        let mut parts = core
            .split('.')
            .map(|part| part.parse().ok())
            .collect::<Option<Vec<u64>>>()?;
        while parts.len() > 1 && parts.last() == Some(&0) {
            parts.pop();
        }
        Some(Self { parts, revision })
    }
}

fn parse_semver(version: &str) -> Option<Version> {
    if let Ok(parsed) = Version::parse(version) {
        return Some(parsed);
    }

    let (core, suffix) = split_semver_core_and_suffix(version);
    let mut parts = core.split('.');
    let major = parts.next()?.parse::<u64>().ok()?;
    let minor = parts.next().and_then(|part| part.parse::<u64>().ok());
    let patch = parts.next().and_then(|part| part.parse::<u64>().ok());

    if parts.next().is_some() {
        return None;
    }

    let normalized = match (minor, patch) {
        (None, None) => format!("{major}.0.0{suffix}"),
        (Some(minor), None) => format!("{major}.{minor}.0{suffix}"),
        (Some(minor), Some(patch)) => format!("{major}.{minor}.{patch}{suffix}"),
        (None, Some(_)) => return None,
    };

    Version::parse(&normalized).ok()
}

fn split_semver_core_and_suffix(version: &str) -> (&str, &str) {
    let suffix_idx = version.find(['-', '+']).unwrap_or(version.len());
    (&version[..suffix_idx], &version[suffix_idx..])
}

/// Extract a lowercase hex SHA-256 from a `sha256:<hex>` digest string.
#[must_use]
pub fn parse_sha256_digest(digest: &str) -> Option<String> {
    let (algorithm, hash) = digest.split_once(':')?;
    if !algorithm.eq_ignore_ascii_case("sha256") {
        return None;
    }
    normalize_sha256(hash)
}

#[must_use]
pub fn normalize_sha256(hash: &str) -> Option<String> {
    if hash.len() != 64 || !hash.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    Some(hash.to_ascii_lowercase())
}
