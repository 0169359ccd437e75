use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use log::info;
use regex::Regex;
use serde::Deserialize;

use crate::cache::CacheBehaviour;
use crate::document;
use crate::endpoints::Endpoints;
use crate::error::{CheckError, MalformedCause};
use crate::fetcher::Fetcher;
use crate::update::{TIMESTAMP_VERSION_FORMAT, normalize_sha256};

static LOG_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'version': '([^']+)'").expect("version pattern is valid"));
static LOG_NOW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'now': '([^']+)'").expect("date pattern is valid"));

#[derive(Debug, Deserialize)]
struct ChainOfTrust {
    artifacts: HashMap<String, ChainArtifact>,
    task: ChainTask,
}

#[derive(Debug, Deserialize)]
struct ChainArtifact {
    sha256: String,
}

#[derive(Debug, Deserialize)]
struct ChainTask {
    created: String,
}

/// Most recent successful build of a Taskcluster index route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiBuild {
    pub version: String,
    pub download_url: String,
    pub release_date: String,
    pub file_hash: Option<String>,
}

/// Consumer of Mozilla's Taskcluster index for rolling builds.
///
/// There is no release list: the build behind the index route is the only
/// candidate.
pub struct MozillaCiConsumer<'a> {
    fetcher: &'a Fetcher,
    base: &'a str,
}

impl<'a> MozillaCiConsumer<'a> {
    #[must_use]
    pub fn new(fetcher: &'a Fetcher, endpoints: &'a Endpoints) -> Self {
        Self {
            fetcher,
            base: endpoints.mozilla_ci.trim_end_matches('/'),
        }
    }

    fn artifact_url(&self, task: &str, artifact: &str) -> String {
        format!("{}/api/index/v1/task/{task}/artifacts/{artifact}", self.base)
    }

    /// Read the chain-of-trust manifest of `task`; the version is the build
    /// timestamp.
    ///
    /// # Errors
    /// Returns an error when the fetch fails or the manifest lacks `artifact`.
    pub async fn latest_from_chain_of_trust(
        &self,
        task: &str,
        artifact: &str,
        cache: CacheBehaviour,
    ) -> Result<CiBuild, CheckError> {
        let url = self.artifact_url(task, "public/chain-of-trust.json");
        let document = self.fetcher.fetch_json(&url, cache).await?;
        let manifest: ChainOfTrust = document::deserialize(&url, document)?;

        let entry = manifest.artifacts.get(artifact).ok_or_else(|| {
            CheckError::malformed(
                &url,
                MalformedCause::MissingField(format!("artifacts.{artifact}")),
            )
        })?;
        let created = parse_timestamp(&manifest.task.created)
            .ok_or_else(|| invalid_date(&url, &manifest.task.created))?;

        info!("Taskcluster: {task} built at {created}");
        Ok(CiBuild {
            version: created.format(TIMESTAMP_VERSION_FORMAT).to_string(),
            download_url: self.artifact_url(task, artifact),
            release_date: created.to_rfc3339_opts(SecondsFormat::Secs, true),
            file_hash: normalize_sha256(&entry.sha256),
        })
    }

    /// Scrape version and build date from the plain-text task log of `task`.
    ///
    /// # Errors
    /// Returns an error when the fetch fails or the log lacks either line.
    pub async fn latest_from_log(
        &self,
        task: &str,
        artifact: &str,
        cache: CacheBehaviour,
    ) -> Result<CiBuild, CheckError> {
        let url = self.artifact_url(task, "public/logs/live.log");
        let log = self.fetcher.fetch_text(&url, cache).await?;
        let (version, release_date) = parse_live_log(&url, &log)?;

        info!("Taskcluster: {task} has version {version}");
        Ok(CiBuild {
            version,
            download_url: self.artifact_url(task, artifact),
            release_date,
            file_hash: None,
        })
    }
}

pub(crate) fn parse_live_log(url: &str, log: &str) -> Result<(String, String), CheckError> {
    let capture = |pattern: &Regex, what: &str| {
        pattern
            .captures(log)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                CheckError::malformed(
                    url,
                    MalformedCause::Invalid(format!("log has no {what} line")),
                )
            })
    };

    let version = capture(&LOG_VERSION, "version")?;
    let now = capture(&LOG_NOW, "build date")?;
    let date = parse_timestamp(&now).ok_or_else(|| invalid_date(url, &now))?;
    Ok((version, date.to_rfc3339_opts(SecondsFormat::Secs, true)))
}

/// RFC 3339 timestamps, or zone-less ISO timestamps taken as UTC.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn invalid_date(url: &str, value: &str) -> CheckError {
    CheckError::malformed(url, MalformedCause::Invalid(format!("`{value}` is not a timestamp")))
}
