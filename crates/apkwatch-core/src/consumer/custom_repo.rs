use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat};
use log::{debug, info};
use serde::Deserialize;

use crate::abi::Abi;
use crate::cache::CacheBehaviour;
use crate::document;
use crate::error::{CheckError, MalformedCause};
use crate::fetcher::Fetcher;
use crate::update::normalize_sha256;

#[derive(Debug, Deserialize)]
struct RepoIndex {
    apps: Vec<RepoApp>,
    packages: HashMap<String, Vec<RepoPackage>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepoApp {
    package_name: String,
    #[serde(default)]
    suggested_version_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepoPackage {
    apk_name: String,
    version_name: String,
    version_code: u64,
    #[serde(default)]
    nativecode: Vec<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    hash_type: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    added: Option<i64>,
}

impl RepoPackage {
    fn runs_on(&self, abi: Abi) -> bool {
        self.nativecode.is_empty() || self.nativecode.iter().any(|code| code == abi.platform_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUpdate {
    pub version_name: String,
    pub version_code: u64,
    pub download_url: String,
    pub published: Option<String>,
    pub size: Option<u64>,
    pub hash: Option<String>,
}

/// Consumer of third-party F-Droid repositories through their `index-v1.json`.
pub struct CustomRepoConsumer<'a> {
    fetcher: &'a Fetcher,
}

impl<'a> CustomRepoConsumer<'a> {
    #[must_use]
    pub fn new(fetcher: &'a Fetcher) -> Self {
        Self { fetcher }
    }

    /// The build of the suggested version of `package_name` for `abi`.
    ///
    /// # Errors
    /// Returns an error when the index cannot be fetched or parsed, or when
    /// the app or the build is not found exactly once.
    pub async fn find_latest(
        &self,
        repo_root: &str,
        package_name: &str,
        abi: Abi,
        cache: CacheBehaviour,
    ) -> Result<RepoUpdate, CheckError> {
        let repo_root = repo_root.trim_end_matches('/');
        let url = format!("{repo_root}/index-v1.json");
        let document = self.fetcher.fetch_json(&url, cache).await?;
        let index: RepoIndex = document::deserialize(&url, document)?;

        let update = select_build(&url, repo_root, index, package_name, abi)?;
        info!("{repo_root}: found {package_name} {} for {abi}", update.version_name);
        Ok(update)
    }
}

fn select_build(
    url: &str,
    repo_root: &str,
    mut index: RepoIndex,
    package_name: &str,
    abi: Abi,
) -> Result<RepoUpdate, CheckError> {
    let apps: Vec<&RepoApp> = index
        .apps
        .iter()
        .filter(|app| app.package_name == package_name)
        .collect();
    if apps.len() != 1 {
        return Err(CheckError::unexpected_count(
            format!("{package_name} in {url}"),
            1,
            apps.len(),
        ));
    }

    let packages = index.packages.remove(package_name).unwrap_or_default();
    document::non_empty(url, &packages, &format!("packages.{package_name}"))?;

    let app = document::element(url, &apps, 0)?;
    let version_name = match &app.suggested_version_name {
        Some(name) => name.clone(),
        None => {
            debug!("{package_name} has no suggested version, using the newest build");
            packages
                .iter()
                .max_by_key(|package| package.version_code)
                .map(|package| package.version_name.clone())
                .unwrap_or_default()
        }
    };

    let mut builds: Vec<RepoPackage> = packages
        .into_iter()
        .filter(|package| package.version_name == version_name && package.runs_on(abi))
        .collect();
    if builds.len() != 1 {
        return Err(CheckError::unexpected_count(
            format!("{package_name} {version_name} for {abi}"),
            1,
            builds.len(),
        ));
    }
    let build = builds.swap_remove(0);

    let published = build
        .added
        .map(|millis| {
            DateTime::from_timestamp_millis(millis)
                .map(|date| date.to_rfc3339_opts(SecondsFormat::Secs, true))
                .ok_or_else(|| {
                    CheckError::malformed(
                        url,
                        MalformedCause::Invalid(format!("`added` {millis} is out of range")),
                    )
                })
        })
        .transpose()?;
    let hash = match (build.hash_type.as_deref(), build.hash.as_deref()) {
        (Some("sha256"), Some(hash)) => normalize_sha256(hash),
        _ => None,
    };

    Ok(RepoUpdate {
        download_url: format!("{repo_root}/{}", build.apk_name),
        version_name: build.version_name,
        version_code: build.version_code,
        published,
        size: build.size,
        hash,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::cache::ResponseCache;

    const PACKAGE: &str = "us.spotco.fennec_dos";
    const HASH: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    fn index(apps: serde_json::Value) -> serde_json::Value {
        json!({
            "repo": { "name": "DivestOS Official" },
            "apps": apps,
            "packages": {
                PACKAGE: [
                    {
                        "apkName": "us.spotco.fennec_dos_21.apk",
                        "versionName": "124.0",
                        "versionCode": 21,
                        "nativecode": ["arm64-v8a"],
                        "size": 70_000_000,
                        "hash": HASH,
                        "hashType": "sha256",
                        "added": 1_714_521_600_000_i64,
                    },
                    {
                        "apkName": "us.spotco.fennec_dos_20.apk",
                        "versionName": "124.0",
                        "versionCode": 20,
                        "nativecode": ["armeabi-v7a"],
                        "size": 60_000_000,
                        "hash": "ff",
                        "hashType": "md5",
                    },
                    {
                        "apkName": "us.spotco.fennec_dos_19.apk",
                        "versionName": "123.1",
                        "versionCode": 19,
                        "nativecode": ["arm64-v8a"],
                    },
                ],
            },
        })
    }

    fn suggested_app() -> serde_json::Value {
        json!([{
            "packageName": PACKAGE,
            "suggestedVersionName": "124.0",
            "suggestedVersionCode": "21",
        }])
    }

    fn parse(value: serde_json::Value) -> RepoIndex {
        serde_json::from_value(value).expect("index fixture should parse")
    }

    #[test]
    fn picks_the_build_for_the_abi() {
        let update = select_build(
            "https://repo/index-v1.json",
            "https://repo",
            parse(index(suggested_app())),
            PACKAGE,
            Abi::Arm64,
        )
        .expect("arm64 build");

        assert_eq!(update.download_url, "https://repo/us.spotco.fennec_dos_21.apk");
        assert_eq!(update.version_name, "124.0");
        assert_eq!(update.published.as_deref(), Some("2024-05-01T00:00:00Z"));
        assert_eq!(update.size, Some(70_000_000));
        assert_eq!(update.hash.as_deref(), Some(HASH));
    }

    #[test]
    fn non_sha256_hashes_are_dropped() {
        let update = select_build(
            "u",
            "https://repo",
            parse(index(suggested_app())),
            PACKAGE,
            Abi::Armeabi,
        )
        .expect("arm32 build");
        assert_eq!(update.version_code, 20);
        assert!(update.hash.is_none());
        assert!(update.published.is_none());
    }

    #[test]
    fn missing_abi_is_a_count_error() {
        let error = select_build(
            "u",
            "https://repo",
            parse(index(suggested_app())),
            PACKAGE,
            Abi::X86,
        )
        .expect_err("no x86 build");
        assert!(matches!(
            error,
            CheckError::UnexpectedCandidateCount { expected: 1, actual: 0, .. }
        ));
    }

    #[test]
    fn duplicate_app_entries_are_rejected() {
        let apps = json!([{ "packageName": PACKAGE }, { "packageName": PACKAGE }]);
        let error = select_build("u", "https://repo", parse(index(apps)), PACKAGE, Abi::Arm64)
            .expect_err("two apps");
        assert!(matches!(
            error,
            CheckError::UnexpectedCandidateCount { expected: 1, actual: 2, .. }
        ));
    }

    #[test]
    fn without_suggestion_the_newest_version_wins() {
        let apps = json!([{ "packageName": PACKAGE }]);
        let update = select_build("u", "https://repo", parse(index(apps)), PACKAGE, Abi::Arm64)
            .expect("newest build");
        assert_eq!(update.version_code, 21);
    }

    #[tokio::test]
    async fn fetches_index_below_repo_root() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/fdroid/official/index-v1.json")
            .with_status(200)
            .with_body(index(suggested_app()).to_string())
            .create_async()
            .await;
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let fetcher = Fetcher::new(
            reqwest::Client::new(),
            ResponseCache::new(temp_dir.path(), Duration::from_secs(600)),
        );
        let root = format!("{}/fdroid/official/", server.url());

        let update = CustomRepoConsumer::new(&fetcher)
            .find_latest(&root, PACKAGE, Abi::Arm64, CacheBehaviour::UseCache)
            .await
            .expect("index should resolve");

        mock.assert_async().await;
        assert_eq!(
            update.download_url,
            format!("{}/fdroid/official/us.spotco.fennec_dos_21.apk", server.url())
        );
    }

    #[tokio::test]
    async fn index_without_packages_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/index-v1.json")
            .with_status(200)
            .with_body(json!({ "apps": suggested_app() }).to_string())
            .create_async()
            .await;
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let fetcher = Fetcher::new(
            reqwest::Client::new(),
            ResponseCache::new(temp_dir.path(), Duration::from_secs(600)),
        );

        let error = CustomRepoConsumer::new(&fetcher)
            .find_latest(&server.url(), PACKAGE, Abi::Arm64, CacheBehaviour::ForceNetwork)
            .await
            .expect_err("packages are missing");

        assert!(matches!(error, CheckError::MalformedResponse { .. }));
    }
}
