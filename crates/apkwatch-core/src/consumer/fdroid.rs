use log::info;
use serde::Deserialize;

use crate::abi::Abi;
use crate::cache::CacheBehaviour;
use crate::document;
use crate::endpoints::Endpoints;
use crate::error::{CheckError, MalformedCause};
use crate::fetcher::Fetcher;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppInfo {
    package_name: String,
    suggested_version_code: u64,
    packages: Vec<Package>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Package {
    pub version_name: String,
    pub version_code: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FdroidUpdate {
    pub version_name: String,
    pub version_code: u64,
    pub download_url: String,
    /// Creation date of the last metadata commit for the package.
    pub created_at: String,
}

/// Consumer of the F-Droid package API.
///
/// The package list carries no dates, so the publish date comes from the
/// last commit touching the package's metadata file in the F-Droid data
/// repository on GitLab.
pub struct FdroidConsumer<'a> {
    fetcher: &'a Fetcher,
    endpoints: &'a Endpoints,
}

impl<'a> FdroidConsumer<'a> {
    #[must_use]
    pub fn new(fetcher: &'a Fetcher, endpoints: &'a Endpoints) -> Self {
        Self { fetcher, endpoints }
    }

    /// Every build sharing the version name of the suggested version code,
    /// ordered by ascending version code.
    ///
    /// F-Droid publishes one build per ABI under the same version name without
    /// labelling the ABI; callers map positions to ABIs.
    ///
    /// # Errors
    /// Returns an error when a fetch fails or a response is malformed.
    pub async fn updates_of_suggested_version(
        &self,
        package_name: &str,
        cache: CacheBehaviour,
    ) -> Result<Vec<FdroidUpdate>, CheckError> {
        let url = self.package_url(package_name);
        let app = self.app_info(package_name, cache).await?;
        let suggested = app
            .packages
            .iter()
            .find(|package| package.version_code == app.suggested_version_code)
            .ok_or_else(|| {
                CheckError::malformed(
                    &url,
                    MalformedCause::Invalid(format!(
                        "suggested version code {} is not listed",
                        app.suggested_version_code
                    )),
                )
            })?;

        let mut same_version: Vec<Package> = app
            .packages
            .iter()
            .filter(|package| package.version_name == suggested.version_name)
            .cloned()
            .collect();
        same_version.sort_by_key(|package| package.version_code);

        let created_at = self.last_commit_date(package_name, cache).await?;
        info!(
            "F-Droid: found {} builds of {} {}",
            same_version.len(),
            package_name,
            suggested.version_name
        );
        Ok(same_version
            .into_iter()
            .map(|package| self.update_for(package_name, package, created_at.clone()))
            .collect())
    }

    fn package_url(&self, package_name: &str) -> String {
        format!(
            "{}/api/v1/packages/{package_name}",
            self.endpoints.fdroid.trim_end_matches('/')
        )
    }

    fn update_for(&self, package_name: &str, package: Package, created_at: String) -> FdroidUpdate {
        FdroidUpdate {
            download_url: format!(
                "{}/repo/{package_name}_{}.apk",
                self.endpoints.fdroid.trim_end_matches('/'),
                package.version_code
            ),
            version_name: package.version_name,
            version_code: package.version_code,
            created_at,
        }
    }

    async fn app_info(
        &self,
        package_name: &str,
        cache: CacheBehaviour,
    ) -> Result<AppInfo, CheckError> {
        let url = self.package_url(package_name);
        let document = self.fetcher.fetch_json(&url, cache).await?;
        let app: AppInfo = document::deserialize(&url, document)?;
        document::non_empty(&url, &app.packages, "packages")?;
        if app.package_name != package_name {
            return Err(CheckError::malformed(
                &url,
                MalformedCause::Invalid(format!(
                    "document describes {} instead of {package_name}",
                    app.package_name
                )),
            ));
        }
        Ok(app)
    }

    /// Metadata file → last commit id → commit creation date.
    async fn last_commit_date(
        &self,
        package_name: &str,
        cache: CacheBehaviour,
    ) -> Result<String, CheckError> {
        let project = format!(
            "{}/projects/{}/repository",
            self.endpoints.gitlab_api.trim_end_matches('/'),
            self.endpoints.fdroid_data_project
        );

        let file_url = format!("{project}/files/metadata%2F{package_name}.yml?ref=master");
        let file = self.fetcher.fetch_json(&file_url, cache).await?;
        let commit_id = document::str_field(&file_url, &file, "last_commit_id")?;

        let commit_url = format!("{project}/commits/{commit_id}");
        let commit = self.fetcher.fetch_json(&commit_url, cache).await?;
        Ok(document::str_field(&commit_url, &commit, "created_at")?.to_string())
    }
}

/// Pick the build at the position assigned to `abi`, after checking that the
/// source returned exactly `expected` builds.
///
/// # Errors
/// Returns [`CheckError::UnexpectedCandidateCount`] on a count mismatch and
/// [`CheckError::UnsupportedAbi`] when `abi` has no position.
pub fn select_positional(
    context: &str,
    mut updates: Vec<FdroidUpdate>,
    positions: &[(Abi, usize)],
    abi: Abi,
    expected: usize,
) -> Result<FdroidUpdate, CheckError> {
    if updates.len() != expected {
        return Err(CheckError::unexpected_count(context, expected, updates.len()));
    }
    let index = positions
        .iter()
        .find_map(|&(candidate, index)| (candidate == abi).then_some(index))
        .ok_or_else(|| crate::abi::UnsupportedAbi {
            device: vec![abi],
            app: positions.iter().map(|&(abi, _)| abi).collect(),
        })?;
    if index >= updates.len() {
        return Err(CheckError::unexpected_count(context, index + 1, updates.len()));
    }
    Ok(updates.swap_remove(index))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::Matcher;
    use serde_json::json;

    use super::*;
    use crate::cache::ResponseCache;

    const PACKAGE: &str = "us.spotco.fennec_dos";
    const POSITIONS: &[(Abi, usize)] = &[(Abi::Armeabi, 0), (Abi::Arm64, 1)];

    async fn mock_gitlab(server: &mut mockito::ServerGuard) {
        server
            .mock("GET", Matcher::Regex(r"^/api/v4/projects/36528/repository/files/".to_string()))
            .match_query(Matcher::UrlEncoded("ref".into(), "master".into()))
            .with_status(200)
            .with_body(json!({ "last_commit_id": "0a1b2c" }).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/api/v4/projects/36528/repository/commits/0a1b2c")
            .with_status(200)
            .with_body(json!({ "created_at": "2024-02-10T08:15:00.000+00:00" }).to_string())
            .create_async()
            .await;
    }

    async fn mock_packages(server: &mut mockito::ServerGuard, packages: serde_json::Value) {
        server
            .mock("GET", format!("/api/v1/packages/{PACKAGE}").as_str())
            .with_status(200)
            .with_body(
                json!({
                    "packageName": PACKAGE,
                    "suggestedVersionCode": 11,
                    "packages": packages,
                })
                .to_string(),
            )
            .create_async()
            .await;
    }

    fn fetcher(dir: &std::path::Path) -> Fetcher {
        Fetcher::new(
            reqwest::Client::new(),
            ResponseCache::new(dir, Duration::from_secs(600)),
        )
    }

    #[tokio::test]
    async fn selects_build_by_position() {
        let mut server = mockito::Server::new_async().await;
        mock_packages(
            &mut server,
            json!([
                { "versionName": "2.0", "versionCode": 11 },
                { "versionName": "2.0", "versionCode": 10 },
                { "versionName": "1.9", "versionCode": 9 },
            ]),
        )
        .await;
        mock_gitlab(&mut server).await;
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let fetcher = fetcher(temp_dir.path());
        let endpoints = Endpoints::single_host(&server.url());

        let updates = FdroidConsumer::new(&fetcher, &endpoints)
            .updates_of_suggested_version(PACKAGE, CacheBehaviour::ForceNetwork)
            .await
            .expect("two builds");
        let arm64 = select_positional("Mull", updates.clone(), POSITIONS, Abi::Arm64, 2)
            .expect("arm64 build");
        let arm32 =
            select_positional("Mull", updates, POSITIONS, Abi::Armeabi, 2).expect("arm32 build");

        assert_eq!(arm64.version_code, 11);
        assert_eq!(arm64.version_name, "2.0");
        assert_eq!(arm64.download_url, format!("{}/repo/{PACKAGE}_11.apk", server.url()));
        assert_eq!(arm64.created_at, "2024-02-10T08:15:00.000+00:00");
        assert_eq!(arm32.version_code, 10);
    }

    #[tokio::test]
    async fn single_build_fails_count_check() {
        let mut server = mockito::Server::new_async().await;
        mock_packages(&mut server, json!([{ "versionName": "2.0", "versionCode": 11 }])).await;
        mock_gitlab(&mut server).await;
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let fetcher = fetcher(temp_dir.path());
        let endpoints = Endpoints::single_host(&server.url());

        let updates = FdroidConsumer::new(&fetcher, &endpoints)
            .updates_of_suggested_version(PACKAGE, CacheBehaviour::ForceNetwork)
            .await
            .expect("one build");
        let error = select_positional("Mull", updates, POSITIONS, Abi::Arm64, 2)
            .expect_err("count mismatch");

        assert!(matches!(
            error,
            CheckError::UnexpectedCandidateCount { expected: 2, actual: 1, .. }
        ));
    }

    #[tokio::test]
    async fn missing_or_mistyped_packages_are_malformed() {
        for body in [
            json!({ "packageName": PACKAGE, "suggestedVersionCode": 11 }),
            json!({ "packageName": PACKAGE, "suggestedVersionCode": 11, "packages": "none" }),
        ] {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("GET", format!("/api/v1/packages/{PACKAGE}").as_str())
                .with_status(200)
                .with_body(body.to_string())
                .create_async()
                .await;
            let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
            let fetcher = fetcher(temp_dir.path());
            let endpoints = Endpoints::single_host(&server.url());

            let error = FdroidConsumer::new(&fetcher, &endpoints)
                .updates_of_suggested_version(PACKAGE, CacheBehaviour::ForceNetwork)
                .await
                .expect_err("document is malformed");

            assert!(matches!(error, CheckError::MalformedResponse { .. }), "got {error:?}");
        }
    }

    #[test]
    fn position_beyond_list_is_a_count_error() {
        let update = FdroidUpdate {
            version_name: "2.0".to_string(),
            version_code: 10,
            download_url: "https://f-droid.org/repo/x_10.apk".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        };
        let error = select_positional("x", vec![update], &[(Abi::Arm64, 1)], Abi::Arm64, 1)
            .expect_err("index 1 does not exist");
        assert!(matches!(error, CheckError::UnexpectedCandidateCount { .. }));

        let error = select_positional("x", Vec::new(), POSITIONS, Abi::X86, 0)
            .expect_err("x86 has no position");
        assert!(matches!(error, CheckError::UnsupportedAbi(_)));
    }
}
