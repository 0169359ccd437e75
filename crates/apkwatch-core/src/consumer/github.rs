use log::{debug, info};
use serde::{Deserialize, Deserializer};

use crate::cache::CacheBehaviour;
use crate::document;
use crate::endpoints::Endpoints;
use crate::error::CheckError;
use crate::fetcher::Fetcher;
use crate::update::{parse_sha256_digest, strip_version_prefix};

/// Upper bound of release pages searched before giving up.
pub const MAX_RELEASE_PAGES: u32 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct GithubAsset {
    pub name: String,
    pub browser_download_url: String,
    pub size: u64,
    #[serde(default)]
    pub digest: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubRelease {
    pub tag_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub assets: Vec<GithubAsset>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Which release of a repository counts as "the" update.
pub struct ReleaseQuery<'a> {
    /// `owner/name` of the repository.
    pub repository: &'a str,
    pub results_per_page: u8,
    /// Try `/releases/latest` before paging through the listing.
    pub use_latest_release_api: bool,
    pub accept_prerelease: bool,
    pub is_valid_release: &'a (dyn Fn(&GithubRelease) -> bool + Sync),
    pub is_suitable_asset: &'a (dyn Fn(&GithubAsset) -> bool + Sync),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubResult {
    pub tag_name: String,
    pub release_name: String,
    pub url: String,
    pub file_size_bytes: u64,
    pub file_hash: Option<String>,
    pub release_date: Option<String>,
    pub first_release_has_assets: bool,
}

impl GithubResult {
    /// Release tag without its leading `v`.
    #[must_use]
    pub fn version(&self) -> &str {
        strip_version_prefix(&self.tag_name)
    }
}

/// Consumer of the GitHub releases REST API.
pub struct GithubConsumer<'a> {
    fetcher: &'a Fetcher,
    api_base: &'a str,
}

impl<'a> GithubConsumer<'a> {
    #[must_use]
    pub fn new(fetcher: &'a Fetcher, endpoints: &'a Endpoints) -> Self {
        Self {
            fetcher,
            api_base: endpoints.github_api.trim_end_matches('/'),
        }
    }

    /// Find the newest release accepted by `query` that ships a suitable
    /// asset.
    ///
    /// # Errors
    /// Returns an error when a fetch fails, a response is malformed, or no
    /// release within [`MAX_RELEASE_PAGES`] pages matches.
    pub async fn find_latest_release(
        &self,
        query: &ReleaseQuery<'_>,
        cache: CacheBehaviour,
    ) -> Result<GithubResult, CheckError> {
        if query.use_latest_release_api {
            if let Some(result) = self.try_latest_release(query, cache).await? {
                return Ok(result);
            }
            debug!(
                "Latest release of {} is not usable, searching release pages",
                query.repository
            );
        }
        self.search_release_pages(query, cache).await
    }

    async fn try_latest_release(
        &self,
        query: &ReleaseQuery<'_>,
        cache: CacheBehaviour,
    ) -> Result<Option<GithubResult>, CheckError> {
        let url = format!("{}/repos/{}/releases/latest", self.api_base, query.repository);
        let document = match self.fetcher.fetch_json(&url, cache).await {
            Ok(document) => document,
            Err(error) if error.http_status() == Some(reqwest::StatusCode::NOT_FOUND) => {
                return Ok(None);
            }
            Err(error) => return Err(error.into()),
        };
        let release: GithubRelease = document::deserialize(&url, document)?;

        Ok(select_asset(query, &release)
            .map(|asset| build_result(&release, asset, !release.assets.is_empty())))
    }

    async fn search_release_pages(
        &self,
        query: &ReleaseQuery<'_>,
        cache: CacheBehaviour,
    ) -> Result<GithubResult, CheckError> {
        let per_page = query.results_per_page.max(1);
        let mut first_release_has_assets = false;
        let mut inspected = 0_usize;

        for page in 1..=MAX_RELEASE_PAGES {
            let url = format!(
                "{}/repos/{}/releases?per_page={per_page}&page={page}",
                self.api_base, query.repository
            );
            let document = self.fetcher.fetch_json(&url, cache).await?;
            let releases: Vec<GithubRelease> = document::deserialize(&url, document)?;

            if page == 1 {
                first_release_has_assets = releases.first().is_some_and(|r| !r.assets.is_empty());
            }

            for release in &releases {
                if let Some(asset) = select_asset(query, release) {
                    info!(
                        "Found release {} of {} after {inspected} skipped releases",
                        release.tag_name, query.repository
                    );
                    return Ok(build_result(release, asset, first_release_has_assets));
                }
                inspected += 1;
            }

            if releases.len() < usize::from(per_page) {
                break;
            }
        }

        Err(CheckError::no_match(
            format!("github.com/{}", query.repository),
            format!("none of {inspected} releases is valid and has a suitable asset"),
        ))
    }
}

/// Apply the filters in order: drafts, pre-releases, acceptance predicate,
/// then pick the first suitable asset.
fn select_asset<'r>(
    query: &ReleaseQuery<'_>,
    release: &'r GithubRelease,
) -> Option<&'r GithubAsset> {
    if release.draft || (release.prerelease && !query.accept_prerelease) {
        return None;
    }
    if !(query.is_valid_release)(release) {
        return None;
    }
    release.assets.iter().find(|asset| (query.is_suitable_asset)(asset))
}

fn build_result(
    release: &GithubRelease,
    asset: &GithubAsset,
    first_release_has_assets: bool,
) -> GithubResult {
    GithubResult {
        tag_name: release.tag_name.clone(),
        release_name: release.name.clone(),
        url: asset.browser_download_url.clone(),
        file_size_bytes: asset.size,
        file_hash: asset.digest.as_deref().and_then(parse_sha256_digest),
        release_date: release.published_at.clone(),
        first_release_has_assets,
    }
}
