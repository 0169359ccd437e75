//! Where an application's updates come from, and how each source's result is
//! turned into a [`LatestUpdate`].

use apkwatch_core::consumer::{
    CustomRepoConsumer, FdroidConsumer, GithubAsset, GithubConsumer, GithubRelease,
    HtmlPageConsumer, MozillaCiConsumer, ReleaseQuery, select_positional,
};
use apkwatch_core::{
    Abi, CacheBehaviour, CheckError, DeviceProfile, Endpoints, LatestUpdate, UnsupportedAbi,
};
use log::debug;
use regex::Regex;

use crate::descriptor::{AppDescriptor, CheckContext};

/// Consumer kind plus everything the consumer needs for one application.
#[derive(Debug)]
pub enum UpdateSource {
    Github(GithubSource),
    Fdroid(FdroidSource),
    MozillaCi(MozillaCiSource),
    CustomRepo(CustomRepoSource),
    HtmlPage(HtmlPageSource),
}

impl UpdateSource {
    /// Short label for listings.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            UpdateSource::Github(_) => "GitHub",
            UpdateSource::Fdroid(_) => "F-Droid",
            UpdateSource::MozillaCi(_) => "Mozilla CI",
            UpdateSource::CustomRepo(source) => source.repo_id,
            UpdateSource::HtmlPage(_) => "Website",
        }
    }

    pub(crate) async fn resolve(
        &self,
        app: &AppDescriptor,
        ctx: &CheckContext<'_>,
        cache: CacheBehaviour,
    ) -> Result<LatestUpdate, CheckError> {
        match self {
            UpdateSource::Github(source) => source.resolve(ctx, cache).await,
            UpdateSource::Fdroid(source) => source.resolve(app, ctx, cache).await,
            UpdateSource::MozillaCi(source) => source.resolve(app, ctx, cache).await,
            UpdateSource::CustomRepo(source) => source.resolve(app, ctx, cache).await,
            UpdateSource::HtmlPage(source) => source.resolve(app, ctx, cache).await,
        }
    }
}

/// How a release asset name is compared with the expected filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetName {
    Exact(&'static str),
    /// For names that embed the version, such as `Orbot-17.2-fullperm-arm64-v8a-release.apk`.
    Suffix(&'static str),
}

impl AssetName {
    #[must_use]
    pub fn matches(self, name: &str) -> bool {
        match self {
            AssetName::Exact(expected) => name == expected,
            AssetName::Suffix(suffix) => name.ends_with(suffix),
        }
    }
}

/// Asset names published for devices from `min_sdk` upwards.
///
/// Vendors sometimes ship a differently packaged artifact, for fewer ABIs, to
/// older platform versions.
#[derive(Debug)]
pub struct FilenameBranch {
    pub min_sdk: u32,
    pub abis: &'static [Abi],
    pub assets: &'static [(Abi, AssetName)],
}

/// Pick the branch for the device's API level (branches are ordered newest
/// first), then the asset for the best ABI of that branch.
///
/// # Errors
/// Fails when no branch covers the device's API level or the device shares
/// no ABI with the chosen branch.
pub fn expected_asset(
    branches: &[FilenameBranch],
    device: &DeviceProfile,
) -> Result<(Abi, AssetName), CheckError> {
    let branch = branches
        .iter()
        .find(|branch| device.supports_sdk(branch.min_sdk))
        .ok_or_else(|| CheckError::UnsupportedSdk {
            required: branches
                .iter()
                .map(|branch| branch.min_sdk)
                .min()
                .unwrap_or_default(),
            actual: device.sdk_level,
        })?;
    let abi = device.find_best_abi(branch.abis)?;
    let asset = branch
        .assets
        .iter()
        .find_map(|&(candidate, asset)| (candidate == abi).then_some(asset))
        .ok_or_else(|| UnsupportedAbi {
            device: vec![abi],
            app: branch.assets.iter().map(|&(abi, _)| abi).collect(),
        })?;
    Ok((abi, asset))
}

#[derive(Debug)]
pub struct GithubSource {
    /// `owner/name`.
    pub repository: &'static str,
    pub results_per_page: u8,
    pub use_latest_release_api: bool,
    pub accept_prerelease: bool,
    pub is_valid_release: fn(&GithubRelease) -> bool,
    pub assets: &'static [FilenameBranch],
}

impl GithubSource {
    async fn resolve(
        &self,
        ctx: &CheckContext<'_>,
        cache: CacheBehaviour,
    ) -> Result<LatestUpdate, CheckError> {
        let (abi, expected) = expected_asset(self.assets, ctx.device)?;
        debug!("{}: looking for {expected:?} ({abi})", self.repository);

        let is_suitable_asset = |asset: &GithubAsset| expected.matches(&asset.name);
        let query = ReleaseQuery {
            repository: self.repository,
            results_per_page: self.results_per_page,
            use_latest_release_api: self.use_latest_release_api,
            accept_prerelease: self.accept_prerelease,
            is_valid_release: &self.is_valid_release,
            is_suitable_asset: &is_suitable_asset,
        };
        let result = GithubConsumer::new(ctx.fetcher, ctx.endpoints)
            .find_latest_release(&query, cache)
            .await?;

        Ok(LatestUpdate::new(&result.url, result.version())?
            .published(result.release_date)
            .size(Some(result.file_size_bytes))
            .hash(result.file_hash)
            .first_release_has_assets(result.first_release_has_assets))
    }
}

/// F-Droid publishes one build per ABI under the same version name; the
/// position of each ABI's build in the ascending version-code order is
/// fixed per app.
#[derive(Debug)]
pub struct FdroidSource {
    pub positions: &'static [(Abi, usize)],
    pub expected_builds: usize,
}

impl FdroidSource {
    async fn resolve(
        &self,
        app: &AppDescriptor,
        ctx: &CheckContext<'_>,
        cache: CacheBehaviour,
    ) -> Result<LatestUpdate, CheckError> {
        let abi = ctx.device.find_best_abi(app.supported_abis)?;
        let updates = FdroidConsumer::new(ctx.fetcher, ctx.endpoints)
            .updates_of_suggested_version(app.package_name, cache)
            .await?;
        let update = select_positional(
            app.title,
            updates,
            self.positions,
            abi,
            self.expected_builds,
        )?;

        Ok(LatestUpdate::new(update.download_url, update.version_name)?
            .published(Some(update.created_at)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiFormat {
    /// Version is the build timestamp from `chain-of-trust.json`.
    ChainOfTrust,
    /// Version is scraped from the task's `live.log`.
    Log,
}

/// A Taskcluster index route. `{abi}` in `task` and `artifact` is replaced by
/// the platform ABI name.
#[derive(Debug)]
pub struct MozillaCiSource {
    pub task: &'static str,
    pub artifact: &'static str,
    pub format: CiFormat,
}

impl MozillaCiSource {
    async fn resolve(
        &self,
        app: &AppDescriptor,
        ctx: &CheckContext<'_>,
        cache: CacheBehaviour,
    ) -> Result<LatestUpdate, CheckError> {
        let abi = ctx.device.find_best_abi(app.supported_abis)?;
        let task = self.task.replace("{abi}", abi.platform_name());
        let artifact = self.artifact.replace("{abi}", abi.platform_name());

        let consumer = MozillaCiConsumer::new(ctx.fetcher, ctx.endpoints);
        let build = match self.format {
            CiFormat::ChainOfTrust => {
                consumer
                    .latest_from_chain_of_trust(&task, &artifact, cache)
                    .await?
            }
            CiFormat::Log => consumer.latest_from_log(&task, &artifact, cache).await?,
        };

        Ok(LatestUpdate::new(build.download_url, build.version)?
            .published(Some(build.release_date))
            .hash(build.file_hash))
    }
}

#[derive(Debug)]
pub struct CustomRepoSource {
    /// Key into [`Endpoints::custom_repos`].
    pub repo_id: &'static str,
}

impl CustomRepoSource {
    async fn resolve(
        &self,
        app: &AppDescriptor,
        ctx: &CheckContext<'_>,
        cache: CacheBehaviour,
    ) -> Result<LatestUpdate, CheckError> {
        let repo_root = ctx
            .endpoints
            .custom_repo(self.repo_id)
            .ok_or_else(|| {
                CheckError::no_match(self.repo_id, "repository root is not configured")
            })?;
        let abi = ctx.device.find_best_abi(app.supported_abis)?;
        let update = CustomRepoConsumer::new(ctx.fetcher)
            .find_latest(repo_root, app.package_name, abi, cache)
            .await?;

        Ok(LatestUpdate::new(update.download_url, update.version_name)?
            .published(update.published)
            .size(update.size)
            .hash(update.hash))
    }
}

/// A vendor download page scraped for the link of the wanted build.
#[derive(Debug)]
pub struct HtmlPageSource {
    pub site: fn(&Endpoints) -> &str,
    pub path: &'static str,
    /// Pattern with a `version` group for the link of an ABI's build.
    pub link: fn(Abi) -> Option<&'static Regex>,
}

impl HtmlPageSource {
    async fn resolve(
        &self,
        app: &AppDescriptor,
        ctx: &CheckContext<'_>,
        cache: CacheBehaviour,
    ) -> Result<LatestUpdate, CheckError> {
        let abi = ctx.device.find_best_abi(app.supported_abis)?;
        let pattern = (self.link)(abi).ok_or_else(|| UnsupportedAbi {
            device: vec![abi],
            app: app.supported_abis.to_vec(),
        })?;
        let page_url = format!(
            "{}{}",
            (self.site)(ctx.endpoints).trim_end_matches('/'),
            self.path
        );

        let link = HtmlPageConsumer::new(ctx.fetcher)
            .find_link(&page_url, pattern, cache)
            .await?;
        let version = link.version.ok_or_else(|| {
            CheckError::no_match(&page_url, format!("{} carries no version", link.url))
        })?;

        LatestUpdate::new(link.url, version)
    }
}
