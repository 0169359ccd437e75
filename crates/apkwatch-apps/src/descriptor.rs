use apkwatch_core::{
    Abi, CacheBehaviour, CheckError, DeviceProfile, Endpoints, Fetcher, LatestUpdate,
};
use log::{debug, info};
use serde::Serialize;

use crate::app::App;
use crate::source::UpdateSource;

/// Grouping used when presenting apps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayCategory {
    FromMozilla,
    BasedOnFirefox,
    GoodPrivacyBrowser,
    BetterThanGoogleChrome,
    Other,
}

/// Static facts about one maintained application and where its updates
/// come from.
#[derive(Debug)]
pub struct AppDescriptor {
    pub app: App,
    pub package_name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub min_api_level: u32,
    /// Supported ABIs. Sources with per-platform filename tables may narrow
    /// this further.
    pub supported_abis: &'static [Abi],
    /// SHA-256 fingerprint of the signing certificate, lowercase hex.
    pub signature_hash: &'static str,
    pub project_page: &'static str,
    pub category: DisplayCategory,
    pub source: UpdateSource,
}

/// Everything a check needs besides the descriptor itself.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    pub fetcher: &'a Fetcher,
    pub endpoints: &'a Endpoints,
    pub device: &'a DeviceProfile,
}

impl AppDescriptor {
    /// Resolve the newest build of this app for `ctx.device`.
    ///
    /// # Errors
    /// Returns an error when the device cannot run the app, the source
    /// cannot be reached or parsed, or nothing matches.
    pub async fn check_for_update(
        &self,
        ctx: &CheckContext<'_>,
        cache: CacheBehaviour,
    ) -> Result<LatestUpdate, CheckError> {
        if !ctx.device.supports_sdk(self.min_api_level) {
            return Err(CheckError::UnsupportedSdk {
                required: self.min_api_level,
                actual: ctx.device.sdk_level,
            });
        }

        debug!("Checking {} via {}", self.app, self.source.label());
        let update = self.source.resolve(self, ctx, cache).await?;
        info!("{}: latest version is {}", self.app, update.version);
        Ok(update)
    }
}
