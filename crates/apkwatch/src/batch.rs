use std::time::Duration;

use apkwatch_apps::{App, CheckContext};
use apkwatch_core::{CacheBehaviour, CheckError, DeviceProfile, Endpoints, Fetcher, LatestUpdate};
use futures_util::StreamExt;
use futures_util::stream;
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

/// Shared inputs of one batch of checks.
pub struct BatchRequest<'a> {
    pub fetcher: &'a Fetcher,
    pub endpoints: &'a Endpoints,
    pub device: &'a DeviceProfile,
    pub cache: CacheBehaviour,
    pub max_concurrent: usize,
    pub check_timeout: Duration,
    pub cancel: &'a CancellationToken,
}

#[derive(Debug)]
pub struct CheckOutcome {
    pub app: App,
    pub result: Result<LatestUpdate, CheckError>,
}

/// Check every app concurrently, at most `max_concurrent` at a time.
///
/// A failing check never aborts the others. Outcomes are returned in the
/// order of `apps`.
pub async fn run_checks(apps: &[App], request: &BatchRequest<'_>) -> Vec<CheckOutcome> {
    let mut outcomes: Vec<(usize, CheckOutcome)> = stream::iter(apps.iter().copied().enumerate())
        .map(|(index, app)| async move { (index, check_one(app, request).await) })
        .buffer_unordered(request.max_concurrent.max(1))
        .collect()
        .await;
    outcomes.sort_by_key(|(index, _)| *index);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

async fn check_one(app: App, request: &BatchRequest<'_>) -> CheckOutcome {
    let token = request.cancel.child_token();
    let fetcher = request.fetcher.with_cancellation(token.clone());
    let ctx = CheckContext {
        fetcher: &fetcher,
        endpoints: request.endpoints,
        device: request.device,
    };

    let check = app.descriptor().check_for_update(&ctx, request.cache);
    let result = match tokio::time::timeout(request.check_timeout, check).await {
        Ok(result) => result,
        Err(_) => {
            token.cancel();
            Err(CheckError::TimedOut(request.check_timeout))
        }
    };

    match &result {
        Ok(update) => debug!("{app}: {}", update.download_url),
        Err(error) if error.is_cancellation() => debug!("{app}: {error}"),
        Err(error) => warn!("{app}: could not determine latest version: {error}"),
    }
    CheckOutcome { app, result }
}
