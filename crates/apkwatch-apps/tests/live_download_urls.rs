//! Contract checks against the real upstream services.
//!
//! Run with `cargo test -p apkwatch-apps -- --ignored`.

use std::time::Duration;

use apkwatch_apps::{App, CheckContext};
use apkwatch_core::{Abi, CacheBehaviour, DeviceProfile, Endpoints, Fetcher, ResponseCache};

async fn assert_download_url_is_live(app: App, device: &DeviceProfile) {
    let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
    let fetcher = Fetcher::with_timeout(
        ResponseCache::new(temp_dir.path(), Duration::from_secs(60)),
        Some(Duration::from_secs(60)),
    )
    .expect("http client should build");
    let endpoints = Endpoints::default();
    let ctx = CheckContext {
        fetcher: &fetcher,
        endpoints: &endpoints,
        device,
    };

    let update = app
        .descriptor()
        .check_for_update(&ctx, CacheBehaviour::ForceNetwork)
        .await
        .unwrap_or_else(|error| panic!("{app}: {error}"));
    assert!(!update.version.is_empty(), "{app}: empty version");

    let response = reqwest::Client::new()
        .head(&update.download_url)
        .send()
        .await
        .unwrap_or_else(|error| panic!("{app}: {error}"));
    assert!(
        response.status().is_success(),
        "{app}: {} answered {}",
        update.download_url,
        response.status()
    );
}

#[tokio::test]
#[ignore = "requires network access"]
async fn every_app_resolves_to_a_live_download() {
    let phone = DeviceProfile::new(vec![Abi::Arm64, Abi::Armeabi], 34);
    for app in App::ALL {
        assert_download_url_is_live(app, &phone).await;
    }
}

#[tokio::test]
#[ignore = "requires network access"]
async fn marshmallow_devices_get_legacy_brave_builds() {
    let tablet = DeviceProfile::new(vec![Abi::Armeabi], 23);
    assert_download_url_is_live(App::Brave, &tablet).await;
}
