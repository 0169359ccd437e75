use std::sync::LazyLock;

use apkwatch_core::abi::{ARM32_ARM64, ARM32_ARM64_X86, ARM32_ARM64_X86_X64, ARM32_X86};
use apkwatch_core::consumer::GithubRelease;
use apkwatch_core::{Abi, DIVESTOS_REPO, Endpoints};
use regex::Regex;

use crate::app::App;
use crate::descriptor::{AppDescriptor, DisplayCategory};
use crate::source::{
    AssetName, CiFormat, CustomRepoSource, FdroidSource, FilenameBranch, GithubSource,
    HtmlPageSource, MozillaCiSource, UpdateSource,
};

const NOUGAT: u32 = 24;
const MARSHMALLOW: u32 = 23;
const LOLLIPOP: u32 = 21;

const BRAVE_SIGNATURE: &str = "9c2db70513515fdbfbbc585b3edf3d7123d4dc67c94ffd306361c1d79bbf18ac";
const FIREFOX_SIGNATURE: &str = "a78b62a5165b4494b2fead9e76a280d22d937fee6251aece599446b2ea319b04";
const MULL_SIGNATURE: &str = "ff81f5be56396594eee70fef2832256e15214122e2ba9cedd26005ffd4bcaaa8";

pub(crate) const BRAVE_ASSETS: &[FilenameBranch] = &[
    FilenameBranch {
        min_sdk: NOUGAT,
        abis: ARM32_ARM64_X86_X64,
        assets: &[
            (Abi::Armeabi, AssetName::Exact("BraveMonoarm.apk")),
            (Abi::Arm64, AssetName::Exact("BraveMonoarm64.apk")),
            (Abi::X86, AssetName::Exact("BraveMonox86.apk")),
            (Abi::X86_64, AssetName::Exact("BraveMonox64.apk")),
        ],
    },
    FilenameBranch {
        min_sdk: MARSHMALLOW,
        abis: ARM32_X86,
        assets: &[
            (Abi::Armeabi, AssetName::Exact("Bravearm.apk")),
            (Abi::X86, AssetName::Exact("Bravex86.apk")),
        ],
    },
];

const FIREFOX_ARTIFACT: &str = "public/build/fenix/{abi}/target.apk";

static VIVALDI_ARM32: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https://downloads\.vivaldi\.com/stable/Vivaldi\.(?<version>[0-9.]+)_armeabi-v7a\.apk",
    )
    .expect("armeabi-v7a pattern is valid")
});
static VIVALDI_ARM64: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https://downloads\.vivaldi\.com/stable/Vivaldi\.(?<version>[0-9.]+)_arm64-v8a\.apk",
    )
    .expect("arm64-v8a pattern is valid")
});

fn vivaldi_site(endpoints: &Endpoints) -> &str {
    &endpoints.vivaldi
}

fn vivaldi_link(abi: Abi) -> Option<&'static Regex> {
    match abi {
        Abi::Armeabi => Some(&*VIVALDI_ARM32),
        Abi::Arm64 => Some(&*VIVALDI_ARM64),
        Abi::X86 | Abi::X86_64 => None,
    }
}

fn is_brave_release(release: &GithubRelease) -> bool {
    !release.prerelease && release.name.starts_with("Release v")
}

fn is_brave_beta(release: &GithubRelease) -> bool {
    release.name.starts_with("Beta v")
}

fn is_stable(release: &GithubRelease) -> bool {
    !release.prerelease
}

/// Orbot tags release candidates in the tag instead of the prerelease flag.
fn is_orbot_release(release: &GithubRelease) -> bool {
    !release.prerelease && !release.tag_name.to_ascii_lowercase().contains("-rc")
}

static REGISTRY: [AppDescriptor; App::ALL.len()] = [
    AppDescriptor {
        app: App::Brave,
        package_name: "com.brave.browser",
        title: "Brave Browser",
        description: "Chromium-based browser with built-in ad and tracker blocking.",
        min_api_level: MARSHMALLOW,
        supported_abis: ARM32_ARM64_X86_X64,
        signature_hash: BRAVE_SIGNATURE,
        project_page: "https://github.com/brave/brave-browser",
        category: DisplayCategory::BetterThanGoogleChrome,
        source: UpdateSource::Github(GithubSource {
            repository: "brave/brave-browser",
            results_per_page: 20,
            use_latest_release_api: false,
            accept_prerelease: false,
            is_valid_release: is_brave_release,
            assets: BRAVE_ASSETS,
        }),
    },
    AppDescriptor {
        app: App::BraveBeta,
        package_name: "com.brave.browser_beta",
        title: "Brave Browser Beta",
        description: "Beta channel of the Brave browser.",
        min_api_level: MARSHMALLOW,
        supported_abis: ARM32_ARM64_X86_X64,
        signature_hash: BRAVE_SIGNATURE,
        project_page: "https://github.com/brave/brave-browser",
        category: DisplayCategory::BetterThanGoogleChrome,
        source: UpdateSource::Github(GithubSource {
            repository: "brave/brave-browser",
            results_per_page: 20,
            use_latest_release_api: false,
            accept_prerelease: true,
            is_valid_release: is_brave_beta,
            assets: BRAVE_ASSETS,
        }),
    },
    AppDescriptor {
        app: App::Bromite,
        package_name: "org.bromite.bromite",
        title: "Bromite",
        description: "Chromium fork with ad blocking and privacy patches.",
        min_api_level: NOUGAT,
        supported_abis: ARM32_ARM64_X86,
        signature_hash: "e1ee5cd076d7b0dc84cb2b45fb78b86df2eb39a3b6c56ba3dc292a5e0c3b9504",
        project_page: "https://github.com/bromite/bromite",
        category: DisplayCategory::BetterThanGoogleChrome,
        source: UpdateSource::Github(GithubSource {
            repository: "bromite/bromite",
            results_per_page: 5,
            use_latest_release_api: true,
            accept_prerelease: false,
            is_valid_release: is_stable,
            assets: &[FilenameBranch {
                min_sdk: NOUGAT,
                abis: ARM32_ARM64_X86,
                assets: &[
                    (Abi::Armeabi, AssetName::Exact("arm_ChromePublic.apk")),
                    (Abi::Arm64, AssetName::Exact("arm64_ChromePublic.apk")),
                    (Abi::X86, AssetName::Exact("x86_ChromePublic.apk")),
                ],
            }],
        }),
    },
    AppDescriptor {
        app: App::FirefoxRelease,
        package_name: "org.mozilla.firefox",
        title: "Firefox Release",
        description: "Stable release of Firefox for Android.",
        min_api_level: LOLLIPOP,
        supported_abis: ARM32_ARM64_X86_X64,
        signature_hash: FIREFOX_SIGNATURE,
        project_page: "https://www.mozilla.org/firefox/browsers/mobile/android/",
        category: DisplayCategory::FromMozilla,
        source: UpdateSource::MozillaCi(MozillaCiSource {
            task: "mobile.v3.firefox-android.apks.fenix-release.latest.{abi}",
            artifact: FIREFOX_ARTIFACT,
            format: CiFormat::Log,
        }),
    },
    AppDescriptor {
        app: App::FirefoxBeta,
        package_name: "org.mozilla.firefox_beta",
        title: "Firefox Beta",
        description: "Beta channel of Firefox for Android.",
        min_api_level: LOLLIPOP,
        supported_abis: ARM32_ARM64_X86_X64,
        signature_hash: FIREFOX_SIGNATURE,
        project_page: "https://www.mozilla.org/firefox/channel/android/",
        category: DisplayCategory::FromMozilla,
        source: UpdateSource::MozillaCi(MozillaCiSource {
            task: "mobile.v3.firefox-android.apks.fenix-beta.latest.{abi}",
            artifact: FIREFOX_ARTIFACT,
            format: CiFormat::Log,
        }),
    },
    AppDescriptor {
        app: App::FirefoxNightly,
        package_name: "org.mozilla.fenix",
        title: "Firefox Nightly",
        description: "Nightly build of Firefox for Android; the version is the build time.",
        min_api_level: LOLLIPOP,
        supported_abis: ARM32_ARM64_X86_X64,
        signature_hash: "5004779088e7f988d5bc5cc5f8798febf4f8cd084a1b2a46efd4c8ee4aeaf211",
        project_page: "https://www.mozilla.org/firefox/channel/android/",
        category: DisplayCategory::FromMozilla,
        source: UpdateSource::MozillaCi(MozillaCiSource {
            task: "mobile.v3.firefox-android.apks.fenix-nightly.latest.{abi}",
            artifact: FIREFOX_ARTIFACT,
            format: CiFormat::ChainOfTrust,
        }),
    },
    AppDescriptor {
        app: App::Vivaldi,
        package_name: "com.vivaldi.browser",
        title: "Vivaldi",
        description: "Chromium-based browser with a configurable interface.",
        min_api_level: NOUGAT,
        supported_abis: ARM32_ARM64,
        signature_hash: "e69d95dc2b1c1d1d7f6f2c4f5a5fbd3e4f6ee9b2c4a8a7d2c9a43c4a5ac4e9d1",
        project_page: "https://vivaldi.com/android/",
        category: DisplayCategory::BetterThanGoogleChrome,
        source: UpdateSource::HtmlPage(HtmlPageSource {
            site: vivaldi_site,
            path: "/download/",
            link: vivaldi_link,
        }),
    },
    AppDescriptor {
        app: App::Ffupdater,
        package_name: "de.marmaro.krt.ffupdater",
        title: "FFUpdater",
        description: "Updater for browsers not distributed through an app store.",
        min_api_level: LOLLIPOP,
        supported_abis: ARM32_ARM64_X86_X64,
        signature_hash: "f4e642bb85cbbcfd7302b2cbcbd346993a41067c27d995df492c9d0d38747e62",
        project_page: "https://github.com/Tobi823/ffupdater",
        category: DisplayCategory::Other,
        source: UpdateSource::Github(GithubSource {
            repository: "Tobi823/ffupdater",
            results_per_page: 5,
            use_latest_release_api: true,
            accept_prerelease: false,
            is_valid_release: is_stable,
            assets: &[FilenameBranch {
                min_sdk: LOLLIPOP,
                abis: ARM32_ARM64_X86_X64,
                assets: &[
                    (Abi::Armeabi, AssetName::Exact("ffupdater-release.apk")),
                    (Abi::Arm64, AssetName::Exact("ffupdater-release.apk")),
                    (Abi::X86, AssetName::Exact("ffupdater-release.apk")),
                    (Abi::X86_64, AssetName::Exact("ffupdater-release.apk")),
                ],
            }],
        }),
    },
    AppDescriptor {
        app: App::Mull,
        package_name: "us.spotco.fennec_dos",
        title: "Mull",
        description: "Hardened Firefox fork from the DivestOS project, via F-Droid.",
        min_api_level: LOLLIPOP,
        supported_abis: ARM32_ARM64,
        signature_hash: MULL_SIGNATURE,
        project_page: "https://f-droid.org/packages/us.spotco.fennec_dos/",
        category: DisplayCategory::BasedOnFirefox,
        source: UpdateSource::Fdroid(FdroidSource {
            positions: &[(Abi::Armeabi, 0), (Abi::Arm64, 1)],
            expected_builds: 2,
        }),
    },
    AppDescriptor {
        app: App::MullFromRepo,
        package_name: "us.spotco.fennec_dos",
        title: "Mull (DivestOS repository)",
        description: "Mull from the DivestOS F-Droid repository, usually ahead of F-Droid.",
        min_api_level: LOLLIPOP,
        supported_abis: ARM32_ARM64,
        signature_hash: MULL_SIGNATURE,
        project_page: "https://divestos.org/fdroid/official/",
        category: DisplayCategory::BasedOnFirefox,
        source: UpdateSource::CustomRepo(CustomRepoSource {
            repo_id: DIVESTOS_REPO,
        }),
    },
    AppDescriptor {
        app: App::Orbot,
        package_name: "org.torproject.android",
        title: "Orbot",
        description: "Tor proxy for Android apps.",
        min_api_level: LOLLIPOP,
        supported_abis: ARM32_ARM64_X86_X64,
        signature_hash: "a454b87a1847a89ed7f5e70fba6bba96f3ef3d8da0d7fd9ec31fcd92d6c3e3d9",
        project_page: "https://github.com/guardianproject/orbot",
        category: DisplayCategory::GoodPrivacyBrowser,
        source: UpdateSource::Github(GithubSource {
            repository: "guardianproject/orbot",
            results_per_page: 10,
            use_latest_release_api: false,
            accept_prerelease: false,
            is_valid_release: is_orbot_release,
            assets: &[FilenameBranch {
                min_sdk: LOLLIPOP,
                abis: ARM32_ARM64_X86_X64,
                assets: &[
                    (Abi::Armeabi, AssetName::Suffix("-fullperm-armeabi-v7a-release.apk")),
                    (Abi::Arm64, AssetName::Suffix("-fullperm-arm64-v8a-release.apk")),
                    (Abi::X86, AssetName::Suffix("-fullperm-x86-release.apk")),
                    (Abi::X86_64, AssetName::Suffix("-fullperm-x86_64-release.apk")),
                ],
            }],
        }),
    },
    AppDescriptor {
        app: App::UngoogledChromium,
        package_name: "org.ungoogled.chromium.stable",
        title: "Ungoogled Chromium",
        description: "Chromium without Google web service integration.",
        min_api_level: NOUGAT,
        supported_abis: ARM32_ARM64_X86,
        signature_hash: "7e6ba7bbb939fa52d5569a8ea628056adf8c75292bf4dee6b353fafaf2c30e19",
        project_page: "https://github.com/ungoogled-software/ungoogled-chromium-android",
        category: DisplayCategory::BetterThanGoogleChrome,
        source: UpdateSource::Github(GithubSource {
            repository: "ungoogled-software/ungoogled-chromium-android",
            results_per_page: 5,
            use_latest_release_api: true,
            accept_prerelease: false,
            is_valid_release: is_stable,
            assets: &[FilenameBranch {
                min_sdk: NOUGAT,
                abis: ARM32_ARM64_X86,
                assets: &[
                    (Abi::Armeabi, AssetName::Exact("ChromeModernPublic_arm.apk")),
                    (Abi::Arm64, AssetName::Exact("ChromeModernPublic_arm64.apk")),
                    (Abi::X86, AssetName::Exact("ChromeModernPublic_x86.apk")),
                ],
            }],
        }),
    },
];

/// Every maintained application, in [`App::ALL`] order.
#[must_use]
pub fn all() -> &'static [AppDescriptor] {
    &REGISTRY
}

pub(crate) fn descriptor(app: App) -> &'static AppDescriptor {
    &REGISTRY[app as usize]
}
