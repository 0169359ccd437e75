use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::descriptor::AppDescriptor;
use crate::registry;

/// Identifier of a maintained application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum App {
    Brave,
    BraveBeta,
    Bromite,
    FirefoxRelease,
    FirefoxBeta,
    FirefoxNightly,
    Vivaldi,
    Ffupdater,
    Mull,
    MullFromRepo,
    Orbot,
    UngoogledChromium,
}

impl App {
    pub const ALL: [App; 12] = [
        App::Brave,
        App::BraveBeta,
        App::Bromite,
        App::FirefoxRelease,
        App::FirefoxBeta,
        App::FirefoxNightly,
        App::Vivaldi,
        App::Ffupdater,
        App::Mull,
        App::MullFromRepo,
        App::Orbot,
        App::UngoogledChromium,
    ];

    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            App::Brave => "brave",
            App::BraveBeta => "brave-beta",
            App::Bromite => "bromite",
            App::FirefoxRelease => "firefox-release",
            App::FirefoxBeta => "firefox-beta",
            App::FirefoxNightly => "firefox-nightly",
            App::Vivaldi => "vivaldi",
            App::Ffupdater => "ffupdater",
            App::Mull => "mull",
            App::MullFromRepo => "mull-from-repo",
            App::Orbot => "orbot",
            App::UngoogledChromium => "ungoogled-chromium",
        }
    }

    #[must_use]
    pub fn descriptor(self) -> &'static AppDescriptor {
        registry::descriptor(self)
    }
}

impl fmt::Display for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown app `{0}`, run `apkwatch list` for the known ids")]
pub struct UnknownApp(pub String);

impl FromStr for App {
    type Err = UnknownApp;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().to_ascii_lowercase().replace('_', "-");
        App::ALL
            .into_iter()
            .find(|app| app.id() == id)
            .ok_or_else(|| UnknownApp(s.to_string()))
    }
}
