use std::path::PathBuf;
use std::time::Duration;

use apkwatch_apps::App;
use apkwatch_core::{Abi, DeviceProfile, Endpoints};
use apkwatch_platform::AppPaths;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Device used when neither the settings nor the command line name one:
/// a current 64-bit ARM phone.
const DEFAULT_DEVICE_ABIS: [Abi; 2] = [Abi::Arm64, Abi::Armeabi];
const DEFAULT_SDK_LEVEL: u32 = 34;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_minutes: u64,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_check_timeout")]
    pub check_timeout_secs: u64,

    #[serde(default = "default_max_concurrent_checks")]
    pub max_concurrent_checks: usize,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,

    #[serde(default)]
    pub prefer_32bit: bool,

    /// ABIs of the target device, most preferred first.
    #[serde(default = "default_device_abis")]
    pub device_abis: Vec<Abi>,

    #[serde(default = "default_sdk_level")]
    pub sdk_level: u32,

    /// Apps skipped when `check` is run without explicit app ids.
    #[serde(default)]
    pub disabled_apps: Vec<App>,

    #[serde(default)]
    pub endpoints: Endpoints,
}

fn default_cache_ttl() -> u64 {
    60
}

fn default_http_timeout() -> u64 {
    30
}

fn default_check_timeout() -> u64 {
    120
}

fn default_max_concurrent_checks() -> usize {
    4
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_device_abis() -> Vec<Abi> {
    DEFAULT_DEVICE_ABIS.to_vec()
}

fn default_sdk_level() -> u32 {
    DEFAULT_SDK_LEVEL
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_ttl_minutes: default_cache_ttl(),
            http_timeout_secs: default_http_timeout(),
            check_timeout_secs: default_check_timeout(),
            max_concurrent_checks: default_max_concurrent_checks(),
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
            prefer_32bit: false,
            device_abis: default_device_abis(),
            sdk_level: default_sdk_level(),
            disabled_apps: Vec::new(),
            endpoints: Endpoints::default(),
        }
    }
}

impl Settings {
    /// Read the settings file; a missing file yields defaults.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load(paths: &AppPaths) -> Result<Self, SettingsError> {
        let path = paths.settings_file();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => return Err(SettingsError::Read { path, source }),
        };
        serde_json::from_str(&content).map_err(|source| SettingsError::Parse { path, source })
    }

    /// Like [`Settings::load`], but falls back to defaults and hands back the
    /// error so it can be reported once logging is up.
    pub fn load_or_default(paths: &AppPaths) -> (Self, Option<SettingsError>) {
        match Self::load(paths) {
            Ok(settings) => (settings, None),
            Err(error) => (Self::default(), Some(error)),
        }
    }

    pub fn save(&self, paths: &AppPaths) -> Result<(), std::io::Error> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        let settings_path = paths.settings_file();
        let tmp_path = settings_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &settings_path)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes.saturating_mul(60))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    pub fn device_profile(&self) -> DeviceProfile {
        DeviceProfile::new(self.device_abis.clone(), self.sdk_level)
            .with_prefer_32bit(self.prefer_32bit)
    }

    /// Registry order, minus disabled apps.
    pub fn enabled_apps(&self) -> Vec<App> {
        App::ALL
            .into_iter()
            .filter(|app| !self.disabled_apps.contains(app))
            .collect()
    }
}
