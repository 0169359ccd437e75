use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// CPU architecture an APK can be built for.
///
/// The declaration order is the canonical order used when listing ABIs; it
/// carries no preference on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Abi {
    #[serde(rename = "armeabi-v7a")]
    Armeabi,
    #[serde(rename = "arm64-v8a")]
    Arm64,
    #[serde(rename = "x86")]
    X86,
    #[serde(rename = "x86_64")]
    X86_64,
}

pub const ARM32_ARM64_X86_X64: &[Abi] = &[Abi::Armeabi, Abi::Arm64, Abi::X86, Abi::X86_64];
pub const ARM32_ARM64_X86: &[Abi] = &[Abi::Armeabi, Abi::Arm64, Abi::X86];
pub const ARM32_ARM64: &[Abi] = &[Abi::Armeabi, Abi::Arm64];
pub const ARM32_X86: &[Abi] = &[Abi::Armeabi, Abi::X86];

impl Abi {
    pub const ALL: [Abi; 4] = [Abi::Armeabi, Abi::Arm64, Abi::X86, Abi::X86_64];

    /// ABI name as reported by the platform (`Build.SUPPORTED_ABIS`).
    #[must_use]
    pub fn platform_name(self) -> &'static str {
        match self {
            Abi::Armeabi => "armeabi-v7a",
            Abi::Arm64 => "arm64-v8a",
            Abi::X86 => "x86",
            Abi::X86_64 => "x86_64",
        }
    }

    #[must_use]
    pub fn is_32bit(self) -> bool {
        matches!(self, Abi::Armeabi | Abi::X86)
    }
}

impl fmt::Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.platform_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown ABI: {0}")]
pub struct UnknownAbi(pub String);

impl FromStr for Abi {
    type Err = UnknownAbi;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "armeabi-v7a" | "armeabi" | "arm" => Ok(Abi::Armeabi),
            "arm64-v8a" | "arm64" | "aarch64" => Ok(Abi::Arm64),
            "x86" | "i686" => Ok(Abi::X86),
            "x86_64" | "x64" => Ok(Abi::X86_64),
            other => Err(UnknownAbi(other.to_string())),
        }
    }
}

/// No ABI is shared between the device and the application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("none of the device ABIs [{}] is supported by the app [{}]", join(.device), join(.app))]
pub struct UnsupportedAbi {
    pub device: Vec<Abi>,
    pub app: Vec<Abi>,
}

fn join(abis: &[Abi]) -> String {
    abis.iter()
        .map(|abi| abi.platform_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Capabilities of the device updates are resolved for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Supported ABIs, most preferred first.
    pub abis: Vec<Abi>,
    pub sdk_level: u32,
    #[serde(default)]
    pub prefer_32bit: bool,
}

impl DeviceProfile {
    #[must_use]
    pub fn new(abis: Vec<Abi>, sdk_level: u32) -> Self {
        Self {
            abis,
            sdk_level,
            prefer_32bit: false,
        }
    }

    #[must_use]
    pub fn with_prefer_32bit(mut self, prefer_32bit: bool) -> Self {
        self.prefer_32bit = prefer_32bit;
        self
    }

    /// Pick the single ABI whose artifact should be installed.
    ///
    /// # Errors
    /// Returns [`UnsupportedAbi`] when the device shares no ABI with `app_abis`.
    pub fn find_best_abi(&self, app_abis: &[Abi]) -> Result<Abi, UnsupportedAbi> {
        find_best_abi(&self.abis, app_abis, self.prefer_32bit)
    }

    /// Whether the device runs at least the given API level.
    #[must_use]
    pub fn supports_sdk(&self, level: u32) -> bool {
        self.sdk_level >= level
    }
}

/// Intersect `device_abis` (ordered by preference) with `app_abis` and pick
/// the most preferred match, or the most preferred 32-bit match when
/// `prefer_32bit` is set and one exists.
///
/// # Errors
/// Returns [`UnsupportedAbi`] when the intersection is empty.
pub fn find_best_abi(
    device_abis: &[Abi],
    app_abis: &[Abi],
    prefer_32bit: bool,
) -> Result<Abi, UnsupportedAbi> {
    let mut candidates = device_abis.iter().copied().filter(|abi| app_abis.contains(abi));
    let first = candidates.next().ok_or_else(|| UnsupportedAbi {
        device: device_abis.to_vec(),
        app: app_abis.to_vec(),
    })?;

    if prefer_32bit
        && !first.is_32bit()
        && let Some(abi) = candidates.find(|abi| abi.is_32bit())
    {
        return Ok(abi);
    }
    Ok(first)
}
