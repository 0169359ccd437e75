//! Update resolution core for apkwatch.
//!
//! This crate knows how to ask upstream sources for the newest build of an
//! Android app, independent of any concrete app:
//! - ABI selection for a device profile.
//! - A cached HTTP fetcher honouring a per-call cache policy.
//! - Consumers for GitHub releases, the F-Droid API, Mozilla Taskcluster,
//!   third-party F-Droid repositories and vendor download pages.
//! - The `LatestUpdate` result record and version helpers.

pub mod abi;
mod cache;
pub mod consumer;
mod document;
mod endpoints;
mod error;
mod fetcher;
mod update;

/// ABI model and the best-ABI resolver.
pub use abi::{Abi, DeviceProfile, UnknownAbi, UnsupportedAbi, find_best_abi};
/// On-disk response cache and the per-call cache policy.
pub use cache::{CacheBehaviour, CachedResponse, ResponseCache};
/// Upstream base URLs.
pub use endpoints::{DIVESTOS_REPO, Endpoints};
/// Error taxonomy shared by every consumer.
pub use error::{CheckError, FetchError, MalformedCause};
/// Cached, cancellable HTTP fetcher.
pub use fetcher::Fetcher;
/// Update record and version comparison helpers.
pub use update::{
    LatestUpdate, is_newer_version, normalize_sha256, parse_sha256_digest, strip_version_prefix,
};
