//! Per-user directories used by apkwatch for settings, the HTTP cache and logs.

mod paths;

pub use paths::{AppPaths, AppPathsError};
