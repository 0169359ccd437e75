//! Maintained applications and how to find their latest builds.
//!
//! Each [`App`] maps to a static [`AppDescriptor`] whose [`UpdateSource`]
//! names the upstream consumer plus the app-specific predicates and filename
//! tables. [`AppDescriptor::check_for_update`] turns that into a
//! [`LatestUpdate`](apkwatch_core::LatestUpdate).

mod app;
mod descriptor;
pub mod registry;
mod source;

pub use app::{App, UnknownApp};
pub use descriptor::{AppDescriptor, CheckContext, DisplayCategory};
pub use source::{
    AssetName, CiFormat, CustomRepoSource, FdroidSource, FilenameBranch, GithubSource,
    HtmlPageSource, MozillaCiSource, UpdateSource, expected_asset,
};
