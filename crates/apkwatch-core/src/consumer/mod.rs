//! One consumer per upstream wire format.
//!
//! Consumers borrow a [`Fetcher`](crate::Fetcher), take their predicates as
//! explicit parameters and return a small source-specific result that the
//! app layer maps into [`LatestUpdate`](crate::LatestUpdate).

mod custom_repo;
mod fdroid;
mod github;
mod html;
mod mozilla_ci;

pub use custom_repo::{CustomRepoConsumer, RepoUpdate};
pub use fdroid::{FdroidConsumer, FdroidUpdate, select_positional};
pub use github::{
    GithubAsset, GithubConsumer, GithubRelease, GithubResult, MAX_RELEASE_PAGES, ReleaseQuery,
};
pub use html::{HtmlPageConsumer, PageLink};
pub use mozilla_ci::{CiBuild, MozillaCiConsumer};
