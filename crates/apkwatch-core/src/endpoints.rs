use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Base URLs of the upstream services. Overridable for mirrors and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub github_api: String,
    pub fdroid: String,
    pub gitlab_api: String,
    /// GitLab project id of the F-Droid metadata repository.
    pub fdroid_data_project: u64,
    pub mozilla_ci: String,
    /// Site hosting the Vivaldi download page.
    pub vivaldi: String,
    /// Roots of third-party F-Droid repositories, by repository id.
    pub custom_repos: BTreeMap<String, String>,
}

pub const DIVESTOS_REPO: &str = "divestos";

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            github_api: "https://api.github.com".to_string(),
            fdroid: "https://f-droid.org".to_string(),
            gitlab_api: "https://gitlab.com/api/v4".to_string(),
            fdroid_data_project: 36528,
            mozilla_ci: "https://firefox-ci-tc.services.mozilla.com".to_string(),
            vivaldi: "https://vivaldi.com".to_string(),
            custom_repos: BTreeMap::from([(
                DIVESTOS_REPO.to_string(),
                "https://divestos.org/fdroid/official".to_string(),
            )]),
        }
    }
}

impl Endpoints {
    /// Point every service at the same root, as done by mock servers.
    /// Custom repositories move to `{root}/{id}`.
    #[must_use]
    pub fn single_host(root: &str) -> Self {
        let root = root.trim_end_matches('/');
        let defaults = Self::default();
        Self {
            github_api: root.to_string(),
            fdroid: root.to_string(),
            gitlab_api: format!("{root}/api/v4"),
            mozilla_ci: root.to_string(),
            vivaldi: root.to_string(),
            custom_repos: defaults
                .custom_repos
                .keys()
                .map(|id| (id.clone(), format!("{root}/{id}")))
                .collect(),
            ..defaults
        }
    }

    #[must_use]
    pub fn custom_repo(&self, id: &str) -> Option<&str> {
        self.custom_repos.get(id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_keep_default_urls() {
        let endpoints: Endpoints =
            serde_json::from_str(r#"{ "fdroid": "https://mirror.example/fdroid" }"#)
                .expect("valid json");

        assert_eq!(endpoints.fdroid, "https://mirror.example/fdroid");
        assert_eq!(endpoints.github_api, "https://api.github.com");
        assert_eq!(
            endpoints.custom_repo(DIVESTOS_REPO),
            Some("https://divestos.org/fdroid/official")
        );
    }

    #[test]
    fn single_host_moves_custom_repos() {
        let endpoints = Endpoints::single_host("http://127.0.0.1:1234/");
        assert_eq!(endpoints.custom_repo(DIVESTOS_REPO), Some("http://127.0.0.1:1234/divestos"));
        assert_eq!(endpoints.gitlab_api, "http://127.0.0.1:1234/api/v4");
    }
}
