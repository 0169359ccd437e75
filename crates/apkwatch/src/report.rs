use std::fmt::Write as _;

use apkwatch_apps::{App, AppDescriptor, DisplayCategory};
use apkwatch_core::{CheckError, LatestUpdate, is_newer_version};
use serde::Serialize;

use crate::batch::CheckOutcome;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSummary {
    pub id: &'static str,
    pub title: &'static str,
    pub package_name: &'static str,
    pub source: &'static str,
    pub min_api_level: u32,
    pub category: DisplayCategory,
    pub project_page: &'static str,
}

impl From<&AppDescriptor> for AppSummary {
    fn from(descriptor: &AppDescriptor) -> Self {
        Self {
            id: descriptor.app.id(),
            title: descriptor.title,
            package_name: descriptor.package_name,
            source: descriptor.source.label(),
            min_api_level: descriptor.min_api_level,
            category: descriptor.category,
            project_page: descriptor.project_page,
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Ok,
    Failed,
    Cancelled,
}

/// One app's entry in the output of `check`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport<'a> {
    pub app: App,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<&'a LatestUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a> CheckReport<'a> {
    pub fn new(outcome: &'a CheckOutcome, installed_version: Option<&'a str>) -> Self {
        match &outcome.result {
            Ok(update) => Self {
                app: outcome.app,
                status: ReportStatus::Ok,
                update: Some(update),
                installed_version,
                update_available: installed_version
                    .map(|installed| is_newer_version(&update.version, installed)),
                error: None,
            },
            Err(error) => Self {
                app: outcome.app,
                status: if matches!(error, CheckError::Cancelled) {
                    ReportStatus::Cancelled
                } else {
                    ReportStatus::Failed
                },
                update: None,
                installed_version,
                update_available: None,
                error: Some(error.to_string()),
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status != ReportStatus::Ok
    }

    pub fn to_line(&self) -> String {
        let mut line = format!("{:<20}", self.app.id());
        match (self.update, &self.error) {
            (Some(update), _) => {
                let _ = write!(line, " {:<16}", update.version);
                if let Some(date) = &update.publish_date {
                    let _ = write!(line, " {}", date.get(..10).unwrap_or(date));
                }
                let _ = write!(line, " {}", update.download_url);
                match (self.update_available, self.installed_version) {
                    (Some(true), Some(installed)) => {
                        let _ = write!(line, " (update available, installed {installed})");
                    }
                    (Some(false), _) => line.push_str(" (up to date)"),
                    _ => {}
                }
            }
            (None, Some(error)) => {
                let _ = write!(line, " error: {error}");
            }
            (None, None) => {}
        }
        line
    }
}

pub fn list_line(summary: &AppSummary) -> String {
    format!(
        "{:<20} {:<28} {:<12} API {:<3} {}",
        summary.id, summary.title, summary.source, summary.min_api_level, summary.package_name
    )
}
