use std::time::Duration;

use thiserror::Error;

use crate::abi::UnsupportedAbi;

/// Failure of a single cached HTTP fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with HTTP {status}{body_snippet}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        body_snippet: String,
    },
    #[error("failed to read response body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("response of {url} is not valid {expected}: {details}")]
    Decode {
        url: String,
        expected: &'static str,
        details: String,
    },
    #[error("no cached response for {url}")]
    CacheMiss { url: String },
    #[error("cache entry for {url} is unusable: {source}")]
    Cache {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("request to {url} was cancelled")]
    Cancelled { url: String },
}

impl FetchError {
    pub(crate) fn request(url: &str, source: reqwest::Error) -> Self {
        Self::Request {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn status(url: &str, status: reqwest::StatusCode, body: &str) -> Self {
        Self::HttpStatus {
            url: url.to_string(),
            status,
            body_snippet: response_snippet(body, 160),
        }
    }

    pub(crate) fn decode(url: &str, expected: &'static str, details: impl ToString) -> Self {
        Self::Decode {
            url: url.to_string(),
            expected,
            details: details.to_string(),
        }
    }

    pub(crate) fn cache(url: &str, source: std::io::Error) -> Self {
        Self::Cache {
            url: url.to_string(),
            source,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Request { url, .. }
            | Self::HttpStatus { url, .. }
            | Self::Body { url, .. }
            | Self::Decode { url, .. }
            | Self::CacheMiss { url }
            | Self::Cache { url, .. }
            | Self::Cancelled { url } => url,
        }
    }

    #[must_use]
    pub fn http_status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Request { source, .. } | Self::Body { source, .. } => source.status(),
            _ => None,
        }
    }
}

fn response_snippet(body: &str, max_chars: usize) -> String {
    let snippet: String = body.chars().take(max_chars).collect();
    if snippet.is_empty() {
        String::new()
    } else {
        format!(": {snippet}")
    }
}

/// Structural fault found while walking a parsed document.
#[derive(Debug, Error)]
pub enum MalformedCause {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("missing field `{0}`")]
    MissingField(String),
    #[error("field `{field}` is not {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
    #[error("index {index} is out of range for {len} elements")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("`{0}` is empty")]
    Empty(String),
    #[error("{0}")]
    Invalid(String),
}

/// Reason a single application's update check failed.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("network error: {0}")]
    Network(#[source] FetchError),
    #[error("document from {url} is malformed, clear the cache and retry: {cause}")]
    MalformedResponse {
        url: String,
        #[source]
        cause: MalformedCause,
    },
    #[error(transparent)]
    UnsupportedAbi(#[from] UnsupportedAbi),
    #[error("requires Android API level {required}, the device runs {actual}")]
    UnsupportedSdk { required: u32, actual: u32 },
    #[error("{context}: expected {expected} candidates but the source returned {actual}")]
    UnexpectedCandidateCount {
        context: String,
        expected: usize,
        actual: usize,
    },
    #[error("no release from {origin} matched: {details}")]
    NoMatchingRelease { origin: String, details: String },
    #[error("download URL `{url}` is invalid: {details}")]
    InvalidDownloadUrl { url: String, details: String },
    #[error("update check was cancelled")]
    Cancelled,
    #[error("update check timed out after {0:?}")]
    TimedOut(Duration),
}

impl CheckError {
    pub fn malformed(url: impl Into<String>, cause: impl Into<MalformedCause>) -> Self {
        Self::MalformedResponse {
            url: url.into(),
            cause: cause.into(),
        }
    }

    pub fn unexpected_count(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::UnexpectedCandidateCount {
            context: context.into(),
            expected,
            actual,
        }
    }

    pub fn no_match(origin: impl Into<String>, details: impl Into<String>) -> Self {
        Self::NoMatchingRelease {
            origin: origin.into(),
            details: details.into(),
        }
    }

    /// The check stopped because it was cancelled or ran out of time, not
    /// because something upstream failed.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::TimedOut(_))
    }
}

impl From<FetchError> for CheckError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Cancelled { .. } => Self::Cancelled,
            other => Self::Network(other),
        }
    }
}
