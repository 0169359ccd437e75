use log::info;
use regex::Regex;

use crate::cache::CacheBehaviour;
use crate::error::CheckError;
use crate::fetcher::Fetcher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub url: String,
    /// Value of the `version` capture group, if the pattern has one.
    pub version: Option<String>,
}

/// Finds download links on vendor web pages.
pub struct HtmlPageConsumer<'a> {
    fetcher: &'a Fetcher,
}

impl<'a> HtmlPageConsumer<'a> {
    #[must_use]
    pub fn new(fetcher: &'a Fetcher) -> Self {
        Self { fetcher }
    }

    /// First match of `pattern` on `page_url`, resolved against the page URL.
    ///
    /// # Errors
    /// Returns an error when the page cannot be fetched or nothing matches.
    pub async fn find_link(
        &self,
        page_url: &str,
        pattern: &Regex,
        cache: CacheBehaviour,
    ) -> Result<PageLink, CheckError> {
        let page = self.fetcher.fetch_text(page_url, cache).await?;
        let link = find_in_page(page_url, &page, pattern)?;
        info!("Found {} on {page_url}", link.url);
        Ok(link)
    }
}

pub(crate) fn find_in_page(
    page_url: &str,
    page: &str,
    pattern: &Regex,
) -> Result<PageLink, CheckError> {
    let captures = pattern
        .captures(page)
        .ok_or_else(|| CheckError::no_match(page_url, format!("no link matches `{pattern}`")))?;
    let raw = captures.get(0).map_or("", |m| m.as_str());

    let url = reqwest::Url::parse(page_url)
        .and_then(|base| base.join(raw))
        .map_err(|error| CheckError::InvalidDownloadUrl {
            url: raw.to_string(),
            details: error.to_string(),
        })?;

    Ok(PageLink {
        url: url.into(),
        version: captures.name("version").map(|m| m.as_str().to_string()),
    })
}
