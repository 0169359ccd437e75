use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheBehaviour, ResponseCache};
use crate::error::FetchError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client shared by all source consumers.
///
/// Responses are stored in a [`ResponseCache`] and served according to the
/// [`CacheBehaviour`] passed with every call. Cloning is cheap; clones share
/// the connection pool and cache directory.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    cache: ResponseCache,
    cancel: CancellationToken,
}

impl Fetcher {
    #[must_use]
    pub fn new(client: reqwest::Client, cache: ResponseCache) -> Self {
        Self {
            client,
            cache,
            cancel: CancellationToken::new(),
        }
    }

    /// Build a client with the default user agent and the given request
    /// timeout.
    ///
    /// # Errors
    /// Returns an error when the TLS backend cannot be initialised.
    pub fn with_timeout(
        cache: ResponseCache,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .user_agent(format!("apkwatch/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::new(client, cache))
    }

    /// A fetcher whose in-flight requests abort once `cancel` fires.
    #[must_use]
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            client: self.client.clone(),
            cache: self.cache.clone(),
            cancel,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fetch the raw body of `url`.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-2xx status, a cache miss
    /// under [`CacheBehaviour::ForceCache`], or cancellation.
    pub async fn fetch_bytes(
        &self,
        url: &str,
        behaviour: CacheBehaviour,
    ) -> Result<Vec<u8>, FetchError> {
        if self.cancel.is_cancelled() {
            return Err(FetchError::Cancelled { url: url.to_string() });
        }

        if behaviour != CacheBehaviour::ForceNetwork {
            let cached = match self.cache.load(url) {
                Ok(cached) => cached,
                Err(error) if behaviour == CacheBehaviour::ForceCache => {
                    return Err(FetchError::cache(url, error));
                }
                Err(error) => {
                    warn!("Unreadable cache entry for {url}, fetching instead: {error}");
                    None
                }
            };
            match (behaviour, cached) {
                (CacheBehaviour::ForceCache, Some(entry)) => {
                    debug!("Serving {url} from cache (forced)");
                    return Ok(entry.body);
                }
                (CacheBehaviour::ForceCache, None) => {
                    return Err(FetchError::CacheMiss { url: url.to_string() });
                }
                (_, Some(entry)) if self.cache.is_fresh(&entry, Utc::now()) => {
                    debug!("Serving {url} from cache");
                    return Ok(entry.body);
                }
                _ => {}
            }
        }

        let body = tokio::select! {
            () = self.cancel.cancelled() => {
                debug!("Request to {url} cancelled");
                return Err(FetchError::Cancelled { url: url.to_string() });
            }
            result = self.download(url) => result?,
        };

        if let Err(error) = self.cache.store(url, &body) {
            warn!("Failed to cache response of {url}: {error}");
        }
        Ok(body)
    }

    /// Fetch `url` as UTF-8 text.
    ///
    /// # Errors
    /// Same as [`Fetcher::fetch_bytes`], plus a decode error for non-UTF-8
    /// bodies.
    pub async fn fetch_text(
        &self,
        url: &str,
        behaviour: CacheBehaviour,
    ) -> Result<String, FetchError> {
        let body = self.fetch_bytes(url, behaviour).await?;
        String::from_utf8(body).map_err(|error| FetchError::decode(url, "UTF-8 text", error))
    }

    /// Fetch `url` as a JSON document.
    ///
    /// # Errors
    /// Same as [`Fetcher::fetch_bytes`], plus a decode error when the body is
    /// not JSON.
    pub async fn fetch_json(
        &self,
        url: &str,
        behaviour: CacheBehaviour,
    ) -> Result<Value, FetchError> {
        let body = self.fetch_bytes(url, behaviour).await?;
        serde_json::from_slice(&body).map_err(|error| FetchError::decode(url, "JSON", error))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!("Fetching {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| FetchError::request(url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::status(url, status, &body));
        }

        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|source| FetchError::Body {
                url: url.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::time::{Duration, Instant};

    use tokio_util::sync::CancellationToken;

    use super::Fetcher;
    use crate::cache::{CacheBehaviour, ResponseCache};
    use crate::error::FetchError;

    fn fetcher(dir: &std::path::Path) -> Fetcher {
        Fetcher::new(
            reqwest::Client::new(),
            ResponseCache::new(dir, Duration::from_secs(600)),
        )
    }

    #[tokio::test]
    async fn use_cache_serves_second_request_from_disk() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/doc.json")
            .with_status(200)
            .with_body(r#"{"answer":42}"#)
            .expect(1)
            .create_async()
            .await;
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let fetcher = fetcher(temp_dir.path());
        let url = format!("{}/doc.json", server.url());

        let first = fetcher
            .fetch_json(&url, CacheBehaviour::UseCache)
            .await
            .expect("first fetch");
        let second = fetcher
            .fetch_json(&url, CacheBehaviour::UseCache)
            .await
            .expect("second fetch");

        assert_eq!(first, second);
        assert_eq!(first["answer"], 42);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn force_network_bypasses_fresh_entry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/doc.txt")
            .with_status(200)
            .with_body("fresh")
            .expect(2)
            .create_async()
            .await;
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let fetcher = fetcher(temp_dir.path());
        let url = format!("{}/doc.txt", server.url());

        fetcher
            .fetch_text(&url, CacheBehaviour::ForceNetwork)
            .await
            .expect("first fetch");
        let text = fetcher
            .fetch_text(&url, CacheBehaviour::ForceNetwork)
            .await
            .expect("second fetch");

        assert_eq!(text, "fresh");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn force_cache_never_touches_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/doc.txt").expect(0).create_async().await;
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let fetcher = fetcher(temp_dir.path());
        let url = format!("{}/doc.txt", server.url());

        let error = fetcher
            .fetch_text(&url, CacheBehaviour::ForceCache)
            .await
            .expect_err("nothing cached yet");
        assert!(matches!(error, FetchError::CacheMiss { .. }));

        fetcher.cache().store(&url, b"stored").expect("seed cache");
        let text = fetcher.fetch_text(&url, CacheBehaviour::ForceCache).await.expect("cached");
        assert_eq!(text, "stored");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_reported_with_url() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("Not Found")
            .create_async()
            .await;
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let url = format!("{}/missing", server.url());

        let error = fetcher(temp_dir.path())
            .fetch_bytes(&url, CacheBehaviour::UseCache)
            .await
            .expect_err("404 must fail");

        assert_eq!(error.url(), url);
        assert_eq!(error.http_status(), Some(reqwest::StatusCode::NOT_FOUND));
        assert!(error.to_string().ends_with("HTTP 404 Not Found: Not Found"));
    }

    #[tokio::test]
    async fn invalid_json_is_a_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/broken.json")
            .with_status(200)
            .with_body("{\"packages\": [")
            .create_async()
            .await;
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let url = format!("{}/broken.json", server.url());

        let error = fetcher(temp_dir.path())
            .fetch_json(&url, CacheBehaviour::UseCache)
            .await
            .expect_err("invalid JSON must fail");

        assert!(matches!(error, FetchError::Decode { expected: "JSON", .. }));
    }

    #[tokio::test]
    async fn cancelled_fetcher_does_not_send_requests() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/doc.txt").expect(0).create_async().await;
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let token = CancellationToken::new();
        let fetcher = fetcher(temp_dir.path()).with_cancellation(token.clone());
        token.cancel();

        let error = fetcher
            .fetch_text(&format!("{}/doc.txt", server.url()), CacheBehaviour::ForceNetwork)
            .await
            .expect_err("cancelled");

        assert!(matches!(error, FetchError::Cancelled { .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreadable_entry_falls_back_to_network_unless_forced() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/doc.txt")
            .with_status(200)
            .with_body("from network")
            .expect(1)
            .create_async()
            .await;
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let fetcher = fetcher(temp_dir.path());
        let url = format!("{}/doc.txt", server.url());
        std::fs::create_dir_all(fetcher.cache().entry_path(&url))
            .expect("directory in place of the entry");

        let text = fetcher
            .fetch_text(&url, CacheBehaviour::UseCache)
            .await
            .expect("network fallback");
        assert_eq!(text, "from network");

        let error = fetcher
            .fetch_text(&url, CacheBehaviour::ForceCache)
            .await
            .expect_err("forced cache read must fail");
        assert!(matches!(error, FetchError::Cache { .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn cancellation_aborts_an_in_flight_request() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/slow")
            .with_status(200)
            .with_chunked_body(|writer| {
                std::thread::sleep(Duration::from_secs(2));
                writer.write_all(b"too late")
            })
            .create_async()
            .await;
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let token = CancellationToken::new();
        let fetcher = fetcher(temp_dir.path()).with_cancellation(token.clone());
        let url = format!("{}/slow", server.url());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        });
        let started = Instant::now();
        let error = fetcher
            .fetch_bytes(&url, CacheBehaviour::ForceNetwork)
            .await
            .expect_err("cancelled mid-request");

        assert!(matches!(error, FetchError::Cancelled { .. }), "got {error:?}");
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(fetcher.cache().load(&url).expect("readable cache").is_none());
    }
}
