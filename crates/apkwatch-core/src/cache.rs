use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// How a fetch may use previously stored responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBehaviour {
    /// Serve a stored response while it is younger than the TTL.
    #[default]
    UseCache,
    /// Always go to the network and refresh the stored response.
    ForceNetwork,
    /// Only serve stored responses, whatever their age.
    ForceCache,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryHeader {
    url: String,
    cached_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub body: Vec<u8>,
    pub cached_at: DateTime<Utc>,
}

/// On-disk store of raw HTTP response bodies keyed by URL.
///
/// Each entry is a single file: one JSON header line followed by the body
/// bytes. Entries are replaced atomically, so concurrent writers of the same
/// URL end with one complete entry (last writer wins).
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub(crate) fn entry_path(&self, url: &str) -> PathBuf {
        let key = Sha256::digest(url.as_bytes());
        self.dir.join(format!("{key:x}.entry"))
    }

    /// Read the stored response for `url`.
    ///
    /// Corrupt entries and entries written for a different URL are reported
    /// as absent.
    ///
    /// # Errors
    /// Returns an error when the entry exists but cannot be read.
    pub fn load(&self, url: &str) -> std::io::Result<Option<CachedResponse>> {
        let path = self.entry_path(url);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error),
        };

        let Some(split) = data.iter().position(|&b| b == b'\n') else {
            warn!("Ignoring cache entry without header: {}", path.display());
            return Ok(None);
        };
        let header: EntryHeader = match serde_json::from_slice(&data[..split]) {
            Ok(header) => header,
            Err(error) => {
                warn!("Ignoring cache entry with invalid header {}: {error}", path.display());
                return Ok(None);
            }
        };
        if header.url != url {
            debug!("Cache key collision for {url}, ignoring entry for {}", header.url);
            return Ok(None);
        }

        Ok(Some(CachedResponse {
            body: data[split + 1..].to_vec(),
            cached_at: header.cached_at,
        }))
    }

    #[must_use]
    pub fn is_fresh(&self, entry: &CachedResponse, now: DateTime<Utc>) -> bool {
        let Ok(ttl) = chrono::Duration::from_std(self.ttl) else {
            return true;
        };
        now.signed_duration_since(entry.cached_at) <= ttl
    }

    /// Store `body` as the response for `url`.
    ///
    /// # Errors
    /// Returns an error when the cache directory or entry cannot be written.
    pub fn store(&self, url: &str, body: &[u8]) -> std::io::Result<()> {
        self.store_at(url, body, Utc::now())
    }

    fn store_at(&self, url: &str, body: &[u8], cached_at: DateTime<Utc>) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let header = EntryHeader {
            url: url.to_string(),
            cached_at,
        };
        let mut data = serde_json::to_vec(&header).map_err(std::io::Error::other)?;
        data.push(b'\n');
        data.extend_from_slice(body);
        write_atomic(&self.entry_path(url), &data)
    }

    /// Delete every stored entry.
    ///
    /// # Errors
    /// Returns an error when the cache directory cannot be listed.
    pub fn clear(&self) -> std::io::Result<usize> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(error) => return Err(error),
        };
        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "entry")
                && std::fs::remove_file(&path).is_ok()
            {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "cache path has no parent")
    })?;

    let file_name = path
        .file_name()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("entry");
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let pid = std::process::id();

    let mut tmp_path = None;
    for attempt in 0..16_u8 {
        let candidate = parent.join(format!(".{file_name}.{pid}.{timestamp}.{attempt}.tmp"));
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut file) => {
                file.write_all(data)?;
                file.sync_all()?;
                tmp_path = Some(candidate);
                break;
            }
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(error) => return Err(error),
        }
    }

    let Some(tmp_path) = tmp_path else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "failed to create unique cache temp file",
        ));
    };

    if let Err(error) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(error);
    }

    Ok(())
}
