//! Model artifact acquisition.
//!
//! Artifacts come from a local path or a remote URL. Remote artifacts are
//! downloaded once into a cache directory and reused on later start-ups; a
//! download lands in a uniquely named partial file and is renamed into place,
//! so a reader never sees a half-written artifact.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::errors::{HepatitisError, HepatitisResult};

/// Where an artifact is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSource {
    Path(PathBuf),
    Url(String),
}

impl std::fmt::Display for ArtifactSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactSource::Path(path) => write!(f, "{}", path.display()),
            ArtifactSource::Url(url) => write!(f, "{url}"),
        }
    }
}

/// Lowercase hex SHA-256 of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Compare a file's digest against a pinned value (case-insensitive).
pub fn digest_matches(bytes: &[u8], expected: &str) -> bool {
    sha256_hex(bytes).eq_ignore_ascii_case(expected.trim())
}

/// Cache file name for a URL: a short digest of the full URL (to keep
/// distinct URLs apart) followed by the sanitized last path segment.
pub fn cache_file_name(url: &str) -> String {
    let prefix = &sha256_hex(url.as_bytes())[..12];
    let without_query = url.split(['?', '#']).next().unwrap_or_default();
    let after_scheme = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);
    let last = after_scheme
        .split_once('/')
        .map_or("", |(_, path)| path)
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let sanitized: String = last
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    if sanitized.chars().all(|c| c == '.') {
        format!("{prefix}.artifact")
    } else {
        format!("{prefix}-{sanitized}")
    }
}

/// Default cache location for downloaded artifacts.
pub fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("hepatitis-risk")
}

/// Resolves artifact sources to verified local files.
pub struct ArtifactFetcher {
    client: reqwest::Client,
    cache_dir: PathBuf,
}

impl ArtifactFetcher {
    pub fn new(cache_dir: impl Into<PathBuf>, timeout: Duration) -> HepatitisResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HepatitisError::network("building http client", e))?;
        Ok(Self {
            client,
            cache_dir: cache_dir.into(),
        })
    }

    /// Local path of a verified artifact, fetching it first if needed.
    pub async fn acquire(&self, source: &ArtifactSource, sha256: Option<&str>) -> HepatitisResult<PathBuf> {
        match source {
            ArtifactSource::Path(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| HepatitisError::io(format!("reading {}", path.display()), e))?;
                if let Some(expected) = sha256 {
                    if !digest_matches(&bytes, expected) {
                        return Err(HepatitisError::artifact(
                            path.display().to_string(),
                            format!("sha256 mismatch, expected {expected}"),
                        ));
                    }
                }
                Ok(path.clone())
            }
            ArtifactSource::Url(url) => self.acquire_remote(url, sha256).await,
        }
    }

    async fn acquire_remote(&self, url: &str, sha256: Option<&str>) -> HepatitisResult<PathBuf> {
        let dest = self.cache_dir.join(cache_file_name(url));

        match tokio::fs::read(&dest).await {
            Ok(cached) if !cached.is_empty() => match sha256 {
                Some(expected) if !digest_matches(&cached, expected) => {
                    warn!(path = %dest.display(), "cached artifact fails sha256 check, fetching again");
                }
                _ => {
                    info!(url, path = %dest.display(), "using cached artifact");
                    return Ok(dest);
                }
            },
            Ok(_) => debug!(path = %dest.display(), "cached artifact is empty, fetching again"),
            Err(_) => debug!(path = %dest.display(), "artifact not cached"),
        }

        tokio::fs::create_dir_all(&self.cache_dir).await.map_err(|e| {
            HepatitisError::io(format!("creating cache dir {}", self.cache_dir.display()), e)
        })?;

        info!(url, "downloading artifact");
        let bytes = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| HepatitisError::network(format!("fetching {url}"), e))?
            .bytes()
            .await
            .map_err(|e| HepatitisError::network(format!("reading body of {url}"), e))?;

        if bytes.is_empty() {
            return Err(HepatitisError::artifact(url, "downloaded artifact is empty"));
        }
        if let Some(expected) = sha256 {
            if !digest_matches(&bytes, expected) {
                return Err(HepatitisError::artifact(
                    url,
                    format!("sha256 mismatch, expected {expected}, got {}", sha256_hex(&bytes)),
                ));
            }
        }

        let partial = dest.with_file_name(format!(
            "{}.partial-{}",
            cache_file_name(url),
            uuid::Uuid::new_v4()
        ));
        tokio::fs::write(&partial, &bytes)
            .await
            .map_err(|e| HepatitisError::io(format!("writing {}", partial.display()), e))?;
        if let Err(e) = tokio::fs::rename(&partial, &dest).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(HepatitisError::io(format!("moving artifact to {}", dest.display()), e));
        }

        info!(url, path = %dest.display(), size = bytes.len(), "artifact cached");
        Ok(dest)
    }
}
