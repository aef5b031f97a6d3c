//! HTTP repodata source with an on-disk cache

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use tokio::fs;
use tracing::debug;

use crate::repodata::error::FetchError;
use crate::repodata::source::RepoDataSource;
use crate::repodata::types::RepoData;

const DEFAULT_BASE_URL: &str = "https://conda.anaconda.org";

/// How long a cached index is served without a network round-trip.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Fetches `repodata.json` per channel/platform pair, keeping a copy of
/// each index under the cache directory.
pub struct HttpRepoDataSource {
    client: Client,
    base_url: String,
    cache_dir: PathBuf,
    cache_ttl: Duration,
}

impl HttpRepoDataSource {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string(), cache_dir)
    }

    pub fn with_base_url(base_url: String, cache_dir: PathBuf) -> Self {
        Self {
            client: Client::new(),
            base_url,
            cache_dir,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    async fn fetch_one(&self, channel: &str, platform: &str) -> Result<RepoData, FetchError> {
        let cache_file = self
            .cache_dir
            .join(format!("{}-{platform}.json", channel.replace('/', "-")));

        if let Some(bytes) = self.read_cache(&cache_file).await {
            debug!("using cached repodata for {channel}/{platform}");
            return RepoData::from_slice(channel, platform, &self.base_url, &bytes)
                .map_err(Into::into);
        }

        let url = format!("{}/{channel}/{platform}/repodata.json", self.base_url);
        debug!("fetching {url}");
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::ChannelNotFound {
                channel: channel.to_string(),
                platform: platform.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(FetchError::Status {
                channel: channel.to_string(),
                platform: platform.to_string(),
                status: response.status(),
            });
        }

        let bytes = response.bytes().await?;
        fs::create_dir_all(&self.cache_dir).await?;
        fs::write(&cache_file, &bytes).await?;

        RepoData::from_slice(channel, platform, &self.base_url, &bytes).map_err(Into::into)
    }

    /// Returns the cached bytes when the file exists and is younger than
    /// the TTL; anything else falls back to the network.
    async fn read_cache(&self, path: &Path) -> Option<Vec<u8>> {
        let metadata = fs::metadata(path).await.ok()?;
        let age = metadata.modified().ok()?.elapsed().ok()?;
        if age < self.cache_ttl {
            fs::read(path).await.ok()
        } else {
            None
        }
    }
}

#[async_trait]
impl RepoDataSource for HttpRepoDataSource {
    async fn fetch(
        &self,
        channels: &[String],
        platforms: &[String],
    ) -> Result<Vec<RepoData>, FetchError> {
        let mut pairs = Vec::with_capacity(channels.len() * platforms.len());
        for channel in channels {
            for platform in platforms {
                pairs.push((channel.as_str(), platform.as_str()));
            }
        }
        let results = join_all(
            pairs
                .iter()
                .map(|(channel, platform)| self.fetch_one(channel, platform)),
        )
        .await;
        results.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use tempfile::TempDir;

    const INDEX: &str = r#"{
        "packages.conda": {
            "numpy-2.0.0-py312_0.conda": {
                "name": "numpy",
                "version": "2.0.0",
                "build": "py312_0"
            }
        }
    }"#;

    fn source(base_url: String) -> (HttpRepoDataSource, TempDir) {
        let cache_dir = TempDir::new().unwrap();
        let source =
            HttpRepoDataSource::with_base_url(base_url, cache_dir.path().to_path_buf());
        (source, cache_dir)
    }

    #[tokio::test]
    async fn fetch_returns_one_index_per_pair() {
        let mut server = Server::new_async().await;
        let forge = server
            .mock("GET", "/conda-forge/noarch/repodata.json")
            .with_status(200)
            .with_body(INDEX)
            .create_async()
            .await;
        let bioconda = server
            .mock("GET", "/bioconda/noarch/repodata.json")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let (source, _cache) = source(server.url());
        let indexes = source
            .fetch(
                &["conda-forge".to_string(), "bioconda".to_string()],
                &["noarch".to_string()],
            )
            .await
            .unwrap();

        forge.assert_async().await;
        bioconda.assert_async().await;

        assert_eq!(indexes.len(), 2);
        assert_eq!(indexes[0].channel, "conda-forge");
        assert_eq!(indexes[0].records_for("numpy").len(), 1);
        assert_eq!(indexes[1].channel, "bioconda");
        assert_eq!(indexes[1].record_count(), 0);
    }

    #[tokio::test]
    async fn second_fetch_within_ttl_uses_the_cache() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/conda-forge/noarch/repodata.json")
            .with_status(200)
            .with_body(INDEX)
            .expect(1)
            .create_async()
            .await;

        let (source, _cache) = source(server.url());
        let channels = vec!["conda-forge".to_string()];
        let platforms = vec!["noarch".to_string()];

        let first = source.fetch(&channels, &platforms).await.unwrap();
        let second = source.fetch(&channels, &platforms).await.unwrap();

        mock.assert_async().await;
        assert_eq!(first[0].record_count(), second[0].record_count());
    }

    #[tokio::test]
    async fn expired_cache_refetches() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/conda-forge/noarch/repodata.json")
            .with_status(200)
            .with_body(INDEX)
            .expect(2)
            .create_async()
            .await;

        let (source, _cache) = source(server.url());
        let source = source.cache_ttl(Duration::ZERO);
        let channels = vec!["conda-forge".to_string()];
        let platforms = vec!["noarch".to_string()];

        source.fetch(&channels, &platforms).await.unwrap();
        source.fetch(&channels, &platforms).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_index_is_channel_not_found() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/nonexistent/noarch/repodata.json")
            .with_status(404)
            .create_async()
            .await;

        let (source, _cache) = source(server.url());
        let result = source
            .fetch(&["nonexistent".to_string()], &["noarch".to_string()])
            .await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(FetchError::ChannelNotFound { channel, .. }) if channel == "nonexistent"
        ));
    }

    #[tokio::test]
    async fn server_error_is_a_status_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/conda-forge/noarch/repodata.json")
            .with_status(503)
            .create_async()
            .await;

        let (source, _cache) = source(server.url());
        let result = source
            .fetch(&["conda-forge".to_string()], &["noarch".to_string()])
            .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(FetchError::Status { .. })));
    }

    #[tokio::test]
    async fn invalid_payload_is_an_invalid_index_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/conda-forge/noarch/repodata.json")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let (source, _cache) = source(server.url());
        let result = source
            .fetch(&["conda-forge".to_string()], &["noarch".to_string()])
            .await;

        assert!(matches!(result, Err(FetchError::InvalidIndex(_))));
    }
}
