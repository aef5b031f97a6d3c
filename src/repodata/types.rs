//! Repodata index parsing
//!
//! A repodata index (`repodata.json`) lists every package artifact
//! published under one channel/platform pair, keyed by filename, split
//! across the legacy `packages` map (`.tar.bz2`) and the `packages.conda`
//! map.

use indexmap::IndexMap;
use serde::Deserialize;

/// Timestamps at or past this value (year 9999 in seconds) must be
/// milliseconds; repodata carries both conventions.
const MAX_SECONDS_TIMESTAMP: i64 = 253_402_300_800;

/// One published package artifact together with its source channel and
/// download URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDataRecord {
    pub name: String,
    pub version: String,
    pub build: String,
    /// Platform subdir the artifact was published under.
    pub subdir: String,
    pub channel: String,
    pub file_name: String,
    /// Canonical download URL.
    pub url: String,
    /// Publication time, seconds since the epoch.
    pub timestamp: Option<i64>,
}

/// The records of one fetched channel/platform index, grouped by package
/// name in file order.
#[derive(Debug, Clone)]
pub struct RepoData {
    pub channel: String,
    pub platform: String,
    by_name: IndexMap<String, Vec<RepoDataRecord>>,
}

#[derive(Debug, Deserialize)]
struct RawRepoData {
    #[serde(default)]
    packages: IndexMap<String, RawRecord>,
    #[serde(default, rename = "packages.conda")]
    conda_packages: IndexMap<String, RawRecord>,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    name: String,
    version: String,
    build: String,
    #[serde(default)]
    subdir: Option<String>,
    #[serde(default)]
    timestamp: Option<i64>,
}

impl RepoData {
    /// Parse a repodata index. Download URLs are synthesized as
    /// `<base_url>/<channel>/<platform>/<filename>`.
    pub fn from_slice(
        channel: &str,
        platform: &str,
        base_url: &str,
        bytes: &[u8],
    ) -> Result<RepoData, serde_json::Error> {
        let raw: RawRepoData = serde_json::from_slice(bytes)?;
        let mut by_name: IndexMap<String, Vec<RepoDataRecord>> = IndexMap::new();
        for (file_name, record) in raw.packages.into_iter().chain(raw.conda_packages) {
            let record = RepoDataRecord {
                url: format!("{base_url}/{channel}/{platform}/{file_name}"),
                subdir: record.subdir.unwrap_or_else(|| platform.to_string()),
                channel: channel.to_string(),
                file_name,
                timestamp: record.timestamp.map(normalize_timestamp),
                name: record.name,
                version: record.version,
                build: record.build,
            };
            by_name.entry(record.name.clone()).or_default().push(record);
        }
        Ok(RepoData {
            channel: channel.to_string(),
            platform: platform.to_string(),
            by_name,
        })
    }

    /// Records published under the given package name, in file order.
    pub fn records_for(&self, name: &str) -> &[RepoDataRecord] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn record_count(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }
}

fn normalize_timestamp(timestamp: i64) -> i64 {
    if timestamp >= MAX_SECONDS_TIMESTAMP {
        timestamp / 1000
    } else {
        timestamp
    }
}
