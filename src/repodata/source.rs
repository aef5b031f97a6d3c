//! Source trait for fetching repodata indexes

#[cfg(test)]
use mockall::automock;

use crate::repodata::error::FetchError;
use crate::repodata::types::RepoData;

/// Supplies repodata indexes for channel/platform pairs.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait RepoDataSource: Send + Sync {
    /// Fetches one index per (channel, platform) pair, in the given order.
    ///
    /// A pair with no matching packages still yields an (empty) index; a
    /// pair that cannot be fetched fails the whole call.
    async fn fetch(
        &self,
        channels: &[String],
        platforms: &[String],
    ) -> Result<Vec<RepoData>, FetchError>;
}
