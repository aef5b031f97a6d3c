//! Matching fetched records against compiled specifications

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::config::CheckConfig;
use crate::repodata::error::FetchError;
use crate::repodata::source::RepoDataSource;
use crate::repodata::types::RepoDataRecord;
use crate::spec::error::SpecParseError;
use crate::spec::matchspec::MatchSpec;

/// One update check run: compiled specifications grouped by package name,
/// plus the channel/platform pairs to scan.
pub struct UpdateCheck {
    specs_by_name: IndexMap<String, Vec<MatchSpec>>,
    channels: Vec<String>,
    platforms: Vec<String>,
}

impl UpdateCheck {
    /// Compiles the configured spec strings. Specs sharing a package name
    /// are grouped so each record is only tested against predicates for
    /// its own package; duplicate specs collapse to one.
    pub fn new(config: &CheckConfig) -> Result<UpdateCheck, SpecParseError> {
        let mut specs_by_name: IndexMap<String, Vec<MatchSpec>> = IndexMap::new();
        for raw in &config.specs {
            let spec = MatchSpec::parse(raw)?;
            let group = specs_by_name.entry(spec.name.clone()).or_default();
            if !group.contains(&spec) {
                group.push(spec);
            }
        }
        debug!(
            "compiled {} specs for {} packages",
            specs_by_name.values().map(Vec::len).sum::<usize>(),
            specs_by_name.len()
        );
        Ok(UpdateCheck {
            specs_by_name,
            channels: config.channels.clone(),
            platforms: config.platforms.clone(),
        })
    }

    /// Fetches every configured index and returns the records matching any
    /// compiled specification.
    ///
    /// A record enters the result at most once per package name-group,
    /// even when several specs of the group accept it or when overlapping
    /// indexes (`noarch` fetched alongside a concrete platform) expose the
    /// same record twice. Result order follows the source's index and
    /// record order.
    pub async fn run<S>(&self, source: &S) -> Result<Vec<RepoDataRecord>, FetchError>
    where
        S: RepoDataSource + ?Sized,
    {
        let indexes = source.fetch(&self.channels, &self.platforms).await?;

        let mut seen = HashSet::new();
        let mut matched = Vec::new();
        for index in &indexes {
            debug!(
                "scanning {}/{}: {} records",
                index.channel,
                index.platform,
                index.record_count()
            );
            for (name, specs) in &self.specs_by_name {
                for record in index.records_for(name) {
                    if !specs.iter().any(|spec| spec.matches(record)) {
                        continue;
                    }
                    let key = (
                        name.clone(),
                        record.channel.clone(),
                        record.version.clone(),
                        record.build.clone(),
                        record.url.clone(),
                    );
                    if seen.insert(key) {
                        matched.push(record.clone());
                    }
                }
            }
        }
        info!("matched {} records", matched.len());
        Ok(matched)
    }
}
