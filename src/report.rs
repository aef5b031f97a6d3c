//! Report lines for matched records

use std::fmt;

use chrono::{DateTime, NaiveDate};

use crate::mirror::MirrorTable;
use crate::repodata::types::RepoDataRecord;

/// One reportable record: its publication date (UTC, when known) and the
/// mirror-rewritten download URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub date: Option<NaiveDate>,
    pub url: String,
}

impl ReportLine {
    pub fn from_record(record: &RepoDataRecord, mirrors: &MirrorTable) -> ReportLine {
        let date = record
            .timestamp
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
            .map(|datetime| datetime.date_naive());
        ReportLine {
            date,
            url: mirrors.rewrite(&record.url).into_owned(),
        }
    }
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.date {
            Some(date) => write!(f, "{date} {}", self.url),
            None => f.write_str(&self.url),
        }
    }
}
