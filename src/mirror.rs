//! Mirror URL rewriting
//!
//! Download URLs on the canonical repository host are rewritten to a
//! mirror for channels the mirror carries; every other URL passes through
//! untouched.

use std::borrow::Cow;
use std::collections::HashMap;

/// Host prefix of canonical download URLs.
pub const CANONICAL_PREFIX: &str = "https://conda.anaconda.org/";

/// Mirror site root. Not configurable; the `nvidia` channel is only
/// carried by the `-extra` tree of this mirror.
const MIRROR_ROOT: &str = "https://mirrors.cernet.edu.cn/anaconda";

/// Maps `channel/` prefixes to mirror base URLs. Built once per run.
#[derive(Debug, Clone)]
pub struct MirrorTable {
    entries: HashMap<String, String>,
}

impl MirrorTable {
    /// Builds the table from the configured mirrored channels. The
    /// `nvidia` entry is always present and points at the `-extra` tree
    /// regardless of configuration.
    pub fn new<'a>(mirrored_channels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut entries: HashMap<String, String> = mirrored_channels
            .into_iter()
            .map(|channel| {
                (
                    format!("{channel}/"),
                    format!("{MIRROR_ROOT}/cloud/{channel}/"),
                )
            })
            .collect();
        entries.insert(
            "nvidia/".to_string(),
            format!("{MIRROR_ROOT}-extra/cloud/nvidia/"),
        );
        Self { entries }
    }

    /// Rewrites a canonical URL to its mirrored equivalent. URLs on other
    /// hosts or under unmirrored channels are returned unchanged.
    pub fn rewrite<'a>(&self, url: &'a str) -> Cow<'a, str> {
        let Some(rest) = url.strip_prefix(CANONICAL_PREFIX) else {
            return Cow::Borrowed(url);
        };
        let Some(slash) = rest.find('/') else {
            return Cow::Borrowed(url);
        };
        let (channel_key, tail) = rest.split_at(slash + 1);
        match self.entries.get(channel_key) {
            Some(base) => Cow::Owned(format!("{base}{tail}")),
            None => Cow::Borrowed(url),
        }
    }
}
