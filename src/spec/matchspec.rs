//! Conda match specification parsing and record matching
//!
//! A match spec names a package plus optional version, build, and channel
//! restrictions: `numpy`, `numpy >=1.22,<2`, `numpy=1.26=py312*`,
//! `conda-forge::numpy`, `numpy[channel=conda-forge, build=py312*]`.

use tracing::warn;

use crate::repodata::types::RepoDataRecord;
use crate::spec::build::BuildSpec;
use crate::spec::error::SpecParseError;
use crate::spec::version::{Version, VersionSpec};

/// Platform subdirs that may be attached to a channel reference
/// (`conda-forge/linux-64`); they are not part of the channel name.
const PLATFORM_SUBDIRS: &[&str] = &[
    "noarch",
    "linux-64",
    "linux-aarch64",
    "linux-ppc64le",
    "osx-64",
    "osx-arm64",
    "win-64",
    "win-arm64",
];

/// A compiled package specification.
///
/// The channel restriction is held apart from the name/version/build
/// constraints and evaluated as its own predicate: conda's matching
/// primitives silently ignore channel attributes, so a single combined
/// matcher would accept records from any channel. `matches` ANDs the two
/// predicates explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSpec {
    pub name: String,
    pub version: Option<VersionSpec>,
    pub build: Option<BuildSpec>,
    pub channel: Option<String>,
}

impl MatchSpec {
    pub fn parse(input: &str) -> Result<MatchSpec, SpecParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SpecParseError::Empty);
        }

        let (body, attributes) = split_brackets(input)?;

        let (channel_prefix, rest) = match body.split_once("::") {
            Some((channel, rest)) => (Some(normalize_channel(channel)), rest.trim()),
            None => (None, body.trim()),
        };

        let name_end = rest
            .find([' ', '=', '<', '>', '!', '~'])
            .unwrap_or(rest.len());
        let (name_part, constraint) = rest.split_at(name_end);
        let name = name_part.to_ascii_lowercase();
        let name_ok = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !name_ok {
            return Err(SpecParseError::InvalidName(input.to_string()));
        }

        let (mut version_part, mut build_part) = split_constraint(constraint.trim())?;

        let mut channel_attr = None;
        for (key, value) in attributes {
            match key.as_str() {
                "channel" => channel_attr = Some(normalize_channel(&value)),
                "version" => version_part = Some(value),
                "build" => build_part = Some(value),
                _ => return Err(SpecParseError::UnknownAttribute(key)),
            }
        }

        let channel = match (channel_prefix, channel_attr) {
            (Some(prefix), Some(attr)) if prefix != attr => {
                return Err(SpecParseError::ConflictingChannels(prefix, attr));
            }
            (prefix, attr) => attr.or(prefix),
        };

        let version = version_part
            .map(|part| {
                VersionSpec::parse(&part).ok_or(SpecParseError::InvalidVersion(part.clone()))
            })
            .transpose()?;
        let build = build_part
            .map(|part| BuildSpec::parse(&part).ok_or(SpecParseError::InvalidBuild(part.clone())))
            .transpose()?;

        Ok(MatchSpec {
            name,
            version,
            build,
            channel,
        })
    }

    /// Whether the record satisfies the full specification: the
    /// channel-blind package predicate AND the channel predicate.
    pub fn matches(&self, record: &RepoDataRecord) -> bool {
        self.matches_package(record) && self.matches_channel(&record.channel)
    }

    /// Name, version, and build test only; blind to the record's channel.
    pub fn matches_package(&self, record: &RepoDataRecord) -> bool {
        if record.name != self.name {
            return false;
        }
        if let Some(version_spec) = &self.version {
            let Some(version) = Version::parse(&record.version) else {
                warn!(
                    "skipping {} {}: unparseable version",
                    record.name, record.version
                );
                return false;
            };
            if !version_spec.matches(&version) {
                return false;
            }
        }
        if let Some(build_spec) = &self.build
            && !build_spec.matches(&record.build)
        {
            return false;
        }
        true
    }

    /// Channel predicate: trivially true without a restriction, otherwise
    /// the record's channel must equal the wanted name, carry it as a
    /// leading component (`conda-forge/linux-64`), or end with it as a
    /// path component (URL-style channels).
    pub fn matches_channel(&self, channel: &str) -> bool {
        let Some(want) = &self.channel else {
            return true;
        };
        let channel = channel.trim_end_matches('/');
        channel == want
            || channel
                .strip_prefix(want.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
            || channel
                .strip_suffix(want.as_str())
                .is_some_and(|rest| rest.ends_with('/'))
    }
}

/// Split a trailing `[key=value, ...]` attribute block off the spec body.
fn split_brackets(input: &str) -> Result<(&str, Vec<(String, String)>), SpecParseError> {
    let unbalanced = || SpecParseError::UnbalancedBrackets(input.to_string());
    if !input.ends_with(']') {
        if input.contains(['[', ']']) {
            return Err(unbalanced());
        }
        return Ok((input, Vec::new()));
    }
    let open = input.rfind('[').ok_or_else(unbalanced)?;
    let body = &input[..open];
    let inner = &input[open + 1..input.len() - 1];
    if body.contains(['[', ']']) || inner.contains(['[', ']']) {
        return Err(unbalanced());
    }
    let mut attributes = Vec::new();
    for item in inner.split(',') {
        let (key, value) = item
            .split_once('=')
            .ok_or_else(|| SpecParseError::InvalidAttribute(item.trim().to_string()))?;
        let key = key.trim().to_ascii_lowercase();
        let value = unquote(value.trim()).to_string();
        if key.is_empty() || value.is_empty() {
            return Err(SpecParseError::InvalidAttribute(item.trim().to_string()));
        }
        attributes.push((key, value));
    }
    Ok((body, attributes))
}

/// Split the text after the package name into version and build parts.
/// Accepted shapes: empty, `<version>`, `<version> <build>`, and
/// `=<version>=<build>`.
fn split_constraint(
    constraint: &str,
) -> Result<(Option<String>, Option<String>), SpecParseError> {
    if constraint.is_empty() {
        return Ok((None, None));
    }
    if constraint.contains(char::is_whitespace) {
        // ">=1.22, <2" is one version expression, not a version/build pair
        if constraint.contains([',', '|']) {
            let compact: String = constraint.split_whitespace().collect();
            return Ok((Some(compact), None));
        }
        let mut tokens = constraint.split_whitespace();
        let version = tokens.next().map(str::to_string);
        let build = tokens.next().map(str::to_string);
        if tokens.next().is_some() {
            return Err(SpecParseError::InvalidVersion(constraint.to_string()));
        }
        return Ok((version, build));
    }
    // "=1.26=py312_0": a single '=' with an embedded '=' pins both version
    // and build exactly
    if let Some(rest) = constraint.strip_prefix('=')
        && !rest.starts_with('=')
        && let Some((version, build)) = rest.split_once('=')
    {
        if version.is_empty() || build.is_empty() {
            return Err(SpecParseError::InvalidVersion(constraint.to_string()));
        }
        return Ok((Some(version.to_string()), Some(build.to_string())));
    }
    Ok((Some(constraint.to_string()), None))
}

/// Channel names may arrive quoted, with a trailing slash, or with a
/// platform subdir attached; reduce them to the bare channel name.
fn normalize_channel(raw: &str) -> String {
    let channel = unquote(raw.trim()).trim_matches('/');
    match channel.rsplit_once('/') {
        Some((head, tail)) if PLATFORM_SUBDIRS.contains(&tail) => head.to_string(),
        _ => channel.to_string(),
    }
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn record(name: &str, version: &str, build: &str, channel: &str) -> RepoDataRecord {
        RepoDataRecord {
            name: name.to_string(),
            version: version.to_string(),
            build: build.to_string(),
            subdir: "linux-64".to_string(),
            channel: channel.to_string(),
            file_name: format!("{name}-{version}-{build}.conda"),
            url: format!("https://conda.anaconda.org/{channel}/linux-64/{name}-{version}-{build}.conda"),
            timestamp: None,
        }
    }

    #[test]
    fn parse_bare_name() {
        let spec = MatchSpec::parse("numpy").unwrap();
        assert_eq!(spec.name, "numpy");
        assert_eq!(spec.version, None);
        assert_eq!(spec.build, None);
        assert_eq!(spec.channel, None);
    }

    #[test]
    fn parse_lowercases_name() {
        assert_eq!(MatchSpec::parse("NumPy").unwrap().name, "numpy");
    }

    #[test]
    fn parse_version_after_space() {
        let spec = MatchSpec::parse("numpy >=1.22,<2").unwrap();
        assert_eq!(spec.version, VersionSpec::parse(">=1.22,<2"));
        assert_eq!(spec.build, None);
    }

    #[test]
    fn parse_spaced_conjunction_stays_one_version() {
        let spec = MatchSpec::parse("numpy >=1.22, <2").unwrap();
        assert_eq!(spec.version, VersionSpec::parse(">=1.22,<2"));
        assert_eq!(spec.build, None);
    }

    #[test]
    fn parse_version_and_build_tokens() {
        let spec = MatchSpec::parse("numpy 1.26.4 py312h9f0ad1d_0").unwrap();
        assert_eq!(spec.version, VersionSpec::parse("1.26.4"));
        assert_eq!(spec.build, BuildSpec::parse("py312h9f0ad1d_0"));
    }

    #[test]
    fn parse_pinned_version_and_build() {
        let spec = MatchSpec::parse("numpy=1.26=py312*").unwrap();
        assert_eq!(spec.version, VersionSpec::parse("1.26"));
        assert_eq!(spec.build, BuildSpec::parse("py312*"));
    }

    #[test]
    fn parse_channel_prefix() {
        let spec = MatchSpec::parse("conda-forge::numpy>=1.22").unwrap();
        assert_eq!(spec.channel.as_deref(), Some("conda-forge"));
        assert_eq!(spec.name, "numpy");
        assert_eq!(spec.version, VersionSpec::parse(">=1.22"));
    }

    #[test]
    fn parse_channel_attribute() {
        let spec = MatchSpec::parse("numpy>=1.22[channel=conda-forge]").unwrap();
        assert_eq!(spec.channel.as_deref(), Some("conda-forge"));
        assert_eq!(spec.version, VersionSpec::parse(">=1.22"));
    }

    #[test]
    fn parse_bracket_attributes_override_inline_constraints() {
        let spec = MatchSpec::parse("numpy[version='>=1.22', build=py312*]").unwrap();
        assert_eq!(spec.version, VersionSpec::parse(">=1.22"));
        assert_eq!(spec.build, BuildSpec::parse("py312*"));
    }

    #[test]
    fn parse_channel_with_subdir_keeps_channel_name() {
        let spec = MatchSpec::parse("conda-forge/linux-64::numpy").unwrap();
        assert_eq!(spec.channel.as_deref(), Some("conda-forge"));
        // multi-component channel names survive
        let spec = MatchSpec::parse("pkgs/main::numpy").unwrap();
        assert_eq!(spec.channel.as_deref(), Some("pkgs/main"));
    }

    #[test]
    fn parse_agreeing_channel_forms_is_ok() {
        let spec = MatchSpec::parse("conda-forge::numpy[channel=conda-forge]").unwrap();
        assert_eq!(spec.channel.as_deref(), Some("conda-forge"));
    }

    #[rstest]
    #[case("", SpecParseError::Empty)]
    #[case("   ", SpecParseError::Empty)]
    #[case(">=1.0", SpecParseError::InvalidName(">=1.0".to_string()))]
    #[case("numpy ==", SpecParseError::InvalidVersion("==".to_string()))]
    #[case(
        "numpy>=bogus??",
        SpecParseError::InvalidVersion(">=bogus??".to_string())
    )]
    #[case(
        "numpy 1.0 py312_0 extra",
        SpecParseError::InvalidVersion("1.0 py312_0 extra".to_string())
    )]
    #[case(
        "numpy[flavor=mkl]",
        SpecParseError::UnknownAttribute("flavor".to_string())
    )]
    #[case(
        "numpy[channel]",
        SpecParseError::InvalidAttribute("channel".to_string())
    )]
    #[case(
        "numpy[channel=a",
        SpecParseError::UnbalancedBrackets("numpy[channel=a".to_string())
    )]
    #[case(
        "pytorch::numpy[channel=conda-forge]",
        SpecParseError::ConflictingChannels("pytorch".to_string(), "conda-forge".to_string())
    )]
    fn parse_rejects_malformed(#[case] input: &str, #[case] expected: SpecParseError) {
        assert_eq!(MatchSpec::parse(input).unwrap_err(), expected);
    }

    #[test]
    fn matches_ignores_channel_without_restriction() {
        let spec = MatchSpec::parse("numpy>=1.22").unwrap();
        assert!(spec.matches(&record("numpy", "1.26.4", "py312_0", "conda-forge")));
        assert!(spec.matches(&record("numpy", "1.26.4", "py312_0", "bioconda")));
    }

    #[test]
    fn matches_requires_restricted_channel() {
        let spec = MatchSpec::parse("numpy>=1.0[channel=conda-forge]").unwrap();
        let hit = record("numpy", "1.2", "py312_0", "conda-forge");
        let miss = record("numpy", "1.2", "py312_0", "bioconda");
        assert!(spec.matches(&hit));
        // the package predicate alone accepts it; the channel one rejects
        assert!(spec.matches_package(&miss));
        assert!(!spec.matches(&miss));
    }

    #[rstest]
    #[case("conda-forge", true)]
    #[case("conda-forge/linux-64", true)]
    #[case("https://conda.anaconda.org/conda-forge", true)]
    #[case("conda-forge-extras", false)]
    #[case("bioconda", false)]
    fn channel_predicate_forms(#[case] channel: &str, #[case] expected: bool) {
        let spec = MatchSpec::parse("numpy[channel=conda-forge]").unwrap();
        assert_eq!(spec.matches_channel(channel), expected);
    }

    #[test]
    fn matches_applies_all_constraints() {
        let spec = MatchSpec::parse("numpy>=1.22[build=py312*, channel=conda-forge]").unwrap();
        assert!(spec.matches(&record("numpy", "1.26", "py312_0", "conda-forge")));
        assert!(!spec.matches(&record("numpy", "1.20", "py312_0", "conda-forge")));
        assert!(!spec.matches(&record("numpy", "1.26", "py311_0", "conda-forge")));
        assert!(!spec.matches(&record("scipy", "1.26", "py312_0", "conda-forge")));
    }

    #[test]
    fn matches_rejects_unparseable_record_version_under_version_constraint() {
        let spec = MatchSpec::parse("numpy>=1.22").unwrap();
        assert!(!spec.matches(&record("numpy", "not a version", "py312_0", "conda-forge")));
        let unconstrained = MatchSpec::parse("numpy").unwrap();
        assert!(unconstrained.matches(&record("numpy", "not a version", "py312_0", "conda-forge")));
    }
}
