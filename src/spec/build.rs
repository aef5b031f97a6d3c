//! Build string matching
//!
//! Conda build strings (`py312h9f0ad1d_0`) are matched exactly or by a
//! `*` glob (`py312*`, `*_0`).

use regex::Regex;

#[derive(Debug, Clone)]
pub enum BuildSpec {
    Exact(String),
    Glob { pattern: String, regex: Regex },
}

impl BuildSpec {
    /// Parse a build constraint. Returns `None` on empty input or
    /// characters outside `[A-Za-z0-9._*]`.
    pub fn parse(pattern: &str) -> Option<BuildSpec> {
        if pattern.is_empty() {
            return None;
        }
        let valid = pattern
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '*'));
        if !valid {
            return None;
        }
        if pattern.contains('*') {
            let escaped = regex::escape(pattern).replace(r"\*", ".*");
            let regex = Regex::new(&format!("^{escaped}$")).ok()?;
            Some(BuildSpec::Glob {
                pattern: pattern.to_string(),
                regex,
            })
        } else {
            Some(BuildSpec::Exact(pattern.to_string()))
        }
    }

    pub fn matches(&self, build: &str) -> bool {
        match self {
            BuildSpec::Exact(want) => build == want,
            BuildSpec::Glob { regex, .. } => regex.is_match(build),
        }
    }

    pub fn pattern(&self) -> &str {
        match self {
            BuildSpec::Exact(pattern) => pattern,
            BuildSpec::Glob { pattern, .. } => pattern,
        }
    }
}

impl PartialEq for BuildSpec {
    fn eq(&self, other: &Self) -> bool {
        self.pattern() == other.pattern()
    }
}

impl Eq for BuildSpec {}

impl std::fmt::Display for BuildSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.pattern())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("py312h9f0ad1d_0", "py312h9f0ad1d_0", true)]
    #[case("py312h9f0ad1d_0", "py312h9f0ad1d_1", false)]
    #[case("py312*", "py312h9f0ad1d_0", true)]
    #[case("py312*", "py311h9f0ad1d_0", false)]
    #[case("*_0", "py312h9f0ad1d_0", true)]
    #[case("*_0", "py312h9f0ad1d_1", false)]
    #[case("py3*_0", "py312h9f0ad1d_0", true)]
    #[case("*", "anything_at_all", true)]
    fn build_spec_matches(#[case] pattern: &str, #[case] build: &str, #[case] expected: bool) {
        let spec = BuildSpec::parse(pattern).unwrap();
        assert_eq!(spec.matches(build), expected);
    }

    #[test]
    fn glob_metacharacters_are_escaped() {
        // the dot must not act as a regex wildcard
        let spec = BuildSpec::parse("1.0*").unwrap();
        assert!(spec.matches("1.0_0"));
        assert!(!spec.matches("1x0_0"));
    }

    #[rstest]
    #[case("")]
    #[case("py312 h0")]
    #[case("py[312]")]
    fn build_spec_rejects_malformed(#[case] pattern: &str) {
        assert!(BuildSpec::parse(pattern).is_none());
    }
}
