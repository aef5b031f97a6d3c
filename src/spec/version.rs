//! Conda version ordering and version constraint evaluation
//!
//! Conda versions are not semver: an optional epoch (`2!1.0`) precedes
//! dot-separated segments, and each segment may mix numeric and alphabetic
//! runs (`1.2rc1`, `2024.0.post1`). Ordering compares segments component by
//! component; a trailing alphabetic run sorts below a released version
//! (`1.0a` < `1.0`), and missing trailing segments count as zero
//! (`1.2` == `1.2.0`).

use std::cmp::Ordering;
use std::fmt;

/// A parsed conda version: epoch plus dot-separated segments.
#[derive(Debug, Clone)]
pub struct Version {
    epoch: u64,
    segments: Vec<Segment>,
}

/// One dot-separated segment, split into alternating numeric and
/// alphabetic components (`1h2` -> `[1, "h", 2]`).
#[derive(Debug, Clone)]
struct Segment(Vec<Component>);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Component {
    Num(u64),
    Alpha(String),
}

impl Version {
    /// Parse a version string, normalizing `-` and `_` to `.` and
    /// lowercasing alphabetic parts. Returns `None` on empty input,
    /// empty segments, or characters outside `[a-z0-9]` within a segment.
    pub fn parse(input: &str) -> Option<Version> {
        let input = input.trim().to_ascii_lowercase();
        let (epoch, rest) = match input.split_once('!') {
            Some((epoch, rest)) => (epoch.parse::<u64>().ok()?, rest),
            None => (0, input.as_str()),
        };
        if rest.is_empty() {
            return None;
        }
        let segments = rest
            .split(['.', '-', '_'])
            .map(Segment::parse)
            .collect::<Option<Vec<_>>>()?;
        Some(Version { epoch, segments })
    }

    /// Number of dot-separated segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// The version with its last segment dropped (`1.4.2` -> `1.4`).
    /// Used for compatible-release constraints. Panics if there is only
    /// one segment; callers validate segment count first.
    pub(crate) fn truncated(&self) -> Version {
        Version {
            epoch: self.epoch,
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        }
    }

    /// Whether this version falls under `prefix` in the `prefix*` sense:
    /// every prefix segment but the last must compare equal to the
    /// corresponding segment here, and the last must be a component-wise
    /// prefix of it. Numeric components only prefix-match exactly, so
    /// `1.8*` covers `1.8.1` but not `1.81`.
    pub fn starts_with(&self, prefix: &Version) -> bool {
        if self.epoch != prefix.epoch {
            return false;
        }
        for (i, pseg) in prefix.segments.iter().enumerate() {
            let Some(seg) = self.segments.get(i) else {
                return false;
            };
            let last = i + 1 == prefix.segments.len();
            let ok = if last {
                seg.starts_with(pseg)
            } else {
                seg.cmp(pseg) == Ordering::Equal
            };
            if !ok {
                return false;
            }
        }
        true
    }
}

impl Segment {
    fn parse(segment: &str) -> Option<Segment> {
        if segment.is_empty() {
            return None;
        }
        let mut components = Vec::new();
        let bytes = segment.as_bytes();
        let mut pos = 0;
        while pos < bytes.len() {
            let start = pos;
            if bytes[pos].is_ascii_digit() {
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
                components.push(Component::Num(segment[start..pos].parse().ok()?));
            } else if bytes[pos].is_ascii_lowercase() {
                while pos < bytes.len() && bytes[pos].is_ascii_lowercase() {
                    pos += 1;
                }
                components.push(Component::Alpha(segment[start..pos].to_string()));
            } else {
                return None;
            }
        }
        Some(Segment(components))
    }

    fn starts_with(&self, prefix: &Segment) -> bool {
        for (i, want) in prefix.0.iter().enumerate() {
            let Some(have) = self.0.get(i) else {
                return false;
            };
            let last = i + 1 == prefix.0.len();
            let ok = match (have, want) {
                (Component::Num(a), Component::Num(b)) => a == b,
                (Component::Alpha(a), Component::Alpha(b)) if last => a.starts_with(b.as_str()),
                (Component::Alpha(a), Component::Alpha(b)) => a == b,
                _ => false,
            };
            if !ok {
                return false;
            }
        }
        true
    }
}

impl Component {
    /// Ordering of a trailing component against nothing: `0` ties, other
    /// numbers and `post` sort above, alphabetic suffixes below
    /// (`1.0a` < `1.0` < `1.0post`).
    fn cmp_trailing(&self) -> Ordering {
        match self {
            Component::Num(0) => Ordering::Equal,
            Component::Num(_) => Ordering::Greater,
            Component::Alpha(a) if a == "post" => Ordering::Greater,
            Component::Alpha(_) => Ordering::Less,
        }
    }

    /// Ordering class: `dev` < other alphabetic runs < numbers < `post`.
    fn rank(&self) -> u8 {
        match self {
            Component::Alpha(a) if a == "dev" => 0,
            Component::Alpha(a) if a == "post" => 3,
            Component::Alpha(_) => 1,
            Component::Num(_) => 2,
        }
    }
}

impl Ord for Component {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank()).then_with(|| match (self, other) {
            (Component::Num(a), Component::Num(b)) => a.cmp(b),
            (Component::Alpha(a), Component::Alpha(b)) => a.cmp(b),
            // unreachable when ranks differ
            _ => Ordering::Equal,
        })
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for i in 0..len {
            let ord = match (self.0.get(i), other.0.get(i)) {
                (Some(a), Some(b)) => a.cmp(b),
                (Some(a), None) => a.cmp_trailing(),
                (None, Some(b)) => b.cmp_trailing().reverse(),
                (None, None) => break,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Segment {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        static EMPTY: Segment = Segment(Vec::new());
        self.epoch.cmp(&other.epoch).then_with(|| {
            let len = self.segments.len().max(other.segments.len());
            for i in 0..len {
                let a = self.segments.get(i).unwrap_or(&EMPTY);
                let b = other.segments.get(i).unwrap_or(&EMPTY);
                let ord = a.cmp(b);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            for component in &segment.0 {
                match component {
                    Component::Num(n) => write!(f, "{n}")?,
                    Component::Alpha(a) => write!(f, "{a}")?,
                }
            }
        }
        Ok(())
    }
}

/// A boolean combination of version constraints.
///
/// Grammar: `|` separates alternatives, `,` conjoins constraints within an
/// alternative. Atoms are relational (`>=1.8`), exact (`==1.8` or bare
/// `1.8`), negated (`!=1.8`, `!=1.8.*`), prefix (`=1.8`, `1.8*`, `1.8.*`),
/// compatible release (`~=1.4.2`), or `*`.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionSpec {
    Any,
    Exact(Version),
    NotEqual(Version),
    StartsWith(Version),
    NotStartsWith(Version),
    Compare(RelOp, Version),
    And(Vec<VersionSpec>),
    Or(Vec<VersionSpec>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Greater,
    GreaterEq,
    Less,
    LessEq,
}

impl VersionSpec {
    pub fn parse(input: &str) -> Option<VersionSpec> {
        let mut alternatives = input
            .split('|')
            .map(Self::parse_conjunction)
            .collect::<Option<Vec<_>>>()?;
        match alternatives.len() {
            0 => None,
            1 => alternatives.pop(),
            _ => Some(VersionSpec::Or(alternatives)),
        }
    }

    fn parse_conjunction(group: &str) -> Option<VersionSpec> {
        let mut constraints = group
            .split(',')
            .map(Self::parse_atom)
            .collect::<Option<Vec<_>>>()?;
        match constraints.len() {
            0 => None,
            1 => constraints.pop(),
            _ => Some(VersionSpec::And(constraints)),
        }
    }

    fn parse_atom(atom: &str) -> Option<VersionSpec> {
        let atom = atom.trim();
        if atom == "*" {
            return Some(VersionSpec::Any);
        }
        if let Some(rest) = atom.strip_prefix("==") {
            return Version::parse(rest).map(VersionSpec::Exact);
        }
        if let Some(rest) = atom.strip_prefix("!=") {
            return match strip_glob(rest) {
                Some(prefix) => Version::parse(prefix).map(VersionSpec::NotStartsWith),
                None => Version::parse(rest).map(VersionSpec::NotEqual),
            };
        }
        if let Some(rest) = atom.strip_prefix("~=") {
            let version = Version::parse(rest)?;
            if version.segment_count() < 2 {
                return None;
            }
            return Some(VersionSpec::And(vec![
                VersionSpec::Compare(RelOp::GreaterEq, version.clone()),
                VersionSpec::StartsWith(version.truncated()),
            ]));
        }
        for (token, op) in [
            (">=", RelOp::GreaterEq),
            ("<=", RelOp::LessEq),
            (">", RelOp::Greater),
            ("<", RelOp::Less),
        ] {
            if let Some(rest) = atom.strip_prefix(token) {
                return Version::parse(rest).map(|v| VersionSpec::Compare(op, v));
            }
        }
        if let Some(rest) = atom.strip_prefix('=') {
            let prefix = strip_glob(rest).unwrap_or(rest);
            return Version::parse(prefix).map(VersionSpec::StartsWith);
        }
        if let Some(prefix) = strip_glob(atom) {
            return Version::parse(prefix).map(VersionSpec::StartsWith);
        }
        Version::parse(atom).map(VersionSpec::Exact)
    }

    pub fn matches(&self, version: &Version) -> bool {
        match self {
            VersionSpec::Any => true,
            VersionSpec::Exact(want) => version == want,
            VersionSpec::NotEqual(want) => version != want,
            VersionSpec::StartsWith(prefix) => version.starts_with(prefix),
            VersionSpec::NotStartsWith(prefix) => !version.starts_with(prefix),
            VersionSpec::Compare(op, want) => match op {
                RelOp::Greater => version > want,
                RelOp::GreaterEq => version >= want,
                RelOp::Less => version < want,
                RelOp::LessEq => version <= want,
            },
            VersionSpec::And(specs) => specs.iter().all(|s| s.matches(version)),
            VersionSpec::Or(specs) => specs.iter().any(|s| s.matches(version)),
        }
    }
}

/// Strip a trailing `.*` or `*` glob, returning the prefix part.
fn strip_glob(atom: &str) -> Option<&str> {
    atom.strip_suffix(".*").or_else(|| atom.strip_suffix('*'))
}
