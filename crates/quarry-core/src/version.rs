//! Version parsing, comparison, and range matching.
//!
//! Coordinate versions use the repository ecosystem's ordering rather than
//! semver: segments split on `.` and `-`, numeric segments compare as
//! numbers, and string qualifiers rank as
//! `alpha < beta < milestone < rc < snapshot < "" (release) < sp`.
//! A `-SNAPSHOT` version therefore sorts before its release equivalent.

use std::cmp::Ordering;
use std::fmt;

/// A parsed version with comparable segments. Ordering is total; the original
/// spelling is preserved for display and round-tripping.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Segment {
    Numeric(u64),
    Qualifier(Qualifier),
    Text(String),
}

/// Well-known qualifiers with a defined rank.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
enum Qualifier {
    Alpha,
    Beta,
    Milestone,
    Rc,
    Snapshot,
    Release,
    Sp,
}

impl Version {
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        for token in raw.split(['.', '-']) {
            if token.is_empty() {
                continue;
            }
            segments.push(Segment::classify(token));
        }
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    /// The version exactly as written.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_snapshot(&self) -> bool {
        self.raw.ends_with("-SNAPSHOT")
    }

    /// The version without a trailing `-SNAPSHOT` marker.
    pub fn base(&self) -> &str {
        self.raw.strip_suffix("-SNAPSHOT").unwrap_or(&self.raw)
    }
}

impl Segment {
    fn classify(token: &str) -> Self {
        if let Ok(n) = token.parse::<u64>() {
            return Segment::Numeric(n);
        }
        match token.to_ascii_lowercase().as_str() {
            "alpha" | "a" => Segment::Qualifier(Qualifier::Alpha),
            "beta" | "b" => Segment::Qualifier(Qualifier::Beta),
            "milestone" | "m" => Segment::Qualifier(Qualifier::Milestone),
            "rc" | "cr" => Segment::Qualifier(Qualifier::Rc),
            "snapshot" => Segment::Qualifier(Qualifier::Snapshot),
            "ga" | "final" | "release" => Segment::Qualifier(Qualifier::Release),
            "sp" => Segment::Qualifier(Qualifier::Sp),
            _ => Segment::Text(token.to_string()),
        }
    }

    /// How this segment compares against padding, i.e. a missing segment in
    /// the shorter version. `1.0` equals `1.0.0` but `1.0-alpha` is older
    /// than `1.0`.
    fn cmp_padding(&self) -> Ordering {
        match self {
            Segment::Numeric(0) => Ordering::Equal,
            Segment::Numeric(_) => Ordering::Greater,
            Segment::Qualifier(q) => q.cmp(&Qualifier::Release),
            Segment::Text(_) => Ordering::Less,
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let ord = match (self.segments.get(i), other.segments.get(i)) {
                (None, None) => Ordering::Equal,
                (Some(a), None) => a.cmp_padding(),
                (None, Some(b)) => b.cmp_padding().reverse(),
                (Some(a), Some(b)) => cmp_segments(a, b),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

fn cmp_segments(a: &Segment, b: &Segment) -> Ordering {
    use Segment::{Numeric, Qualifier as Qual, Text};
    match (a, b) {
        (Numeric(a), Numeric(b)) => a.cmp(b),
        (Qual(a), Qual(b)) => a.cmp(b),
        // numbers outrank any qualifier or free-form text
        (Numeric(_), _) => Ordering::Greater,
        (_, Numeric(_)) => Ordering::Less,
        (Text(a), Text(b)) => a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()),
        // known qualifiers at or above release outrank unknown text
        (Qual(q), Text(_)) => {
            if *q >= Qualifier::Release {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (Text(_), Qual(q)) => {
            if *q >= Qualifier::Release {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
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
        f.write_str(&self.raw)
    }
}

/// A version range expression: `[1.0,2.0)`, `[1.0,]`, `(,2.0)`, `[1.0]`.
///
/// Enumeration of the versions inside a range is the business of the
/// `VersionRangeResolver` supplier; this type only answers membership.
#[derive(Debug, Clone)]
pub struct VersionRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

#[derive(Debug, Clone)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

impl VersionRange {
    /// Whether `spec` is a range expression at all.
    pub fn is_range(spec: &str) -> bool {
        let s = spec.trim_start();
        s.starts_with('[') || s.starts_with('(')
    }

    /// Parse a range expression. Returns `None` for bare versions.
    pub fn parse(spec: &str) -> Option<Self> {
        let s = spec.trim();
        if !Self::is_range(s) || s.len() < 2 {
            return None;
        }
        let lower_inclusive = s.starts_with('[');
        let upper_inclusive = s.ends_with(']');
        let inner = &s[1..s.len() - 1];

        let bound = |text: &str, inclusive: bool| {
            let text = text.trim();
            (!text.is_empty()).then(|| Bound {
                version: Version::parse(text),
                inclusive,
            })
        };

        match inner.split_once(',') {
            Some((lo, hi)) => Some(Self {
                lower: bound(lo, lower_inclusive),
                upper: bound(hi, upper_inclusive),
            }),
            // single version in brackets pins it exactly
            None => {
                let exact = Bound {
                    version: Version::parse(inner.trim()),
                    inclusive: true,
                };
                Some(Self {
                    lower: Some(exact.clone()),
                    upper: Some(exact),
                })
            }
        }
    }

    pub fn contains(&self, version: &Version) -> bool {
        if let Some(ref lower) = self.lower {
            match version.cmp(&lower.version) {
                Ordering::Less => return false,
                Ordering::Equal if !lower.inclusive => return false,
                _ => {}
            }
        }
        if let Some(ref upper) = self.upper {
            match version.cmp(&upper.version) {
                Ordering::Greater => return false,
                Ordering::Equal if !upper.inclusive => return false,
                _ => {}
            }
        }
        true
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lower {
            Some(ref b) if b.inclusive => write!(f, "[{}", b.version)?,
            Some(ref b) => write!(f, "({}", b.version)?,
            None => write!(f, "(")?,
        }
        write!(f, ",")?;
        match self.upper {
            Some(ref b) if b.inclusive => write!(f, "{}]", b.version),
            Some(ref b) => write!(f, "{})", b.version),
            None => write!(f, ")"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ordering() {
        assert!(Version::parse("1.0") < Version::parse("2.0"));
        assert!(Version::parse("1.0.1") < Version::parse("1.1.0"));
        assert!(Version::parse("1.9") < Version::parse("1.10"));
    }

    #[test]
    fn qualifier_ranking() {
        let order = ["1.0-alpha", "1.0-beta", "1.0-m1", "1.0-rc1", "1.0-SNAPSHOT", "1.0", "1.0-sp1"];
        for pair in order.windows(2) {
            assert!(
                Version::parse(pair[0]) < Version::parse(pair[1]),
                "{} should sort before {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn trailing_zeros_are_padding() {
        assert_eq!(Version::parse("1.0"), Version::parse("1.0.0"));
        assert_eq!(Version::parse("1"), Version::parse("1.0.0.0"));
    }

    #[test]
    fn text_qualifier_sorts_before_release() {
        assert!(Version::parse("1.0.0-jre") < Version::parse("1.0.0"));
        assert!(Version::parse("31.0-jre") < Version::parse("32.0-jre"));
    }

    #[test]
    fn snapshot_base() {
        let v = Version::parse("2.1-SNAPSHOT");
        assert!(v.is_snapshot());
        assert_eq!(v.base(), "2.1");
    }

    #[test]
    fn range_membership() {
        let r = VersionRange::parse("[1.0,2.0)").unwrap();
        assert!(r.contains(&Version::parse("1.0")));
        assert!(r.contains(&Version::parse("1.9.9")));
        assert!(!r.contains(&Version::parse("2.0")));
        assert!(!r.contains(&Version::parse("0.9")));
    }

    #[test]
    fn range_open_bounds() {
        let r = VersionRange::parse("(,2.0]").unwrap();
        assert!(r.contains(&Version::parse("0.1")));
        assert!(r.contains(&Version::parse("2.0")));
        assert!(!r.contains(&Version::parse("2.0.1")));
    }

    #[test]
    fn range_exact_pin() {
        let r = VersionRange::parse("[1.5]").unwrap();
        assert!(r.contains(&Version::parse("1.5")));
        assert!(!r.contains(&Version::parse("1.5.1")));
    }

    #[test]
    fn bare_version_is_not_a_range() {
        assert!(VersionRange::parse("1.0").is_none());
        assert!(!VersionRange::is_range("1.0-SNAPSHOT"));
        assert!(VersionRange::is_range("[1.0,)"));
    }

    #[test]
    fn range_display() {
        let r = VersionRange::parse("[1.0,2.0)").unwrap();
        assert_eq!(r.to_string(), "[1.0,2.0)");
    }
}
