//! Rule filters - predicates over a single file

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

use crate::error::{Error, Result};

/// Filter kinds accepted in configuration files
pub const FILTERS: [&str; 5] = ["name", "ext", "size", "lastEdited", "contains"];

/// Comparison operator used by `size` and `lastEdited`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Less,
    Equal,
    /// Anything not recognized as less-than or equality
    Greater,
}

impl Comparison {
    pub fn parse(token: &str) -> Self {
        match token {
            "lt" | "<" => Self::Less,
            "eq" | "=" | "==" => Self::Equal,
            _ => Self::Greater,
        }
    }

    /// Compare `actual` against `threshold`
    pub fn holds<T: Ord>(self, actual: T, threshold: T) -> bool {
        match self {
            Self::Less => actual < threshold,
            Self::Equal => actual == threshold,
            Self::Greater => actual > threshold,
        }
    }
}

/// Predicate evaluated against each file a rule visits
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "FilterSpec")]
pub enum Filter {
    /// Regex matched anywhere in the full path
    Name(Regex),
    /// Literal suffix of the path
    Ext(String),
    /// File size in bytes
    Size { cmp: Comparison, bytes: i64 },
    /// Modification time in Unix seconds
    LastEdited { cmp: Comparison, timestamp: i64 },
    /// Regex matched anywhere in the file content
    Contains(regex::bytes::Regex),
}

/// Raw `{ filter, payload }` pair as written in configuration
#[derive(Debug, Deserialize)]
struct FilterSpec {
    filter: String,
    #[serde(default)]
    payload: String,
}

impl TryFrom<FilterSpec> for Filter {
    type Error = Error;

    fn try_from(spec: FilterSpec) -> Result<Self> {
        Filter::parse(&spec.filter, &spec.payload)
    }
}

impl Filter {
    /// Build a filter from its kind and payload
    pub fn parse(kind: &str, payload: &str) -> Result<Self> {
        let filter = match kind {
            "name" => Self::Name(compile(payload)?),
            "ext" => Self::Ext(payload.to_string()),
            "size" => {
                let (cmp, bytes) = parse_threshold("size", payload)?;
                Self::Size { cmp, bytes }
            }
            "lastEdited" => {
                let (cmp, timestamp) = parse_threshold("lastEdited", payload)?;
                Self::LastEdited { cmp, timestamp }
            }
            "contains" => Self::Contains(
                regex::bytes::Regex::new(payload).map_err(|source| Error::InvalidRegex {
                    pattern: payload.to_string(),
                    source,
                })?,
            ),
            other => return Err(Error::UnknownFilter(other.to_string())),
        };
        Ok(filter)
    }

    /// Configuration name of this filter
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::Ext(_) => "ext",
            Self::Size { .. } => "size",
            Self::LastEdited { .. } => "lastEdited",
            Self::Contains(_) => "contains",
        }
    }

    /// Check whether a file satisfies this filter.
    ///
    /// Stat failures are errors. A `contains` filter that cannot read the
    /// file logs the failure and reports no match instead.
    pub fn matches(&self, path: &Path) -> Result<bool> {
        match self {
            Self::Name(regex) => Ok(regex.is_match(&path.to_string_lossy())),
            Self::Ext(suffix) => Ok(path.to_string_lossy().ends_with(suffix.as_str())),
            Self::Size { cmp, bytes } => {
                let metadata = std::fs::metadata(path).map_err(Error::io("stat", path))?;
                Ok(cmp.holds(i128::from(metadata.len()), i128::from(*bytes)))
            }
            Self::LastEdited { cmp, timestamp } => {
                let modified = std::fs::metadata(path)
                    .and_then(|m| m.modified())
                    .map_err(Error::io("stat", path))?;
                let modified = DateTime::<Utc>::from(modified).timestamp();
                Ok(cmp.holds(modified, *timestamp))
            }
            Self::Contains(regex) => match std::fs::read(path) {
                Ok(data) => Ok(regex.is_match(&data)),
                Err(e) => {
                    warn!("Failed to read file {}: {}", path.display(), e);
                    Ok(false)
                }
            },
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| Error::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

// "<op> <value>"
fn parse_threshold<T: FromStr>(kind: &'static str, payload: &str) -> Result<(Comparison, T)> {
    let invalid = |reason: &str| Error::InvalidPayload {
        kind,
        payload: payload.to_string(),
        reason: reason.to_string(),
    };

    let parts: Vec<&str> = payload.split_whitespace().collect();
    let [op, value] = parts.as_slice() else {
        return Err(invalid("expected `<op> <value>`"));
    };
    let value = value.parse().map_err(|_| invalid("value is not an integer"))?;

    Ok((Comparison::parse(op), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::{Duration, UNIX_EPOCH};

    fn filter(kind: &str, payload: &str) -> Filter {
        Filter::parse(kind, payload).unwrap()
    }

    #[test]
    fn test_comparison_tokens() {
        assert_eq!(Comparison::parse("lt"), Comparison::Less);
        assert_eq!(Comparison::parse("<"), Comparison::Less);
        for token in ["eq", "=", "=="] {
            assert_eq!(Comparison::parse(token), Comparison::Equal);
        }
        for token in ["gt", ">", "ge", "whatever"] {
            assert_eq!(Comparison::parse(token), Comparison::Greater);
        }
    }

    #[test]
    fn test_name_matches_full_path() {
        let f = filter("name", "^/tmp/.*report");
        assert!(f.matches(Path::new("/tmp/docs/report.txt")).unwrap());
        assert!(!f.matches(Path::new("/home/report.txt")).unwrap());
    }

    #[test]
    fn test_ext_is_plain_suffix() {
        let f = filter("ext", ".tar.gz");
        assert!(f.matches(Path::new("/tmp/a.tar.gz")).unwrap());
        assert!(!f.matches(Path::new("/tmp/a.gz")).unwrap());
        assert!(filter("ext", "gz").matches(Path::new("/tmp/targz")).unwrap());
    }

    #[test]
    fn test_size() {
        let dir = tempfile::tempdir().unwrap();
        let small = dir.path().join("small");
        let large = dir.path().join("large");
        std::fs::write(&small, vec![b'a'; 50]).unwrap();
        std::fs::write(&large, vec![b'a'; 150]).unwrap();

        let lt = filter("size", "lt 100");
        assert!(lt.matches(&small).unwrap());
        assert!(!lt.matches(&large).unwrap());

        assert!(filter("size", "== 50").matches(&small).unwrap());
        assert!(filter("size", "gt 100").matches(&large).unwrap());
        assert!(filter("size", "?? 100").matches(&large).unwrap());
        assert!(!filter("size", "?? 100").matches(&small).unwrap());
    }

    #[test]
    fn test_size_negative_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty");
        std::fs::write(&empty, b"").unwrap();

        let gt = filter("size", "gt -1");
        assert!(gt.matches(&empty).unwrap());
        assert!(!filter("size", "lt -1").matches(&empty).unwrap());
    }

    #[test]
    fn test_size_stat_failure_is_error() {
        let f = filter("size", "lt 100");
        assert!(matches!(
            f.matches(Path::new("/definitely/not/here")),
            Err(Error::Io { op: "stat", .. })
        ));
    }

    #[test]
    fn test_malformed_threshold_payload() {
        assert!(matches!(
            Filter::parse("size", "100"),
            Err(Error::InvalidPayload { kind: "size", .. })
        ));
        assert!(matches!(
            Filter::parse("size", "lt ten"),
            Err(Error::InvalidPayload { .. })
        ));
        assert!(matches!(
            Filter::parse("lastEdited", "lt 1 2"),
            Err(Error::InvalidPayload { kind: "lastEdited", .. })
        ));
    }

    #[test]
    fn test_last_edited() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.log");
        let file = File::create(&path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_secs(1_000))
            .unwrap();
        drop(file);

        assert!(filter("lastEdited", "lt 2000").matches(&path).unwrap());
        assert!(filter("lastEdited", "eq 1000").matches(&path).unwrap());
        assert!(filter("lastEdited", "gt 500").matches(&path).unwrap());
        assert!(!filter("lastEdited", "gt 1000").matches(&path).unwrap());
    }

    #[test]
    fn test_contains() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "alpha\nTODO: beta\n").unwrap();

        assert!(filter("contains", r"TODO:\s+\w+").matches(&path).unwrap());
        assert!(!filter("contains", "gamma").matches(&path).unwrap());
    }

    #[test]
    fn test_contains_unreadable_is_no_match() {
        let f = filter("contains", ".*");
        assert!(!f.matches(Path::new("/definitely/not/here")).unwrap());
    }

    #[test]
    fn test_unknown_and_invalid() {
        assert!(matches!(
            Filter::parse("color", "red"),
            Err(Error::UnknownFilter(kind)) if kind == "color"
        ));
        assert!(matches!(
            Filter::parse("name", "(unclosed"),
            Err(Error::InvalidRegex { .. })
        ));
    }
}
