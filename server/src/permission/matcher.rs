use std::fmt;

use thiserror::Error;
use tracing::debug;

use shared::types::PermissionLevel;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PermissionError {
    #[error("invalid path pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("path patterns '{first}' and '{second}' can match the same path")]
    Overlap { first: String, second: String },
}

// ---------------------------------------------------------------------------
// Pattern
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `:name`: any non-empty segment.
    Any(String),
    /// `#name`: non-empty, ASCII digits only.
    Numeric(String),
}

impl Segment {
    fn matches(&self, value: &str) -> bool {
        match self {
            Segment::Literal(lit) => lit == value,
            Segment::Any(_) => !value.is_empty(),
            Segment::Numeric(_) => is_numeric(value),
        }
    }

    /// Whether some concrete segment value satisfies both.
    fn intersects(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            (Segment::Literal(lit), param) | (param, Segment::Literal(lit)) => param.matches(lit),
            _ => true,
        }
    }
}

/// A rule pattern such as `/api/test/:id` or `/orders/#order_id/items`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, PermissionError> {
        let invalid = |reason: &str| PermissionError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let parts = split_segments(pattern);
        let is_root = parts.len() == 1 && parts[0].is_empty();

        let mut segments = Vec::with_capacity(parts.len());
        for part in parts {
            let segment = if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(invalid("placeholder ':' needs a name"));
                }
                Segment::Any(name.to_string())
            } else if let Some(name) = part.strip_prefix('#') {
                if name.is_empty() {
                    return Err(invalid("placeholder '#' needs a name"));
                }
                Segment::Numeric(name.to_string())
            } else {
                if part.is_empty() && !is_root {
                    return Err(invalid("empty path segment"));
                }
                Segment::Literal(part.to_string())
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        let parts = split_segments(path);

        parts.len() == self.segments.len()
            && self
                .segments
                .iter()
                .zip(parts)
                .all(|(segment, value)| segment.matches(value))
    }

    fn overlaps(&self, other: &PathPattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.intersects(b))
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PermissionRule {
    pub pattern: PathPattern,
    pub level: PermissionLevel,
}

/// Immutable path -> permission table.
///
/// Construction rejects any two patterns that could match a common path, so
/// resolution never has to break a tie.
#[derive(Debug, Clone, Default)]
pub struct PermissionTable {
    rules: Vec<PermissionRule>,
}

impl PermissionTable {
    pub fn new<I, S>(rules: I) -> Result<Self, PermissionError>
    where
        I: IntoIterator<Item = (S, PermissionLevel)>,
        S: AsRef<str>,
    {
        let mut parsed: Vec<PermissionRule> = Vec::new();

        for (pattern, level) in rules {
            let pattern = PathPattern::parse(pattern.as_ref())?;

            if let Some(existing) = parsed.iter().find(|r| r.pattern.overlaps(&pattern)) {
                return Err(PermissionError::Overlap {
                    first: existing.pattern.to_string(),
                    second: pattern.to_string(),
                });
            }

            debug!("Permission rule: {} -> {}", pattern, level);
            parsed.push(PermissionRule { pattern, level });
        }

        Ok(Self { rules: parsed })
    }

    /// Required level for `path`, or `None` when no rule matches.
    pub fn resolve(&self, path: &str) -> Option<PermissionLevel> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .map(|rule| rule.level)
    }

    pub fn rules(&self) -> &[PermissionRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn split_segments(path: &str) -> Vec<&str> {
    path.trim_matches('/').split('/').collect()
}

fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rules: &[(&str, PermissionLevel)]) -> PermissionTable {
        PermissionTable::new(rules.iter().copied()).unwrap()
    }

    #[test]
    fn placeholder_accepts_any_non_empty_segment() {
        let p = PathPattern::parse("/api/test/:id").unwrap();
        assert!(p.matches("/api/test/453"));
        assert!(p.matches("/api/test/abc"));
        assert!(!p.matches("/api/test"));
        assert!(!p.matches("/api/test/453/extra"));
    }

    #[test]
    fn numeric_placeholder_rejects_non_digits() {
        let p = PathPattern::parse("/api/test/#id").unwrap();
        assert!(p.matches("/api/test/453"));
        assert!(!p.matches("/api/test/abc"));
        assert!(!p.matches("/api/test/45a"));
        assert!(!p.matches("/api/test/-1"));
    }

    #[test]
    fn placeholder_rejects_empty_segment() {
        let p = PathPattern::parse("/api/:id/items").unwrap();
        assert!(p.matches("/api/7/items"));
        assert!(!p.matches("/api//items"));
    }

    #[test]
    fn leading_and_trailing_slashes_are_ignored() {
        let p = PathPattern::parse("api/profile/").unwrap();
        assert!(p.matches("/api/profile"));
        assert!(p.matches("/api/profile/"));
        assert!(p.matches("api/profile"));
    }

    #[test]
    fn literals_are_case_sensitive() {
        let p = PathPattern::parse("/Protected").unwrap();
        assert!(!p.matches("/protected"));
    }

    #[test]
    fn root_pattern_matches_root_only() {
        let p = PathPattern::parse("/").unwrap();
        assert!(p.matches("/"));
        assert!(p.matches(""));
        assert!(!p.matches("/x"));
    }

    #[test]
    fn unnamed_placeholders_are_invalid() {
        assert!(matches!(
            PathPattern::parse("/api/:"),
            Err(PermissionError::InvalidPattern { .. })
        ));
        assert!(matches!(
            PathPattern::parse("/api/#/x"),
            Err(PermissionError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn interior_empty_segment_is_invalid() {
        assert!(PathPattern::parse("/api//x").is_err());
    }

    #[test]
    fn resolve_returns_level_of_matching_rule() {
        let t = table(&[("/protected", 1), ("/api/test/:id", 2), ("/api/orders/#id", 3)]);
        assert_eq!(t.resolve("/protected"), Some(1));
        assert_eq!(t.resolve("/api/test/abc"), Some(2));
        assert_eq!(t.resolve("/api/orders/12"), Some(3));
        assert_eq!(t.resolve("/api/orders/twelve"), None);
        assert_eq!(t.resolve("/unknown"), None);
    }

    #[test]
    fn literal_against_permissive_placeholder_overlaps() {
        let err = PermissionTable::new([("/api/test/:uuid", 1), ("/api/test/t", 2)]).unwrap_err();
        assert_eq!(
            err,
            PermissionError::Overlap {
                first: "/api/test/:uuid".into(),
                second: "/api/test/t".into(),
            }
        );
    }

    #[test]
    fn non_numeric_literal_next_to_strict_placeholder_is_allowed() {
        let t = table(&[("/api/test/#id", 1), ("/api/test/latest", 2)]);
        assert_eq!(t.resolve("/api/test/9"), Some(1));
        assert_eq!(t.resolve("/api/test/latest"), Some(2));
    }

    #[test]
    fn numeric_literal_next_to_strict_placeholder_overlaps() {
        assert!(PermissionTable::new([("/api/test/#id", 1), ("/api/test/0", 2)]).is_err());
    }

    #[test]
    fn placeholders_always_overlap_each_other() {
        assert!(PermissionTable::new([("/a/:x", 1), ("/a/#y", 2)]).is_err());
        assert!(PermissionTable::new([("/a/:x/b", 1), ("/a/:y/b", 2)]).is_err());
    }

    #[test]
    fn duplicate_patterns_overlap() {
        assert!(PermissionTable::new([("/a", 1), ("/a/", 2)]).is_err());
    }

    #[test]
    fn different_lengths_never_overlap() {
        let t = table(&[("/a/:x", 1), ("/a/:x/:y", 2), ("/a", 3)]);
        assert_eq!(t.len(), 3);
        assert_eq!(t.resolve("/a/1/2"), Some(2));
    }

    #[test]
    fn partially_disjoint_patterns_do_not_overlap() {
        let t = table(&[("/a/:x/b", 1), ("/a/:x/c", 2)]);
        assert_eq!(t.resolve("/a/z/c"), Some(2));
    }

    #[test]
    fn empty_table_matches_nothing() {
        let t = PermissionTable::default();
        assert!(t.is_empty());
        assert_eq!(t.resolve("/"), None);
    }
}
