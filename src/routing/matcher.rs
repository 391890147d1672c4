//! Wildcard path matching.
//!
//! Patterns use `*` glob classes and are matched against the request's path
//! component only; the host header is checked separately by the table and
//! never folded into the path.

use glob::Pattern;

use crate::error::RoutingError;

/// A route pattern compiled once into a path predicate.
///
/// `*` matches any run of characters including `/`, so `/api*` covers the
/// whole subtree while `/` stays exact. Paths are case-sensitive.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    compiled: Pattern,
}

impl PathPattern {
    pub fn compile(pattern: &str) -> Result<Self, RoutingError> {
        let compiled = Pattern::new(pattern).map_err(|source| RoutingError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            raw: pattern.to_string(),
            compiled,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.compiled.matches(path)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_pattern_is_exact() {
        let p = PathPattern::compile("/").unwrap();
        assert!(p.matches("/"));
        assert!(!p.matches("/x"));
    }

    #[test]
    fn star_covers_the_subtree() {
        let p = PathPattern::compile("/a*").unwrap();
        assert!(p.matches("/a"));
        assert!(p.matches("/abc"));
        assert!(p.matches("/a/b"));
        assert!(!p.matches("/b"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let p = PathPattern::compile("/API").unwrap();
        assert!(p.matches("/API"));
        assert!(!p.matches("/api"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(PathPattern::compile("/a[").is_err());
    }
}
