//! Route patterns and the per-bundle route table.
//!
//! Patterns are `/`-separated segments. A segment is either literal text,
//! a `:name` parameter matching one segment, or a trailing `*name` matching
//! the rest of the path.

use std::fmt;

use edge_core::{ConfigurationError, RouteParams};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Rest(String),
}

/// A parsed route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Parse a pattern such as `/posts/:slug`.
    pub fn parse(pattern: &str) -> Result<Self, ConfigurationError> {
        let invalid = |reason: &str| ConfigurationError::InvalidRoute {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if !pattern.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let mut segments = Vec::new();
        let parts: Vec<&str> = split_path(pattern).collect();
        for (i, part) in parts.iter().enumerate() {
            let segment = if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(invalid("parameter name is empty"));
                }
                Segment::Param(name.to_string())
            } else if let Some(name) = part.strip_prefix('*') {
                if name.is_empty() {
                    return Err(invalid("catch-all name is empty"));
                }
                if i + 1 != parts.len() {
                    return Err(invalid("catch-all must be the last segment"));
                }
                Segment::Rest(name.to_string())
            } else {
                Segment::Literal(part.to_string())
            };

            if let Segment::Param(name) | Segment::Rest(name) = &segment {
                let taken = segments
                    .iter()
                    .any(|s| matches!(s, Segment::Param(n) | Segment::Rest(n) if n == name));
                if taken {
                    return Err(invalid("parameter name used twice"));
                }
            }
            segments.push(segment);
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Pattern with parameter names erased. Two patterns with the same key
    /// match exactly the same paths.
    pub fn key(&self) -> String {
        let mut key = String::new();
        for segment in &self.segments {
            key.push('/');
            match segment {
                Segment::Literal(text) => key.push_str(text),
                Segment::Param(_) => key.push(':'),
                Segment::Rest(_) => key.push('*'),
            }
        }
        if key.is_empty() {
            key.push('/');
        }
        key
    }

    /// Match a request path, returning extracted parameters.
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let parts: Vec<&str> = split_path(path).collect();
        let mut params = RouteParams::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Rest(name) => {
                    params.insert(name.clone(), parts.get(i..)?.join("/"));
                    return Some(params);
                }
                Segment::Literal(text) => {
                    if *parts.get(i)? != text.as_str() {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.insert(name.clone(), (*parts.get(i)?).to_string());
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }

    /// Ordering weight: literals beat parameters, parameters beat catch-alls.
    fn specificity(&self) -> (usize, usize, usize) {
        let literals = self
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count();
        let params = self
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Param(_)))
            .count();
        let rest = usize::from(matches!(self.segments.last(), Some(Segment::Rest(_))));
        (literals, params, usize::MAX - rest)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Routes in match order, each carrying a value (the route's shim).
#[derive(Debug)]
pub struct RouteTable<T> {
    routes: Vec<(RoutePattern, T)>,
}

impl<T> RouteTable<T> {
    /// Build a table, rejecting patterns that match the same paths.
    pub fn new(routes: Vec<(RoutePattern, T)>) -> Result<Self, ConfigurationError> {
        let mut keys = std::collections::HashSet::new();
        for (pattern, _) in &routes {
            if !keys.insert(pattern.key()) {
                return Err(ConfigurationError::DuplicateRoute(pattern.as_str().to_string()));
            }
        }

        let mut routes = routes;
        // Stable sort keeps build order among equally specific patterns.
        routes.sort_by(|(a, _), (b, _)| b.specificity().cmp(&a.specificity()));
        Ok(Self { routes })
    }

    /// Find the first route matching `path`.
    pub fn lookup(&self, path: &str) -> Option<(&RoutePattern, &T, RouteParams)> {
        self.routes
            .iter()
            .find_map(|(pattern, value)| pattern.matches(path).map(|p| (pattern, value, p)))
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes in match order.
    pub fn iter(&self) -> impl Iterator<Item = (&RoutePattern, &T)> {
        self.routes.iter().map(|(p, v)| (p, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_extraction() {
        let pattern = RoutePattern::parse("/posts/:slug/comments/:id").unwrap();
        let params = pattern.matches("/posts/hello/comments/7").unwrap();
        assert_eq!(params["slug"], "hello");
        assert_eq!(params["id"], "7");
        assert!(pattern.matches("/posts/hello").is_none());
    }

    #[test]
    fn test_root_and_trailing_slash() {
        let root = RoutePattern::parse("/").unwrap();
        assert!(root.matches("/").is_some());
        assert!(root.matches("/x").is_none());

        let about = RoutePattern::parse("/about").unwrap();
        assert!(about.matches("/about/").is_some());
    }

    #[test]
    fn test_catch_all() {
        let pattern = RoutePattern::parse("/docs/*path").unwrap();
        assert_eq!(pattern.matches("/docs/a/b/c").unwrap()["path"], "a/b/c");
        assert_eq!(pattern.matches("/docs").unwrap()["path"], "");
        assert!(RoutePattern::parse("/docs/*path/edit").is_err());
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(RoutePattern::parse("posts").is_err());
        assert!(RoutePattern::parse("/posts/:").is_err());
        assert!(RoutePattern::parse("/a/:id/b/:id").is_err());
    }

    #[test]
    fn test_table_rejects_equivalent_patterns() {
        let result = RouteTable::new(vec![
            (RoutePattern::parse("/posts/:id").unwrap(), 1),
            (RoutePattern::parse("/posts/:slug").unwrap(), 2),
        ]);
        assert!(matches!(result, Err(ConfigurationError::DuplicateRoute(_))));
    }

    #[test]
    fn test_table_prefers_literal_segments() {
        let table = RouteTable::new(vec![
            (RoutePattern::parse("/*rest").unwrap(), "catch-all"),
            (RoutePattern::parse("/posts/:slug").unwrap(), "post"),
            (RoutePattern::parse("/posts/new").unwrap(), "new"),
        ])
        .unwrap();

        assert_eq!(*table.lookup("/posts/new").unwrap().1, "new");
        assert_eq!(*table.lookup("/posts/hello").unwrap().1, "post");
        assert_eq!(*table.lookup("/elsewhere").unwrap().1, "catch-all");
    }
}
