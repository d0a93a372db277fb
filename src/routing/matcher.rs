//! Route matching logic.
//!
//! # Responsibilities
//! - Match request method (exact, or any)
//! - Match path against a segment pattern, capturing `:name` segments
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Empty path segments are ignored (`/users//me/` matches `/users/me`)
//! - `*` matches one segment; as the final segment it matches any remainder
//! - No regex to guarantee O(n) matching

use axum::http::Method;

/// Path parameters captured by a match, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn push(&mut self, name: &str, value: &str) {
        self.0.push((name.to_string(), value.to_string()));
    }

    fn extend(&mut self, other: Params) {
        self.0.extend(other.0);
    }
}

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches; captured parameters go into `params`.
    fn matches(&self, method: &Method, path: &str, params: &mut Params) -> bool;
}

/// Matches the request method.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    method: Method,
}

impl MethodMatcher {
    pub fn new(method: Method) -> Self {
        Self { method }
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, method: &Method, _path: &str, _params: &mut Params) -> bool {
        *method == self.method
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
}

/// Matches the request path against a segment pattern.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    segments: Vec<Segment>,
}

impl PatternMatcher {
    /// Compile a pattern such as `/admin-backend/users/:uid/lock-status`.
    pub fn new(pattern: &str) -> Self {
        let segments = path_segments(pattern)
            .map(|segment| {
                if segment == "*" {
                    Segment::Wildcard
                } else if let Some(name) = segment.strip_prefix(':') {
                    Segment::Param(name.to_string())
                } else {
                    Segment::Literal(segment.to_string())
                }
            })
            .collect();
        Self { segments }
    }
}

impl Matcher for PatternMatcher {
    fn matches(&self, _method: &Method, path: &str, params: &mut Params) -> bool {
        let actual: Vec<&str> = path_segments(path).collect();
        let mut captured = Params::default();
        let last = self.segments.len().saturating_sub(1);

        for (i, expected) in self.segments.iter().enumerate() {
            match (expected, actual.get(i)) {
                (Segment::Wildcard, _) if i == last => {
                    params.extend(captured);
                    return true;
                }
                (Segment::Wildcard, Some(_)) => {}
                (Segment::Param(name), Some(value)) => captured.push(name, value),
                (Segment::Literal(literal), Some(value)) if literal == value => {}
                _ => return false,
            }
        }

        if actual.len() == self.segments.len() {
            params.extend(captured);
            true
        } else {
            false
        }
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, method: &Method, path: &str, params: &mut Params) -> bool {
        // All matchers must pass (AND)
        let mut captured = Params::default();
        let all = self
            .matchers
            .iter()
            .all(|m| m.matches(method, path, &mut captured));
        if all {
            params.extend(captured);
        }
        all
    }
}

/// Non-empty `/`-separated segments of a path.
pub fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}
