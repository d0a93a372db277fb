//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled route rules
//! - Look up the first rule matching a request
//! - Return matched rule plus captured parameters, or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in declaration order; first match wins
//! - Explicit NoMatch rather than silent default

use axum::http::Method;

use crate::config::{GuardKind, PreActionConfig, RewriteConfig, RouteConfig};
use crate::routing::matcher::{AndMatcher, Matcher, MethodMatcher, Params, PatternMatcher};

/// A compiled route rule.
#[derive(Debug)]
pub struct RouteRule {
    pub name: String,
    pub guard: GuardKind,
    pub rewrites: Vec<RewriteConfig>,
    pub pre_action: Option<PreActionConfig>,
    pub compensate: bool,
    matcher: AndMatcher,
}

/// A rule selected for one request.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub rule: &'a RouteRule,
    pub params: Params,
}

/// Ordered, immutable route table.
#[derive(Debug, Default)]
pub struct Router {
    rules: Vec<RouteRule>,
}

impl Router {
    /// Compile rules in declaration order.
    pub fn from_config(routes: Vec<RouteConfig>) -> Self {
        let mut rules = Vec::with_capacity(routes.len());

        for route in routes {
            let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();
            if let Some(method) = &route.method {
                match Method::from_bytes(method.as_bytes()) {
                    Ok(method) => matchers.push(Box::new(MethodMatcher::new(method))),
                    Err(_) => {
                        tracing::warn!(route = %route.name, method = %method, "Skipping route with invalid method");
                        continue;
                    }
                }
            }
            matchers.push(Box::new(PatternMatcher::new(&route.pattern)));

            rules.push(RouteRule {
                name: route.name,
                guard: route.guard,
                rewrites: route.rewrites,
                pre_action: route.pre_action,
                compensate: route.compensate,
                matcher: AndMatcher::new(matchers),
            });
        }

        tracing::debug!(routes = rules.len(), "Route table compiled");
        Self { rules }
    }

    /// First rule matching `method` and `path`.
    pub fn match_request(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.rules.iter().find_map(|rule| {
            let mut params = Params::default();
            rule.matcher
                .matches(method, path, &mut params)
                .then_some(RouteMatch { rule, params })
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
