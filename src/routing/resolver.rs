//! Route resolution: path rewrites and service lookup.
//!
//! # Responsibilities
//! - Apply a rule's rewrites to the inbound path (prefix strip, self placeholder)
//! - Extract the service identifier (first non-empty segment)
//! - Look the identifier up in the service directory
//!
//! # Design Decisions
//! - Pure string work plus one map lookup; no I/O
//! - The rewritten path is written back onto the inbound request
//! - Placeholder substitution is per segment, never substring

use crate::config::RewriteConfig;
use crate::http::request::InboundRequest;
use crate::routing::directory::ServiceDirectory;
use crate::routing::matcher::path_segments;
use crate::security::principal::Principal;

/// Local resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("No service was provided")]
    NoServiceProvided,
    #[error("Unknown service: {0}")]
    UnknownService(String),
    #[error("No user UID found")]
    MissingPrincipal,
}

/// Where a request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub service: String,
    pub base_url: String,
    pub path: String,
}

impl ResolvedTarget {
    /// `base_url + path`, plus the raw query when present.
    pub fn url(&self, query: Option<&str>) -> String {
        match query {
            Some(query) if !query.is_empty() => format!("{}{}?{}", self.base_url, self.path, query),
            _ => format!("{}{}", self.base_url, self.path),
        }
    }
}

/// Resolves requests against an immutable [`ServiceDirectory`].
#[derive(Debug, Clone)]
pub struct RouteResolver {
    directory: ServiceDirectory,
}

impl RouteResolver {
    pub fn new(directory: ServiceDirectory) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &ServiceDirectory {
        &self.directory
    }

    /// Apply `rewrites` in order, updating `request.path` in place.
    pub fn rewrite(
        &self,
        request: &mut InboundRequest,
        rewrites: &[RewriteConfig],
        principal: Option<&Principal>,
    ) -> Result<(), RouteError> {
        for rewrite in rewrites {
            let rewritten = match rewrite {
                RewriteConfig::StripPrefix { segment } => strip_prefix(&request.path, segment),
                RewriteConfig::SelfPlaceholder { token } => {
                    let id = principal
                        .map(|p| p.id.as_str())
                        .filter(|id| !id.is_empty())
                        .ok_or(RouteError::MissingPrincipal)?;
                    substitute_placeholder(&request.path, token, id)
                }
            };
            if rewritten != request.path {
                tracing::debug!(from = %request.path, to = %rewritten, "Path rewritten");
                request.path = rewritten;
            }
        }
        Ok(())
    }

    /// Resolve a (rewritten) path to its downstream target.
    pub fn resolve(&self, path: &str) -> Result<ResolvedTarget, RouteError> {
        let service = path_segments(path)
            .next()
            .ok_or(RouteError::NoServiceProvided)?;

        let base_url = self
            .directory
            .lookup(service)
            .ok_or_else(|| RouteError::UnknownService(service.to_string()))?;

        Ok(ResolvedTarget {
            service: service.to_string(),
            base_url: base_url.to_string(),
            path: path.to_string(),
        })
    }
}

/// Remove a leading `/segment` from `path`. Other paths are returned unchanged.
pub fn strip_prefix(path: &str, segment: &str) -> String {
    let rest = path
        .strip_prefix('/')
        .and_then(|p| p.strip_prefix(segment));

    match rest {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => path.to_string(),
    }
}

/// Replace every segment equal to `token` with `id`.
pub fn substitute_placeholder(path: &str, token: &str, id: &str) -> String {
    path.split('/')
        .map(|segment| if segment == token { id } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}
