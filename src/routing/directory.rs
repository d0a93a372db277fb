//! Service directory.
//!
//! # Responsibilities
//! - Map the first path segment to a downstream base URL
//! - Freeze the mapping at construction
//!
//! # Design Decisions
//! - Case-sensitive exact lookup
//! - Base URLs stored without trailing slash so `base + path` never doubles `/`

use std::collections::HashMap;

/// Immutable identifier → base URL map.
#[derive(Debug, Clone, Default)]
pub struct ServiceDirectory {
    services: HashMap<String, String>,
}

impl ServiceDirectory {
    /// Build a directory from `(identifier, base_url)` pairs.
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let services = entries
            .into_iter()
            .map(|(id, url)| {
                let url: String = url.into();
                (id.into(), url.trim_end_matches('/').to_string())
            })
            .collect();
        Self { services }
    }

    /// Base URL for `identifier`, if known.
    pub fn lookup(&self, identifier: &str) -> Option<&str> {
        self.services.get(identifier).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Iterate identifiers (unordered).
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }
}
