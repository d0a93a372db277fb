//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::AccountRecord;
use crate::security::principal::{Principal, Provider};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Outbound client settings.
    pub upstream: UpstreamConfig,

    /// Service directory: first path segment → downstream base URL.
    pub services: ServicesConfig,

    /// Admission settings (gateway token, principal verifier).
    pub auth: AuthConfig,

    /// Identity system the pre-actions write to.
    pub identity: IdentityConfig,

    /// Route rules. Empty means the built-in table.
    pub routes: Vec<RouteConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl GatewayConfig {
    /// Configured routes, falling back to the built-in table.
    pub fn effective_routes(&self) -> Vec<RouteConfig> {
        if self.routes.is_empty() {
            default_routes()
        } else {
            self.routes.clone()
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Maximum buffered request body in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Inbound request budget in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Outbound client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Maximum buffered downstream response body in bytes.
    pub max_body_size: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Identifier → base URL pairs, kept ordered for stable logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ServicesConfig(pub BTreeMap<String, String>);

impl Default for ServicesConfig {
    fn default() -> Self {
        let mut services = BTreeMap::new();
        services.insert("users".to_string(), DEFAULT_USERS_URL.to_string());
        services.insert("courses".to_string(), DEFAULT_EDUCATION_URL.to_string());
        services.insert("evaluations".to_string(), DEFAULT_EDUCATION_URL.to_string());
        services.insert("admins".to_string(), DEFAULT_ADMINS_URL.to_string());
        Self(services)
    }
}

pub const DEFAULT_USERS_URL: &str = "http://localhost:3001";
pub const DEFAULT_EDUCATION_URL: &str = "http://localhost:3002";
pub const DEFAULT_ADMINS_URL: &str = "http://localhost:3004";

/// Admission configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret trusted first-party callers present as a Bearer token.
    pub gateway_token: String,

    /// How end-user Bearer tokens are verified.
    pub verifier: VerifierConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            gateway_token: "gateway-token".to_string(),
            verifier: VerifierConfig::default(),
        }
    }
}

/// Principal verifier selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerifierConfig {
    /// Fixed token → principal table (development, tests).
    Static {
        #[serde(default)]
        principals: Vec<StaticPrincipalConfig>,
    },
    /// Remote token-info endpoint.
    TokenInfo {
        endpoint: String,
        #[serde(default)]
        provider: Provider,
    },
}

impl Default for VerifierConfig {
    fn default() -> Self {
        VerifierConfig::TokenInfo {
            endpoint: "https://oauth2.googleapis.com/tokeninfo".to_string(),
            provider: Provider::Google,
        }
    }
}

/// One entry of the static verifier table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticPrincipalConfig {
    pub token: String,
    #[serde(flatten)]
    pub principal: Principal,
}

/// Identity system selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdentityConfig {
    /// Process-local accounts, optionally seeded.
    Memory {
        #[serde(default)]
        accounts: Vec<AccountRecord>,
    },
    /// Remote account admin API.
    Http { base_url: String },
}

impl Default for IdentityConfig {
    fn default() -> Self {
        IdentityConfig::Memory {
            accounts: Vec::new(),
        }
    }
}

/// Which admission check a route requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GuardKind {
    /// No admission check.
    #[default]
    None,
    /// Verified end-user Bearer token; attaches a principal.
    Principal,
    /// Shared gateway token; no principal attached.
    GatewayToken,
}

/// Path rewrite applied before service resolution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RewriteConfig {
    /// Remove a leading path segment.
    StripPrefix { segment: String },
    /// Replace segments equal to `token` with the principal's id.
    SelfPlaceholder { token: String },
}

/// Mutation applied to the identity system before forwarding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreActionConfig {
    /// Body `email` becomes the principal's identity email.
    SyncEmail,
    /// Body `locked` becomes the `disabled` flag of the account named by `param`.
    SetAccountLock { param: String },
}

/// Route rule mapping a request shape to admission and dispatch behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// HTTP method to match; `None` matches any method.
    #[serde(default)]
    pub method: Option<String>,

    /// Segment pattern, e.g. `/users/:id/lock-status` or `/admins/*`.
    pub pattern: String,

    #[serde(default)]
    pub guard: GuardKind,

    #[serde(default)]
    pub rewrites: Vec<RewriteConfig>,

    #[serde(default)]
    pub pre_action: Option<PreActionConfig>,

    /// Roll the pre-action back when forwarding fails.
    #[serde(default)]
    pub compensate: bool,
}

impl RouteConfig {
    fn new(name: &str, method: Option<&str>, pattern: &str, guard: GuardKind) -> Self {
        Self {
            name: name.to_string(),
            method: method.map(str::to_string),
            pattern: pattern.to_string(),
            guard,
            rewrites: Vec::new(),
            pre_action: None,
            compensate: false,
        }
    }

    fn rewrite(mut self, rewrite: RewriteConfig) -> Self {
        self.rewrites.push(rewrite);
        self
    }

    fn pre_action(mut self, action: PreActionConfig, compensate: bool) -> Self {
        self.pre_action = Some(action);
        self.compensate = compensate;
        self
    }
}

pub const SELF_PLACEHOLDER: &str = "me";
pub const ADMIN_BACKEND_PREFIX: &str = "admin-backend";

/// The built-in route table, ordered most specific first.
pub fn default_routes() -> Vec<RouteConfig> {
    let self_placeholder = || RewriteConfig::SelfPlaceholder {
        token: SELF_PLACEHOLDER.to_string(),
    };
    let strip_admin = || RewriteConfig::StripPrefix {
        segment: ADMIN_BACKEND_PREFIX.to_string(),
    };

    vec![
        RouteConfig::new("admins-root", None, "/admins", GuardKind::None),
        RouteConfig::new("admins", None, "/admins/*", GuardKind::None),
        RouteConfig::new("user-lock-check", Some("GET"), "/users/*/check-lock-status", GuardKind::None),
        RouteConfig::new("user-failed-attempts", Some("PATCH"), "/users/*/failed-attempts", GuardKind::None),
        RouteConfig::new("user-register", Some("POST"), "/users", GuardKind::None),
        RouteConfig::new("self-get", Some("GET"), "/users/me", GuardKind::Principal)
            .rewrite(self_placeholder()),
        RouteConfig::new("self-patch", Some("PATCH"), "/users/me", GuardKind::Principal)
            .rewrite(self_placeholder())
            .pre_action(PreActionConfig::SyncEmail, true),
        RouteConfig::new(
            "admin-lock",
            Some("PATCH"),
            "/admin-backend/users/:uid/lock-status",
            GuardKind::GatewayToken,
        )
        .rewrite(strip_admin())
        .pre_action(
            PreActionConfig::SetAccountLock {
                param: "uid".to_string(),
            },
            false,
        ),
        RouteConfig::new("admin-backend", None, "/admin-backend/*", GuardKind::GatewayToken)
            .rewrite(strip_admin()),
        RouteConfig::new("default", None, "/*", GuardKind::Principal),
    ]
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_known_services() {
        let config = GatewayConfig::default();
        assert_eq!(config.services.0["users"], DEFAULT_USERS_URL);
        assert_eq!(config.services.0["courses"], DEFAULT_EDUCATION_URL);
        assert_eq!(config.services.0["evaluations"], DEFAULT_EDUCATION_URL);
        assert_eq!(config.services.0["admins"], DEFAULT_ADMINS_URL);
        assert_eq!(config.effective_routes().len(), default_routes().len());
        assert_eq!(config.upstream.max_body_size, 10 * 1024 * 1024);
    }

    #[test]
    fn test_parse_toml_sections() {
        let raw = r#"
            [listener]
            bind_address = "127.0.0.1:8000"

            [upstream]
            max_body_size = 4096

            [services]
            users = "http://users.internal:8080"

            [auth]
            gateway_token = "s3cret"

            [auth.verifier]
            kind = "static"

            [[auth.verifier.principals]]
            token = "dev-token"
            id = "dev-user"
            email = "dev@example.com"

            [identity]
            kind = "http"
            base_url = "http://identity.internal"

            [[routes]]
            name = "self-patch"
            method = "PATCH"
            pattern = "/users/me"
            guard = "principal"
            rewrites = [{ kind = "self_placeholder", token = "me" }]
            pre_action = { kind = "sync_email" }
            compensate = true
        "#;

        let config: GatewayConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:8000");
        assert_eq!(config.upstream.max_body_size, 4096);
        assert_eq!(config.timeouts.request_secs, 30);
        assert_eq!(config.services.0.len(), 1);
        assert_eq!(config.auth.gateway_token, "s3cret");
        match &config.auth.verifier {
            VerifierConfig::Static { principals } => {
                assert_eq!(principals[0].token, "dev-token");
                assert_eq!(principals[0].principal.id, "dev-user");
            }
            other => panic!("unexpected verifier: {:?}", other),
        }
        assert!(matches!(config.identity, IdentityConfig::Http { .. }));
        assert_eq!(config.routes[0].guard, GuardKind::Principal);
        assert_eq!(config.routes[0].pre_action, Some(PreActionConfig::SyncEmail));
        assert!(config.routes[0].compensate);
    }
}
