//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Service base URLs are absolute `http` URLs
//! - Route rules are internally consistent (patterns, methods, guards)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::Method;
use url::Url;

use crate::config::schema::{
    GatewayConfig, GuardKind, IdentityConfig, PreActionConfig, RewriteConfig, RouteConfig,
    VerifierConfig,
};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),
    #[error("listener.max_body_size must be greater than zero")]
    BodyLimit,
    #[error("timeouts.request_secs must be greater than zero")]
    RequestTimeout,
    #[error("upstream.max_body_size must be greater than zero")]
    UpstreamBodyLimit,
    #[error("services is empty")]
    NoServices,
    #[error("service `{service}` has invalid base URL `{url}`: {reason}")]
    ServiceUrl {
        service: String,
        url: String,
        reason: String,
    },
    #[error("auth.gateway_token must not be empty")]
    GatewayToken,
    #[error("auth.verifier endpoint `{0}` is not a valid URL")]
    VerifierEndpoint(String),
    #[error("identity.base_url `{0}` is not a valid URL")]
    IdentityUrl(String),
    #[error("route `{route}`: {reason}")]
    Route { route: String, reason: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config
        .listener
        .bind_address
        .parse::<std::net::SocketAddr>()
        .is_err()
    {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::BodyLimit);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }
    if config.upstream.max_body_size == 0 {
        errors.push(ValidationError::UpstreamBodyLimit);
    }

    if config.services.0.is_empty() {
        errors.push(ValidationError::NoServices);
    }
    for (service, url) in &config.services.0 {
        if let Err(reason) = check_service_url(url) {
            errors.push(ValidationError::ServiceUrl {
                service: service.clone(),
                url: url.clone(),
                reason,
            });
        }
    }

    if config.auth.gateway_token.is_empty() {
        errors.push(ValidationError::GatewayToken);
    }
    if let VerifierConfig::TokenInfo { endpoint, .. } = &config.auth.verifier {
        if Url::parse(endpoint).is_err() {
            errors.push(ValidationError::VerifierEndpoint(endpoint.clone()));
        }
    }
    if let IdentityConfig::Http { base_url } = &config.identity {
        if Url::parse(base_url).is_err() {
            errors.push(ValidationError::IdentityUrl(base_url.clone()));
        }
    }

    for route in &config.routes {
        validate_route(route, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Downstream calls go through a plain HTTP connector.
fn check_service_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme `{}`", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("query and fragment are not allowed".to_string());
    }
    Ok(())
}

fn validate_route(route: &RouteConfig, errors: &mut Vec<ValidationError>) {
    let mut fail = |reason: String| {
        errors.push(ValidationError::Route {
            route: route.name.clone(),
            reason,
        })
    };

    if !route.pattern.starts_with('/') {
        fail(format!("pattern `{}` must start with `/`", route.pattern));
    }
    if let Some(method) = &route.method {
        if Method::from_bytes(method.as_bytes()).is_err() {
            fail(format!("invalid method `{}`", method));
        }
    }

    for rewrite in &route.rewrites {
        match rewrite {
            RewriteConfig::SelfPlaceholder { token } => {
                if token.is_empty() || token.contains('/') {
                    fail(format!("invalid placeholder token `{}`", token));
                }
                if route.guard != GuardKind::Principal {
                    fail("self placeholder requires the principal guard".to_string());
                }
            }
            RewriteConfig::StripPrefix { segment } => {
                if segment.is_empty() || segment.contains('/') {
                    fail(format!("invalid prefix segment `{}`", segment));
                }
            }
        }
    }

    match &route.pre_action {
        Some(PreActionConfig::SyncEmail) if route.guard != GuardKind::Principal => {
            fail("sync_email requires the principal guard".to_string());
        }
        Some(PreActionConfig::SetAccountLock { param }) => {
            let capture = format!(":{}", param);
            if !route.pattern.split('/').any(|segment| segment == capture) {
                fail(format!("pattern does not capture `{}`", param));
            }
            if route.guard == GuardKind::None {
                fail("set_account_lock requires a guard".to_string());
            }
        }
        _ => {}
    }

    if route.compensate && route.pre_action.is_none() {
        fail("compensate is set without a pre_action".to_string());
    }
}
