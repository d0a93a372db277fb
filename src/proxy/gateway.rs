//! The request pipeline.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → Router (first matching rule)
//!     → Admission (rule guard → optional Principal)
//!     → RouteResolver (rewrites, service lookup)
//!     → PreActionPlan (from rule, principal, params, body)
//!     → CompensableDispatcher (pre-action, forward, compensate)
//!     → RerouteOutcome
//! ```

use std::sync::Arc;

use axum::http::StatusCode;

use crate::config::schema::{IdentityConfig, VerifierConfig};
use crate::config::GatewayConfig;
use crate::identity::{HttpIdentityStore, IdentityStore, InMemoryIdentityStore};
use crate::proxy::dispatcher::{CompensableDispatcher, PreActionPlan};
use crate::proxy::forwarder::{Forward, HttpForwarder, OutboundRequest};
use crate::proxy::outcome::{FailureKind, RerouteOutcome};
use crate::routing::{RouteResolver, Router, ServiceDirectory};
use crate::http::request::InboundRequest;
use crate::security::{Admission, PrincipalVerifier, StaticVerifier, TokenInfoVerifier};

/// Outcome plus what the request was resolved to, for logs and metrics.
#[derive(Debug)]
pub struct Routed {
    pub outcome: RerouteOutcome,
    pub route: Option<String>,
    pub service: Option<String>,
}

impl Routed {
    fn unresolved(outcome: impl Into<RerouteOutcome>, route: Option<String>) -> Self {
        Self {
            outcome: outcome.into(),
            route,
            service: None,
        }
    }
}

/// Everything needed to turn an inbound request into an outcome.
pub struct Gateway {
    router: Router,
    resolver: RouteResolver,
    admission: Admission,
    forwarder: Arc<dyn Forward>,
    identity: Arc<dyn IdentityStore>,
}

impl Gateway {
    /// Build from config with the collaborators it names.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let verifier: Arc<dyn PrincipalVerifier> = match &config.auth.verifier {
            VerifierConfig::Static { principals } => Arc::new(StaticVerifier::new(
                principals
                    .iter()
                    .map(|p| (p.token.clone(), p.principal.clone())),
            )),
            VerifierConfig::TokenInfo { endpoint, provider } => {
                Arc::new(TokenInfoVerifier::new(endpoint.clone(), *provider))
            }
        };

        let identity: Arc<dyn IdentityStore> = match &config.identity {
            IdentityConfig::Memory { accounts } => {
                Arc::new(InMemoryIdentityStore::with_accounts(accounts.iter().cloned()))
            }
            IdentityConfig::Http { base_url } => Arc::new(HttpIdentityStore::new(base_url.clone())),
        };

        Self::new(config, verifier, identity)
    }

    /// Build with explicit verifier and identity store.
    pub fn new(
        config: &GatewayConfig,
        verifier: Arc<dyn PrincipalVerifier>,
        identity: Arc<dyn IdentityStore>,
    ) -> Self {
        let directory = ServiceDirectory::new(config.services.0.clone());
        let router = Router::from_config(config.effective_routes());

        tracing::info!(
            services = directory.len(),
            routes = router.len(),
            "Gateway initialized"
        );

        Self {
            router,
            resolver: RouteResolver::new(directory),
            admission: Admission::new(verifier, config.auth.gateway_token.clone()),
            forwarder: Arc::new(HttpForwarder::with_body_limit(config.upstream.max_body_size)),
            identity,
        }
    }

    /// Replace the outbound forwarder.
    pub fn with_forwarder(mut self, forwarder: Arc<dyn Forward>) -> Self {
        self.forwarder = forwarder;
        self
    }

    pub fn directory(&self) -> &ServiceDirectory {
        self.resolver.directory()
    }

    /// Run one request through the pipeline. Exactly one outcome per call.
    pub async fn handle(&self, mut request: InboundRequest) -> Routed {
        let Some(matched) = self.router.match_request(&request.method, &request.path) else {
            tracing::warn!(method = %request.method, path = %request.path, "No route matched");
            return Routed::unresolved(
                RerouteOutcome::local(
                    FailureKind::NoRoute,
                    StatusCode::NOT_FOUND,
                    "No matching route found",
                ),
                None,
            );
        };
        let rule = matched.rule;
        let route = Some(rule.name.clone());

        let principal = match self.admission.admit(rule.guard, &request.headers).await {
            Ok(principal) => principal,
            Err(e) => return Routed::unresolved(e, route),
        };

        if let Err(e) = self
            .resolver
            .rewrite(&mut request, &rule.rewrites, principal.as_ref())
        {
            return Routed::unresolved(e, route);
        }

        let target = match self.resolver.resolve(&request.path) {
            Ok(target) => target,
            Err(e) => {
                tracing::debug!(path = %request.path, error = %e, "Resolution failed");
                return Routed::unresolved(e, route);
            }
        };

        let plan = match &rule.pre_action {
            Some(action) => {
                match PreActionPlan::from_route(action, principal.as_ref(), &matched.params, &request.body) {
                    Ok(plan) => plan,
                    Err(e) => return Routed::unresolved(e, route),
                }
            }
            None => None,
        };

        tracing::debug!(
            route = %rule.name,
            service = %target.service,
            path = %target.path,
            pre_action = plan.is_some(),
            "Dispatching"
        );

        let outbound = OutboundRequest::new(&request, &target);
        let outcome = self.spawn_dispatch(plan, rule.compensate, outbound).await;

        Routed {
            outcome,
            route,
            service: Some(target.service),
        }
    }

    /// Run the dispatch on its own task. Dropping the request future (timeout,
    /// client disconnect) must not cut a pre-action off from its compensation.
    async fn spawn_dispatch(
        &self,
        plan: Option<PreActionPlan>,
        compensate: bool,
        outbound: OutboundRequest,
    ) -> RerouteOutcome {
        let identity = Arc::clone(&self.identity);
        let forwarder = Arc::clone(&self.forwarder);

        let saga = tokio::spawn(async move {
            CompensableDispatcher::new(identity.as_ref(), forwarder.as_ref())
                .dispatch(plan, compensate, outbound)
                .await
        });

        match saga.await {
            Ok(dispatched) => dispatched.outcome,
            Err(e) => {
                tracing::error!(error = %e, "Dispatch task failed");
                RerouteOutcome::local(
                    FailureKind::TransportError,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Upstream request failed",
                )
            }
        }
    }
}
