//! Outbound forwarding.
//!
//! # Responsibilities
//! - Build the outbound request (target URL, sanitized headers, same method/body)
//! - Issue exactly one call to the downstream service
//! - Classify the exchange into a `RerouteOutcome`
//!
//! # Design Decisions
//! - Bodies are fully buffered in both directions; downstream bodies are
//!   capped, and an oversized one is a transport failure
//! - Downstream status, headers and body are relayed verbatim; 4xx/5xx are
//!   tagged `DownstreamError` so a pre-action can be compensated
//! - No retries and no timeout beyond the client's defaults

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use bytes::Bytes;
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::http::request::InboundRequest;
use crate::proxy::outcome::{FailureKind, RerouteOutcome};
use crate::routing::ResolvedTarget;
use crate::security::headers::{sanitize_request_headers, sanitize_response_headers};

/// A request ready to send downstream. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl OutboundRequest {
    pub fn new(inbound: &InboundRequest, target: &ResolvedTarget) -> Self {
        Self {
            method: inbound.method.clone(),
            url: target.url(inbound.query.as_deref()),
            headers: sanitize_request_headers(&inbound.headers),
            body: inbound.body.clone(),
        }
    }
}

/// Executes one outbound call.
pub trait Forward: Send + Sync {
    fn forward(&self, request: OutboundRequest) -> BoxFuture<'_, RerouteOutcome>;
}

/// Error type for forwarding.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("invalid upstream request: {0}")]
    InvalidRequest(#[from] axum::http::Error),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
    #[error("failed to read upstream body: {0}")]
    Body(#[from] axum::Error),
}

impl ForwardError {
    /// Short caller-facing outcome; internals stay in the logs.
    fn into_outcome(self) -> RerouteOutcome {
        match self {
            ForwardError::InvalidRequest(_) => RerouteOutcome::local(
                FailureKind::TransportError,
                StatusCode::BAD_REQUEST,
                "Invalid upstream request",
            ),
            ForwardError::Upstream(_) | ForwardError::Body(_) => RerouteOutcome::local(
                FailureKind::TransportError,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Upstream request failed",
            ),
        }
    }
}

/// Default cap on a buffered downstream body.
pub const DEFAULT_RESPONSE_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Forwarder over a pooled HTTP/1.1 client.
#[derive(Clone)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
    body_limit: usize,
}

impl HttpForwarder {
    pub fn new() -> Self {
        Self::with_body_limit(DEFAULT_RESPONSE_BODY_LIMIT)
    }

    /// Forwarder that refuses downstream bodies over `body_limit` bytes.
    pub fn with_body_limit(body_limit: usize) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client, body_limit }
    }

    async fn send(&self, outbound: OutboundRequest) -> Result<RerouteOutcome, ForwardError> {
        let mut request = Request::builder()
            .method(outbound.method)
            .uri(outbound.url.as_str())
            .body(Body::from(outbound.body))?;
        *request.headers_mut() = outbound.headers;

        let response = self.client.request(request).await?;
        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), self.body_limit).await?;
        let headers = sanitize_response_headers(&parts.headers);

        if parts.status.is_client_error() || parts.status.is_server_error() {
            Ok(RerouteOutcome::Failure {
                kind: FailureKind::DownstreamError,
                status: parts.status,
                headers: Some(headers),
                body,
            })
        } else {
            Ok(RerouteOutcome::Success {
                status: parts.status,
                headers,
                body,
            })
        }
    }
}

impl Default for HttpForwarder {
    fn default() -> Self {
        Self::new()
    }
}

impl Forward for HttpForwarder {
    fn forward(&self, request: OutboundRequest) -> BoxFuture<'_, RerouteOutcome> {
        Box::pin(async move {
            let method = request.method.clone();
            let url = request.url.clone();
            match self.send(request).await {
                Ok(outcome) => {
                    tracing::debug!(method = %method, url = %url, status = %outcome.status(), "Upstream responded");
                    outcome
                }
                Err(e) => {
                    tracing::error!(method = %method, url = %url, error = %e, "Upstream error");
                    e.into_outcome()
                }
            }
        })
    }
}
