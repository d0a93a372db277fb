//! The single result type of a gateway request.

use std::fmt;

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;

use crate::routing::RouteError;
use crate::security::AuthError;

/// Why a request did not produce a downstream success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NoRoute,
    Unauthorized,
    InvalidRequest,
    NoServiceProvided,
    UnknownService,
    PreActionFailed,
    TransportError,
    DownstreamError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::NoRoute => "no_route",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::InvalidRequest => "invalid_request",
            FailureKind::NoServiceProvided => "no_service_provided",
            FailureKind::UnknownService => "unknown_service",
            FailureKind::PreActionFailed => "pre_action_failed",
            FailureKind::TransportError => "transport_error",
            FailureKind::DownstreamError => "downstream_error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produced once per request, consumed once by the response normalizer.
#[derive(Debug, Clone)]
pub enum RerouteOutcome {
    Success {
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    },
    Failure {
        kind: FailureKind,
        status: StatusCode,
        /// Present only when captured from a downstream response.
        headers: Option<HeaderMap>,
        body: Bytes,
    },
}

impl RerouteOutcome {
    /// Failure raised by the gateway itself, with a `{"message": ...}` body.
    pub fn local(kind: FailureKind, status: StatusCode, message: impl fmt::Display) -> Self {
        let body = serde_json::json!({ "message": message.to_string() }).to_string();
        RerouteOutcome::Failure {
            kind,
            status,
            headers: None,
            body: Bytes::from(body),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RerouteOutcome::Success { .. })
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RerouteOutcome::Success { status, .. } | RerouteOutcome::Failure { status, .. } => *status,
        }
    }

    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            RerouteOutcome::Success { .. } => None,
            RerouteOutcome::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn body(&self) -> &Bytes {
        match self {
            RerouteOutcome::Success { body, .. } | RerouteOutcome::Failure { body, .. } => body,
        }
    }
}

impl From<RouteError> for RerouteOutcome {
    fn from(err: RouteError) -> Self {
        let kind = match err {
            RouteError::NoServiceProvided => FailureKind::NoServiceProvided,
            RouteError::UnknownService(_) => FailureKind::UnknownService,
            RouteError::MissingPrincipal => FailureKind::InvalidRequest,
        };
        RerouteOutcome::local(kind, StatusCode::BAD_REQUEST, err)
    }
}

impl From<AuthError> for RerouteOutcome {
    fn from(err: AuthError) -> Self {
        RerouteOutcome::local(FailureKind::Unauthorized, StatusCode::UNAUTHORIZED, err)
    }
}
