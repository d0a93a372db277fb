//! Admission guards.
//!
//! # Responsibilities
//! - Extract the Bearer token from `Authorization`
//! - Principal guard: verify the token, attach the caller's identity
//! - Gateway-token guard: compare against the shared secret, attach nothing
//!
//! # Design Decisions
//! - Runs before route resolution; a rejection short-circuits the request
//! - Verifier outages are reported to the caller as an invalid token

use std::sync::Arc;

use axum::http::{header, HeaderMap};

use crate::config::GuardKind;
use crate::security::principal::Principal;
use crate::security::verifier::{PrincipalVerifier, VerifyError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing or invalid token")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Unauthorized")]
    InvalidGatewayToken,
}

/// Token after `Bearer `, if the header has that shape.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Admission checks shared by every route.
#[derive(Clone)]
pub struct Admission {
    verifier: Arc<dyn PrincipalVerifier>,
    gateway_token: String,
}

impl Admission {
    pub fn new(verifier: Arc<dyn PrincipalVerifier>, gateway_token: impl Into<String>) -> Self {
        Self {
            verifier,
            gateway_token: gateway_token.into(),
        }
    }

    /// Run the guard a route requires.
    pub async fn admit(
        &self,
        guard: GuardKind,
        headers: &HeaderMap,
    ) -> Result<Option<Principal>, AuthError> {
        match guard {
            GuardKind::None => Ok(None),
            GuardKind::GatewayToken => match bearer_token(headers) {
                Some(token) if token == self.gateway_token => Ok(None),
                _ => {
                    tracing::warn!("Rejected gateway-token request");
                    Err(AuthError::InvalidGatewayToken)
                }
            },
            GuardKind::Principal => {
                let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
                match self.verifier.verify(token).await {
                    Ok(principal) => Ok(Some(principal)),
                    Err(VerifyError::Rejected) => Err(AuthError::InvalidToken),
                    Err(e) => {
                        tracing::warn!(error = %e, "Principal verification failed");
                        Err(AuthError::InvalidToken)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::principal::Provider;
    use crate::security::verifier::StaticVerifier;
    use axum::http::HeaderValue;

    fn admission() -> Admission {
        let principal = Principal {
            id: "abc123".to_string(),
            email: None,
            display_name: None,
            picture_url: None,
            provider: Provider::Firebase,
        };
        Admission::new(
            Arc::new(StaticVerifier::new([("user-token".to_string(), principal)])),
            "gateway-token",
        )
    }

    fn auth(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&auth("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&auth("Basic abc")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_open_route() {
        assert_eq!(admission().admit(GuardKind::None, &HeaderMap::new()).await, Ok(None));
    }

    #[tokio::test]
    async fn test_principal_guard() {
        let admission = admission();

        let principal = admission
            .admit(GuardKind::Principal, &auth("Bearer user-token"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(principal.id, "abc123");

        assert_eq!(
            admission.admit(GuardKind::Principal, &HeaderMap::new()).await,
            Err(AuthError::MissingToken)
        );
        assert_eq!(
            admission.admit(GuardKind::Principal, &auth("Bearer nope")).await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn test_gateway_guard() {
        let admission = admission();

        assert_eq!(
            admission.admit(GuardKind::GatewayToken, &auth("Bearer gateway-token")).await,
            Ok(None)
        );
        assert_eq!(
            admission.admit(GuardKind::GatewayToken, &auth("Bearer user-token")).await,
            Err(AuthError::InvalidGatewayToken)
        );
        assert_eq!(
            admission.admit(GuardKind::GatewayToken, &HeaderMap::new()).await,
            Err(AuthError::InvalidGatewayToken)
        );
    }
}
