//! Principal verifiers.
//!
//! The cryptographic checks live with the identity provider; a verifier only
//! turns a Bearer token into a [`Principal`] or a rejection.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::Deserialize;

use crate::security::principal::{Principal, Provider};

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("token rejected")]
    Rejected,
    #[error("verifier unavailable: {0}")]
    Unavailable(String),
}

/// Turns a Bearer token into the caller's identity.
pub trait PrincipalVerifier: Send + Sync {
    fn verify<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Principal, VerifyError>>;
}

/// Fixed token table, for development setups and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticVerifier {
    principals: HashMap<String, Principal>,
}

impl StaticVerifier {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Principal)>,
    {
        Self {
            principals: entries.into_iter().collect(),
        }
    }
}

impl PrincipalVerifier for StaticVerifier {
    fn verify<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Principal, VerifyError>> {
        let result = self
            .principals
            .get(token)
            .cloned()
            .ok_or(VerifyError::Rejected);
        Box::pin(async move { result })
    }
}

/// Claims returned by a token-info endpoint.
#[derive(Debug, Deserialize)]
struct TokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// Delegates verification to a remote token-info endpoint
/// (`GET {endpoint}?id_token=<token>`).
#[derive(Debug, Clone)]
pub struct TokenInfoVerifier {
    client: reqwest::Client,
    endpoint: String,
    provider: Provider,
}

impl TokenInfoVerifier {
    pub fn new(endpoint: impl Into<String>, provider: Provider) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self::with_client(client, endpoint, provider)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>, provider: Provider) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            provider,
        }
    }
}

impl PrincipalVerifier for TokenInfoVerifier {
    fn verify<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Principal, VerifyError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(&self.endpoint)
                .query(&[("id_token", token)])
                .send()
                .await
                .map_err(|e| VerifyError::Unavailable(e.to_string()))?;

            let status = response.status();
            if status.is_client_error() {
                return Err(VerifyError::Rejected);
            }
            if !status.is_success() {
                return Err(VerifyError::Unavailable(format!("status {}", status)));
            }

            let claims: TokenClaims = response
                .json()
                .await
                .map_err(|e| VerifyError::Unavailable(e.to_string()))?;

            Ok(Principal {
                id: claims.sub,
                email: claims.email,
                display_name: claims.name,
                picture_url: claims.picture,
                provider: self.provider,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::Json;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_static_verifier() {
        let principal = Principal {
            id: "abc123".to_string(),
            email: Some("a@x".to_string()),
            display_name: None,
            picture_url: None,
            provider: Provider::Google,
        };
        let verifier = StaticVerifier::new([("good".to_string(), principal.clone())]);

        assert_eq!(verifier.verify("good").await.unwrap(), principal);
        assert!(matches!(verifier.verify("bad").await, Err(VerifyError::Rejected)));
    }

    async fn start_token_info() -> String {
        let app = axum::Router::new().route(
            "/tokeninfo",
            axum::routing::get(|Query(params): Query<HashMap<String, String>>| async move {
                match params.get("id_token").map(String::as_str) {
                    Some("good") => Json(serde_json::json!({
                        "sub": "abc123",
                        "email": "a@x",
                        "name": "Ada",
                        "picture": "https://img/ada.png",
                        "aud": "ignored",
                    }))
                    .into_response(),
                    Some("bare") => Json(serde_json::json!({ "sub": "u9" })).into_response(),
                    Some("flaky") => StatusCode::SERVICE_UNAVAILABLE.into_response(),
                    Some("garbled") => "not json".into_response(),
                    _ => StatusCode::UNAUTHORIZED.into_response(),
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{}/tokeninfo", addr)
    }

    fn token_info(endpoint: String) -> TokenInfoVerifier {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        TokenInfoVerifier::with_client(client, endpoint, Provider::Google)
    }

    #[tokio::test]
    async fn test_token_info_maps_claims() {
        let verifier = token_info(start_token_info().await);

        let principal = verifier.verify("good").await.unwrap();

        assert_eq!(
            principal,
            Principal {
                id: "abc123".to_string(),
                email: Some("a@x".to_string()),
                display_name: Some("Ada".to_string()),
                picture_url: Some("https://img/ada.png".to_string()),
                provider: Provider::Google,
            }
        );
    }

    #[tokio::test]
    async fn test_token_info_optional_claims() {
        let verifier = token_info(start_token_info().await);

        let principal = verifier.verify("bare").await.unwrap();

        assert_eq!(principal.id, "u9");
        assert_eq!(principal.email, None);
        assert_eq!(principal.display_name, None);
    }

    #[tokio::test]
    async fn test_token_info_client_error_is_rejection() {
        let verifier = token_info(start_token_info().await);

        assert!(matches!(verifier.verify("expired").await, Err(VerifyError::Rejected)));
    }

    #[tokio::test]
    async fn test_token_info_outage_is_unavailable() {
        let endpoint = start_token_info().await;
        let verifier = token_info(endpoint);

        assert!(matches!(
            verifier.verify("flaky").await,
            Err(VerifyError::Unavailable(_))
        ));
        assert!(matches!(
            verifier.verify("garbled").await,
            Err(VerifyError::Unavailable(_))
        ));

        let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dead = token_info(format!("http://{}/tokeninfo", closed.local_addr().unwrap()));
        drop(closed);
        assert!(matches!(dead.verify("good").await, Err(VerifyError::Unavailable(_))));
    }
}
