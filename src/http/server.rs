//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all gateway handler
//! - Wire up middleware (tracing, request ID)
//! - Buffer the inbound request under the body limit and hand it to the gateway
//! - Bound each request by the configured timeout
//! - Normalize every outcome, local rejections included, and record metrics
//! - Serve until the shutdown coordinator fires

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::request::{request_id, InboundRequest, UuidRequestId, X_REQUEST_ID};
use crate::observability::metrics;
use crate::proxy::{FailureKind, Gateway, RerouteOutcome, Routed};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub max_body_size: usize,
    pub request_timeout: Duration,
}

/// HTTP front of the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a server whose collaborators come from `config`.
    pub fn new(config: GatewayConfig) -> Self {
        let gateway = Gateway::from_config(&config);
        Self::with_gateway(config, gateway)
    }

    /// Create a server around an already built gateway.
    pub fn with_gateway(config: GatewayConfig, gateway: Gateway) -> Self {
        let state = AppState {
            gateway: Arc::new(gateway),
            max_body_size: config.listener.max_body_size,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };
        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Body limit and timeout live in the handler so their rejections go
    /// through the same JSON normalization as every other outcome.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Catch-all handler: buffer, route, dispatch, normalize.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let (parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers).to_string();
    let method = parts.method.to_string();
    let path = parts.uri.path().to_string();

    tracing::debug!(request_id = %request_id, method = %method, path = %path, "Routing request");

    let routed = tokio::time::timeout(state.request_timeout, async {
        let body = match axum::body::to_bytes(body, state.max_body_size).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Rejected request body");
                return Routed {
                    outcome: RerouteOutcome::local(
                        FailureKind::InvalidRequest,
                        StatusCode::PAYLOAD_TOO_LARGE,
                        "Request body too large",
                    ),
                    route: None,
                    service: None,
                };
            }
        };
        state
            .gateway
            .handle(InboundRequest::from_parts(parts, body))
            .await
    })
    .await
    .unwrap_or_else(|_| Routed {
        outcome: RerouteOutcome::local(
            FailureKind::TransportError,
            StatusCode::GATEWAY_TIMEOUT,
            "Upstream request timed out",
        ),
        route: None,
        service: None,
    });

    let status = routed.outcome.status();
    let service = routed.service.as_deref().unwrap_or("none");
    metrics::record_request(&method, status.as_u16(), service, start_time);

    match routed.outcome.kind() {
        None => tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            service = %service,
            status = status.as_u16(),
            "Request forwarded"
        ),
        Some(kind) => tracing::warn!(
            request_id = %request_id,
            method = %method,
            path = %path,
            route = routed.route.as_deref().unwrap_or("none"),
            service = %service,
            status = status.as_u16(),
            kind = %kind,
            "Request failed"
        ),
    }

    routed.outcome.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::InMemoryIdentityStore;
    use crate::security::StaticVerifier;
    use crate::proxy::forwarder::{Forward, OutboundRequest};
    use futures_util::future::BoxFuture;
    use tower::ServiceExt;

    /// Never answers.
    struct StalledForwarder;

    impl Forward for StalledForwarder {
        fn forward(&self, _request: OutboundRequest) -> BoxFuture<'_, RerouteOutcome> {
            Box::pin(std::future::pending())
        }
    }

    fn server(max_body_size: usize) -> HttpServer {
        let mut config = GatewayConfig::default();
        config.listener.max_body_size = max_body_size;
        let gateway = Gateway::new(
            &config,
            Arc::new(StaticVerifier::default()),
            Arc::new(InMemoryIdentityStore::new()),
        );
        HttpServer::with_gateway(config, gateway)
    }

    #[tokio::test]
    async fn test_root_without_token_is_unauthorized() {
        let response = server(1024)
            .router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(&X_REQUEST_ID).is_some());
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let response = server(1024)
            .router()
            .oneshot(
                Request::builder()
                    .uri("/billing")
                    .header("x-request-id", "req-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers().get(&X_REQUEST_ID).unwrap(), "req-1");
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let response = server(8)
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/users")
                    .body(Body::from("a body longer than eight bytes"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_oversized_body_with_content_length_is_json() {
        let payload = "a body longer than eight bytes";
        let response = server(8)
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/users")
                    .header("content-length", payload.len())
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        assert!(response.headers().get(&X_REQUEST_ID).is_some());
        assert_eq!(
            json_body(response).await,
            serde_json::json!({ "message": "Request body too large" })
        );
    }

    #[tokio::test]
    async fn test_request_timeout_is_json() {
        let mut config = GatewayConfig::default();
        config.timeouts.request_secs = 1;
        let gateway = Gateway::new(
            &config,
            Arc::new(StaticVerifier::default()),
            Arc::new(InMemoryIdentityStore::new()),
        )
        .with_forwarder(Arc::new(StalledForwarder));
        let router = HttpServer::with_gateway(config, gateway).router();

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/users")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({ "message": "Upstream request timed out" })
        );
    }
}
