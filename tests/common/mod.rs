//! Shared utilities for integration tests.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use api_gateway::config::schema::ServicesConfig;
use api_gateway::config::GatewayConfig;
use api_gateway::identity::{AccountRecord, InMemoryIdentityStore};
use api_gateway::security::{Principal, Provider, StaticVerifier};
use api_gateway::{Gateway, HttpServer, Shutdown};
use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::net::TcpListener;

pub const USER_TOKEN: &str = "user-token";

/// Start a mock downstream service that echoes what it received.
///
/// `/users/ping` answers `{"message":"pong"}`; paths ending in `/conflict`
/// answer 409 with a fixed body.
pub async fn start_echo_backend(name: &'static str) -> SocketAddr {
    let app = axum::Router::new().fallback(move |request: Request| async move {
        echo(name, request)
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

fn echo(name: &'static str, request: Request) -> Response {
    let path = request.uri().path().to_string();
    let mut response = if path == "/users/ping" {
        Json(serde_json::json!({ "message": "pong" })).into_response()
    } else if path.ends_with("/conflict") {
        (StatusCode::CONFLICT, Json(serde_json::json!({ "error": "already exists" }))).into_response()
    } else {
        Json(serde_json::json!({
            "service": name,
            "method": request.method().as_str(),
            "path": path,
            "query": request.uri().query(),
            "authorization": request
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok()),
        }))
        .into_response()
    };
    response
        .headers_mut()
        .insert("x-backend", HeaderValue::from_static(name));
    response
}

/// Start a mock downstream that waits `delay` and then answers 500.
pub async fn start_slow_failing_backend(delay: Duration) -> SocketAddr {
    let app = axum::Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "gave up" })),
        )
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// An address nothing listens on.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Config routing every service id to the given addresses.
pub fn config_for(services: &[(&str, SocketAddr)]) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.observability.metrics_enabled = false;
    config.services = ServicesConfig(
        services
            .iter()
            .map(|(id, addr)| (id.to_string(), format!("http://{}", addr)))
            .collect::<BTreeMap<_, _>>(),
    );
    config
}

pub fn identity() -> Arc<InMemoryIdentityStore> {
    Arc::new(InMemoryIdentityStore::with_accounts([
        AccountRecord {
            id: "abc123".to_string(),
            email: Some("old@x".to_string()),
            disabled: false,
        },
        AccountRecord {
            id: "u9".to_string(),
            email: None,
            disabled: false,
        },
    ]))
}

/// Running gateway. Dropping it stops the server.
pub struct TestGateway {
    pub addr: SocketAddr,
    _shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Spawn the gateway on a loopback port with a static verifier.
pub async fn start_gateway(config: GatewayConfig, identity: Arc<InMemoryIdentityStore>) -> TestGateway {
    let principal = Principal {
        id: "abc123".to_string(),
        email: Some("old@x".to_string()),
        display_name: Some("Ada".to_string()),
        picture_url: None,
        provider: Provider::Firebase,
    };
    let verifier = Arc::new(StaticVerifier::new([(USER_TOKEN.to_string(), principal)]));
    let gateway = Gateway::new(&config, verifier, identity);
    let server = HttpServer::with_gateway(config, gateway);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });

    TestGateway {
        addr,
        _shutdown: shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
