//! Response normalization.
//!
//! # Responsibilities
//! - Turn every `RerouteOutcome` into exactly one HTTP response
//! - Relay downstream status, headers and body verbatim
//! - Render gateway-local failures as `{"message": ...}` JSON
//!
//! # Design Decisions
//! - Transport-framing headers were already stripped by the forwarder;
//!   the server recomputes them for the relayed body

use axum::body::Body;
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};

use crate::proxy::outcome::RerouteOutcome;

impl IntoResponse for RerouteOutcome {
    fn into_response(self) -> Response {
        let (status, headers, body) = match self {
            RerouteOutcome::Success {
                status,
                headers,
                body,
            } => (status, Some(headers), body),
            RerouteOutcome::Failure {
                status,
                headers,
                body,
                ..
            } => (status, headers, body),
        };

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        match headers {
            Some(headers) => *response.headers_mut() = headers,
            None => {
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::outcome::FailureKind;
    use axum::http::{HeaderMap, StatusCode};
    use bytes::Bytes;

    async fn body_of(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_downstream_failure_relayed_verbatim() {
        let mut headers = HeaderMap::new();
        headers.insert("x-backend", HeaderValue::from_static("users"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let outcome = RerouteOutcome::Failure {
            kind: FailureKind::DownstreamError,
            status: StatusCode::CONFLICT,
            headers: Some(headers),
            body: Bytes::from_static(b"taken"),
        };

        let response = outcome.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(response.headers().get("x-backend").unwrap(), "users");
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(body_of(response).await, Bytes::from_static(b"taken"));
    }

    #[tokio::test]
    async fn test_local_failure_is_json() {
        let outcome = RerouteOutcome::local(
            FailureKind::NoRoute,
            StatusCode::NOT_FOUND,
            "No matching route found",
        );

        let response = outcome.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body: serde_json::Value = serde_json::from_slice(&body_of(response).await).unwrap();
        assert_eq!(body["message"], "No matching route found");
    }

    #[tokio::test]
    async fn test_success_keeps_status() {
        let outcome = RerouteOutcome::Success {
            status: StatusCode::CREATED,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"{}"),
        };
        assert_eq!(outcome.into_response().status(), StatusCode::CREATED);
    }
}
