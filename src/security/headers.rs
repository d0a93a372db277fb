//! Header sanitation.
//!
//! # Responsibilities
//! - Strip transport-framing headers before replaying a request to another host
//! - Strip framing headers from relayed downstream responses
//!
//! # Design Decisions
//! - Everything else passes through, `authorization` included, so downstream
//!   services can run their own checks
//! - `HeaderMap` names are lowercase, so matching is case-insensitive

use axum::http::header::{self, HeaderMap, HeaderName};

/// Request headers that describe the inbound connection, not the request.
const REQUEST_FRAMING: [HeaderName; 3] = [header::HOST, header::CONNECTION, header::CONTENT_LENGTH];

/// Response headers invalidated by re-framing a buffered body.
const RESPONSE_FRAMING: [&str; 4] = ["connection", "keep-alive", "transfer-encoding", "content-length"];

/// Copy of `headers` without `host`, `connection` and `content-length`.
pub fn sanitize_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut sanitized = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !REQUEST_FRAMING.contains(name) {
            sanitized.append(name.clone(), value.clone());
        }
    }
    sanitized
}

/// Copy of downstream response headers safe to relay with a re-framed body.
pub fn sanitize_response_headers(headers: &HeaderMap) -> HeaderMap {
    let mut sanitized = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !RESPONSE_FRAMING.contains(&name.as_str()) {
            sanitized.append(name.clone(), value.clone());
        }
    }
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use proptest::prelude::*;

    #[test]
    fn test_strips_framing_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("Host", HeaderValue::from_static("gateway.local"));
        headers.insert("Connection", HeaderValue::from_static("keep-alive"));
        headers.insert("Content-Length", HeaderValue::from_static("42"));
        headers.insert("Authorization", HeaderValue::from_static("Bearer t"));
        headers.append("x-tag", HeaderValue::from_static("a"));
        headers.append("x-tag", HeaderValue::from_static("b"));

        let sanitized = sanitize_request_headers(&headers);

        assert!(sanitized.get("host").is_none());
        assert!(sanitized.get("connection").is_none());
        assert!(sanitized.get("content-length").is_none());
        assert_eq!(sanitized.get("authorization").unwrap(), "Bearer t");
        let tags: Vec<_> = sanitized.get_all("x-tag").iter().collect();
        assert_eq!(tags, vec!["a", "b"]);
        // input untouched
        assert_eq!(headers.len(), 6);
    }

    #[test]
    fn test_response_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("set-cookie", HeaderValue::from_static("s=1"));

        let sanitized = sanitize_response_headers(&headers);
        assert!(sanitized.get("transfer-encoding").is_none());
        assert_eq!(sanitized.len(), 2);
    }

    fn arb_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("Host".to_string()),
            Just("CONNECTION".to_string()),
            Just("content-length".to_string()),
            Just("Content-Length".to_string()),
            "[a-zA-Z][a-zA-Z0-9-]{0,15}",
        ]
    }

    proptest! {
        #[test]
        fn prop_framing_never_survives(entries in prop::collection::vec((arb_name(), "[ -~]{0,20}"), 0..12)) {
            let mut headers = HeaderMap::new();
            for (name, value) in &entries {
                let name = HeaderName::from_bytes(name.as_bytes()).unwrap();
                headers.append(name, HeaderValue::from_str(value).unwrap());
            }

            let sanitized = sanitize_request_headers(&headers);

            for framing in ["host", "connection", "content-length"] {
                prop_assert!(sanitized.get(framing).is_none());
            }
            for name in headers.keys() {
                if !REQUEST_FRAMING.contains(name) {
                    let before: Vec<_> = headers.get_all(name).iter().collect();
                    let after: Vec<_> = sanitized.get_all(name).iter().collect();
                    prop_assert_eq!(before, after);
                }
            }
        }
    }
}
