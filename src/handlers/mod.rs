pub mod devices;
pub mod oauth;
pub mod payment_intent;
pub mod payment_status;

use axum::http::{header, HeaderMap, StatusCode};

use crate::app::error::ApiError;
use crate::services::ProviderError;

pub async fn health_handler() -> StatusCode {
    StatusCode::OK
}

/// Upstream status and message pass through; transport failures are ours.
pub(crate) fn upstream_error(err: ProviderError) -> ApiError {
    match err {
        ProviderError::Status { status, message } => ApiError::Upstream { status, message },
        ProviderError::Transport(e) => ApiError::Internal(format!("provider unreachable: {e}")),
        ProviderError::InvalidRequest(msg) => ApiError::InvalidInput(msg),
    }
}

/// Scheme and host the request arrived on. Proxy headers are only
/// honoured when `trust_forwarded` is set.
pub(crate) fn request_origin(headers: &HeaderMap, trust_forwarded: bool) -> String {
    let forwarded = |name: &str| {
        trust_forwarded
            .then(|| headers.get(name))
            .flatten()
            .and_then(|v| v.to_str().ok())
    };

    let host = forwarded("x-forwarded-host")
        .or_else(|| headers.get(header::HOST).and_then(|v| v.to_str().ok()))
        .unwrap_or("localhost");
    let scheme = forwarded("x-forwarded-proto").unwrap_or("http");
    format!("{scheme}://{host}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn proxied_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("pos.local:3000"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        headers.insert("x-forwarded-host", HeaderValue::from_static("evil.example.com"));
        headers
    }

    #[test]
    fn origin_ignores_forwarded_headers_by_default() {
        assert_eq!(request_origin(&proxied_headers(), false), "http://pos.local:3000");
        assert_eq!(request_origin(&HeaderMap::new(), false), "http://localhost");
    }

    #[test]
    fn origin_uses_forwarded_headers_when_trusted() {
        assert_eq!(request_origin(&proxied_headers(), true), "https://evil.example.com");

        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("pos.local:3000"));
        assert_eq!(request_origin(&headers, true), "http://pos.local:3000");
    }
}
