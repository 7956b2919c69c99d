//! # Request ID Middleware
//!
//! Attaches a request id to every request, honoring an incoming
//! `x-request-id` header when it looks sane, and echoes it on the
//! response.

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use logging::RequestId;

/// Header used for request correlation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request-id middleware.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(RequestId::from_header)
        .unwrap_or_default();

    request.extensions_mut().insert(request_id.clone());

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
