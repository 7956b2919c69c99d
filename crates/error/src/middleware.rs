//! # Error Responses
//!
//! Conversion of `AppError` into HTTP responses with the shared envelope.

use axum::{body::Body, http::StatusCode, response::Response};

use crate::{response::ApiResponse, AppError};

/// Error handler that converts errors to HTTP responses.
#[derive(Clone)]
pub struct ErrorHandler {
    /// Whether to include error details in 5xx responses.
    pub include_details: bool,
}

impl ErrorHandler {
    /// Create a new error handler.
    #[inline]
    pub fn new(include_details: bool) -> Self {
        Self {
            include_details,
        }
    }

    /// Convert an error to a response.
    ///
    /// Client errors (4xx) always expose their message — guard denials must
    /// carry their reason to the caller. Server errors hide internals unless
    /// `include_details` is set.
    pub fn to_response(&self, err: &AppError) -> Response {
        let status = err.status();
        let message = if status.is_server_error() && !self.include_details {
            "Internal server error".to_string()
        }
        else {
            err.message()
        };

        if status.is_server_error() {
            tracing::error!(code = err.code(), error = %err, "Request failed");
        }

        let envelope: ApiResponse<()> = ApiResponse::error(message);

        let mut builder = Response::builder()
            .status(status)
            .header("Content-Type", "application/json");

        if status == StatusCode::UNAUTHORIZED {
            builder = builder.header("WWW-Authenticate", "Bearer");
        }

        builder
            .body(Body::from(
                serde_json::to_string(&envelope).unwrap_or_else(|_| {
                    "{\"success\":false,\"message\":\"Internal server error\"}".to_string()
                }),
            ))
            .unwrap_or_else(|_| Response::new(Body::empty()))
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> Response {
        let handler = ErrorHandler::new(false);
        handler.to_response(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_handler_status() {
        let handler = ErrorHandler::new(false);
        let err = AppError::not_found("Team not found");
        let response = handler.to_response(&err);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unauthorized_sets_www_authenticate() {
        let handler = ErrorHandler::new(false);
        let err = AppError::unauthorized("Missing token");
        let response = handler.to_response(&err);

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("WWW-Authenticate").unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn test_payment_required_status() {
        let handler = ErrorHandler::new(false);
        let err = AppError::payment_required("Subscription is past due");
        let response = handler.to_response(&err);

        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn test_internal_details_hidden_by_default() {
        let handler = ErrorHandler::new(false);
        let err = AppError::internal("connection pool exhausted");
        let response = handler.to_response(&err);

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
