use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

/// Failure taxonomy surfaced by the API. Temporal and lifecycle refusals get
/// their own variants so handlers stay explicit about which rule fired;
/// storage faults are logged and collapsed into `Internal`.
#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    /// The exam window has not opened yet or has already closed.
    NotActive(&'static str),
    /// The attempt's personal deadline has passed; saves are refused.
    TimeOver(&'static str),
    /// The operation does not apply to the attempt's current status.
    InvalidState(&'static str),
    /// A prior attempt ran out the clock and no retake grant is available.
    AlreadyEnded(&'static str),
    /// A prior attempt is terminal and no retake grant is available.
    AlreadySubmitted(&'static str),
    TooManyRequests(&'static str),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) | ApiError::NotActive(_) | ApiError::TimeOver(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_)
            | ApiError::InvalidState(_)
            | ApiError::AlreadyEnded(_)
            | ApiError::AlreadySubmitted(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(self) -> String {
        match self {
            ApiError::Unauthorized(message)
            | ApiError::Forbidden(message)
            | ApiError::NotActive(message)
            | ApiError::TimeOver(message)
            | ApiError::InvalidState(message)
            | ApiError::AlreadyEnded(message)
            | ApiError::AlreadySubmitted(message)
            | ApiError::TooManyRequests(message) => message.to_string(),
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message)
            | ApiError::Internal(message) => message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            if let ApiError::Internal(message) = &self {
                tracing::error!(error = %message, "Internal server error");
            }
        }

        let unauthorized = matches!(self, ApiError::Unauthorized(_));
        let mut response = (
            status,
            Json(ErrorResponse { status: status.as_u16(), detail: self.detail() }),
        )
            .into_response();

        if unauthorized {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}
