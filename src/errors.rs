use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// The service is missing required configuration (e.g. the API key).
    Configuration(String),
    /// The upstream did not answer within the request timeout.
    UpstreamTimeout { url: String },
    /// The upstream could not be reached (connect, DNS, TLS, ...).
    UpstreamUnavailable(String),
    /// The upstream answered with a status >= 400.
    Upstream {
        status: u16,
        url: String,
        body: Value,
    },
    /// Domain-level not found.
    NotFound(String),
    /// The upstream payload lacks a field we rely on.
    ContractViolation { message: String, result: Value },
    /// Bad request error (invalid input).
    BadRequest(String),
    /// Internal server error.
    Internal(String),
}

impl AppError {
    /// Status code this error is rendered with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::UpstreamUnavailable(_) | AppError::ContractViolation { .. } => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> Value {
        match self {
            AppError::Configuration(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Internal(msg) => json!({ "error": msg }),
            AppError::UpstreamTimeout { url } => json!({
                "error": "KVK upstream timeout",
                "kvk_url": url,
            }),
            AppError::UpstreamUnavailable(msg) => json!({
                "error": format!("KVK upstream error: {}", msg),
            }),
            AppError::Upstream { status, url, body } => json!({
                "error": "KVK upstream returned an error",
                "kvk_status": status,
                "kvk_url": url,
                "kvk_error": body,
            }),
            AppError::ContractViolation { message, result } => json!({
                "error": message,
                "best": result,
            }),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            AppError::UpstreamTimeout { url } => write!(f, "KVK upstream timeout: {}", url),
            AppError::UpstreamUnavailable(msg) => write!(f, "KVK upstream unavailable: {}", msg),
            AppError::Upstream { status, url, .. } => {
                write!(f, "KVK upstream returned {} for {}", status, url)
            }
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ContractViolation { message, .. } => {
                write!(f, "Upstream contract violation: {}", message)
            }
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Maps each variant to its status code and JSON body, logging server-side failures.
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        (status, Json(self.body())).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::UpstreamTimeout {
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            AppError::UpstreamUnavailable(err.to_string())
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
