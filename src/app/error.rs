use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::services::connection_store::StoreError;
use crate::services::oauth_state::StateError;

/// Every handler failure ends up here and leaves as a JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthenticated,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Provider integration not configured")]
    NotConfigured { message: String },

    #[error("No active terminal connection")]
    NoActiveConnection,

    #[error("Provider token expired")]
    TokenExpired,

    #[error("Provider request failed")]
    Upstream { status: u16, message: Option<String> },

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Invalid OAuth state: {0}")]
    InvalidState(String),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn missing_fields(fields: &[&str]) -> Self {
        ApiError::InvalidInput(format!("Missing required fields: {}", fields.join(", ")))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated | ApiError::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiError::InvalidInput(_)
            | ApiError::NoActiveConnection
            | ApiError::UnsupportedProvider(_)
            | ApiError::InvalidState(_) => StatusCode::BAD_REQUEST,
            ApiError::NotConfigured { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("error".into(), json!(self.to_string()));
        match self {
            ApiError::NotConfigured { message } => {
                body.insert("message".into(), json!(message));
                body.insert("demo_mode".into(), json!(true));
            }
            ApiError::NoActiveConnection => {
                body.insert("needsConnection".into(), json!(true));
            }
            ApiError::TokenExpired => {
                body.insert("needsReconnection".into(), json!(true));
            }
            ApiError::Upstream {
                message: Some(message),
                ..
            } => {
                body.insert("message".into(), json!(message));
            }
            _ => {}
        }
        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!("Internal error: {}", detail);
        }
        (self.status_code(), Json(Value::Object(self.body()))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(format!("credential store: {err}"))
    }
}

impl From<StateError> for ApiError {
    fn from(err: StateError) -> Self {
        ApiError::InvalidState(err.to_string())
    }
}

/// Payment endpoint errors carry `status: "error"` so pollers can branch on
/// a single field.
#[derive(Debug)]
pub struct PaymentApiError(pub ApiError);

impl From<ApiError> for PaymentApiError {
    fn from(err: ApiError) -> Self {
        PaymentApiError(err)
    }
}

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> Response {
        let PaymentApiError(err) = self;
        if let ApiError::Internal(detail) = &err {
            tracing::error!("Internal error: {}", detail);
        }
        let mut body = err.body();
        body.insert("status".into(), json!("error"));
        (err.status_code(), Json(Value::Object(body))).into_response()
    }
}
