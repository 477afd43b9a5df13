use axum::{response::IntoResponse, Json};

use crate::calls::TelephonyError;
use crate::llm::ClassifierError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not configured")]
    NotConfigured(&'static str),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        let (status, message) = match &self {
            Self::NotConfigured(service) => {
                (StatusCode::BAD_REQUEST, format!("{service} not configured"))
            }
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            // Upstream detail stays in the server log; callers get a generic
            // failure.
            Self::Upstream(detail) => {
                log::error!("upstream failure: {detail}");
                (StatusCode::BAD_GATEWAY, "Upstream request failed".to_string())
            }
            Self::Internal(detail) => {
                log::error!("internal error: {detail}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => Self::NotFound("Lead not found".into()),
            StoreError::Upstream(detail) => Self::Upstream(detail),
        }
    }
}

impl From<ClassifierError> for ApiError {
    fn from(e: ClassifierError) -> Self {
        Self::Upstream(e.to_string())
    }
}

impl From<TelephonyError> for ApiError {
    fn from(e: TelephonyError) -> Self {
        Self::Upstream(e.to_string())
    }
}
