use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;

/// Failures produced by the billing engine and its collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BillingError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid stay range: check-out {end} must be after check-in {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    Decode(String),

    #[error("{0}")]
    Gateway(String),

    #[error("{0}")]
    InvoiceCreation(String),

    #[error("{0}")]
    Storage(String),
}

impl BillingError {
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

pub type BillingResult<T> = Result<T, BillingError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    UnprocessableEntity(String),
    #[error("{0}")]
    BadGateway(String),
    #[error("{0}")]
    Dependency(String),
    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Dependency(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BillingError> for AppError {
    fn from(error: BillingError) -> Self {
        let message = error.to_string();
        match error {
            BillingError::Validation(_) => Self::UnprocessableEntity(message),
            BillingError::InvalidRange { .. } => Self::BadRequest(message),
            BillingError::Auth(_) => Self::Unauthorized(message),
            BillingError::Network(_) | BillingError::Decode(_) => Self::Dependency(message),
            BillingError::Gateway(_) => Self::BadGateway(message),
            BillingError::InvoiceCreation(_) => Self::Conflict(message),
            BillingError::Storage(_) => Self::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
