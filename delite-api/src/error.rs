use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use delite_core::StoreError;
use delite_order::{BookingError, FieldError};

#[derive(Debug)]
pub enum AppError {
    ValidationError(Vec<FieldError>),
    NotFoundError(String),
    CapacityError(String),
    InternalServerError { message: &'static str, detail: String },
}

impl AppError {
    pub fn internal(message: &'static str, detail: impl std::fmt::Display) -> Self {
        AppError::InternalServerError {
            message,
            detail: detail.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::ValidationError(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Validation failed", "errors": errors })),
            )
                .into_response(),
            AppError::NotFoundError(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "message": msg }))).into_response()
            }
            AppError::CapacityError(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": msg }))).into_response()
            }
            AppError::InternalServerError { message, detail } => {
                tracing::error!("{}: {}", message, detail);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": message }))).into_response()
            }
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(errors) => AppError::ValidationError(errors),
            BookingError::ExperienceNotFound(_) => AppError::NotFoundError("Experience not found".to_string()),
            BookingError::SlotUnavailable => AppError::CapacityError(err.to_string()),
            BookingError::Payment(_) | BookingError::Persistence(_) | BookingError::ReferenceExhausted(_) => {
                AppError::internal("Error creating booking", err)
            }
        }
    }
}

/// Unparseable bodies are reported like any other invalid input.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(vec![FieldError {
            field: "body".to_string(),
            message: rejection.body_text(),
        }])
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::internal("Internal server error", err)
    }
}
