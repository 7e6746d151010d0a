//! Domain error to HTTP error translation.

use crate::aggregates::AttendanceError;
use crate::app::AccountError;
use axum::http::StatusCode;
use gatherly_web::AppError;

impl From<AttendanceError> for AppError {
    fn from(error: AttendanceError) -> Self {
        match error {
            AttendanceError::NotFound => {
                Self::new(StatusCode::NOT_FOUND, error.to_string(), "NOT_FOUND")
            },
            AttendanceError::Forbidden => Self::forbidden(error.to_string()),
            AttendanceError::Conflict => {
                Self::new(StatusCode::BAD_REQUEST, error.to_string(), "ALREADY_ATTENDING")
            },
            AttendanceError::CapacityExceeded => {
                Self::new(StatusCode::BAD_REQUEST, error.to_string(), "NO_SLOTS_AVAILABLE")
            },
            AttendanceError::InvalidInput(message) => Self::validation(message),
            AttendanceError::ConcurrentModification => Self::conflict(error.to_string()),
            AttendanceError::Internal(detail) => anyhow::anyhow!(detail).into(),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(error: AccountError) -> Self {
        match error {
            AccountError::EmailTaken => {
                Self::new(StatusCode::BAD_REQUEST, error.to_string(), "EMAIL_TAKEN")
            },
            AccountError::InvalidCredentials => Self::new(
                StatusCode::BAD_REQUEST,
                error.to_string(),
                "INVALID_CREDENTIALS",
            ),
            AccountError::UserNotFound => {
                Self::new(StatusCode::NOT_FOUND, error.to_string(), "NOT_FOUND")
            },
            AccountError::InvalidInput(message) => Self::validation(message),
            AccountError::Token(token_error) => Self::unauthorized(token_error.to_string()),
            AccountError::Internal(detail) => anyhow::anyhow!(detail).into(),
        }
    }
}
