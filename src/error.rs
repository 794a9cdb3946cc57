// src/error.rs
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

use crate::store::StoreError;
use crate::validator::ValidationResult;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Conflict(String),
    ValidationFailed(Vec<String>),
    ServiceUnavailable(String),
    InternalServerError(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationFailed(errors) => write!(
                f,
                "Validation Error: {}",
                errors.first().map(String::as_str).unwrap_or("invalid input")
            ),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
            ApiError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        let errors = match self {
            ApiError::ValidationFailed(errors) => Some(errors.clone()),
            _ => None,
        };
        let error_response = ErrorResponse {
            success: false,
            message: self.to_string(),
            errors,
        };

        match self {
            ApiError::BadRequest(_) => HttpResponse::BadRequest().json(error_response),
            ApiError::NotFound(_) => HttpResponse::NotFound().json(error_response),
            ApiError::Unauthorized(_) => HttpResponse::Unauthorized().json(error_response),
            ApiError::Conflict(_) => HttpResponse::Conflict().json(error_response),
            ApiError::ValidationFailed(_) => HttpResponse::UnprocessableEntity().json(error_response),
            ApiError::ServiceUnavailable(_) => HttpResponse::ServiceUnavailable().json(error_response),
            ApiError::InternalServerError(_) => HttpResponse::InternalServerError().json(error_response),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} with ID '{}' not found", entity, id))
            }
            StoreError::InsufficientStock { available, requested } => ApiError::insufficient_stock(available, requested),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Invalid(msg) => ApiError::ValidationFailed(vec![msg]),
            StoreError::Unavailable(msg) | StoreError::TableMissing(msg) => {
                log::error!("Storage unavailable and no fallback configured: {}", msg);
                ApiError::ServiceUnavailable(msg)
            }
            other => {
                log::error!("Storage failure: {}", other);
                ApiError::InternalServerError(other.to_string())
            }
        }
    }
}

impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        ApiError::ValidationFailed(result.errors)
    }
}

impl From<csv::Error> for ApiError {
    fn from(err: csv::Error) -> Self {
        ApiError::InternalServerError(format!("CSV export failed: {}", err))
    }
}

// Pharmacy-specific shorthands
impl ApiError {
    pub fn insufficient_stock(available: i64, requested: i64) -> Self {
        ApiError::BadRequest(format!(
            "Insufficient stock. Available: {}, Requested: {}",
            available, requested
        ))
    }

    pub fn invalid_query(field: &str, value: &str) -> Self {
        ApiError::BadRequest(format!("Invalid value '{}' for '{}'", value, field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_store_errors_map_to_status_codes() {
        let cases = vec![
            (StoreError::NotFound { entity: "Medicine", id: "m1".into() }, StatusCode::NOT_FOUND),
            (StoreError::InsufficientStock { available: 1, requested: 5 }, StatusCode::BAD_REQUEST),
            (StoreError::Conflict("open entry".into()), StatusCode::CONFLICT),
            (StoreError::Invalid("bounds".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (StoreError::Unavailable("refused".into()), StatusCode::SERVICE_UNAVAILABLE),
            (StoreError::TableMissing("medicines".into()), StatusCode::SERVICE_UNAVAILABLE),
            (StoreError::Backend("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (store_error, expected) in cases {
            let api_error: ApiError = store_error.into();
            assert_eq!(api_error.error_response().status(), expected);
        }
    }

    #[test]
    fn test_validation_message_uses_first_error() {
        let err = ApiError::ValidationFailed(vec![
            "Name must be at least 2 characters".to_string(),
            "Price must be greater than 0".to_string(),
        ]);
        assert_eq!(err.to_string(), "Validation Error: Name must be at least 2 characters");
        assert_eq!(err.error_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
