use actix_web::error::{BlockingError, JsonPayloadError, PathError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use thiserror::Error;
use tracing::error;

use crate::models::{ErrorBody, FieldError};
use crate::repository::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("request failed validation")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    Server(String),
}

impl ApiError {
    pub fn body(&self) -> ErrorBody {
        let (code, details) = match self {
            ApiError::NotFound(_) => ("NOT_FOUND", None),
            ApiError::Validation(fields) => ("VALIDATION_ERROR", Some(fields.clone())),
            ApiError::Server(_) => ("SERVER_ERROR", None),
        };
        ErrorBody {
            code: code.to_string(),
            message: self.to_string(),
            details,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.body())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(format!("Todo {id} not found")),
            other => {
                error!(error = %other, "todo store failure");
                ApiError::Server(other.to_string())
            }
        }
    }
}

impl From<BlockingError> for ApiError {
    fn from(err: BlockingError) -> Self {
        error!(error = %err, "blocking pool unavailable");
        ApiError::Server("Request could not be processed".to_string())
    }
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(vec![FieldError::new("body", err.to_string())]).into()
}

pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(vec![FieldError::new("id", err.to_string())]).into()
}
