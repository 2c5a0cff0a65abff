// Mapping from domain errors to HTTP responses

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use codebank_common::error::BankError;
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub struct ApiError(pub BankError);

impl From<BankError> for ApiError {
    fn from(err: BankError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(BankError::InvalidInput(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(BankError::InvalidInput(rejection.body_text()))
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            BankError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON body extractor whose rejections use the error envelope
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejections use the error envelope
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.0.error_code();

        let body = match self.0 {
            // The grade is still returned so the caller can show it
            BankError::Persistence { result, source } => {
                error!(error = %source, "Submission graded but not recorded");
                json!({
                    "success": false,
                    "error": "Submission was graded but could not be recorded",
                    "code": code,
                    "recorded": false,
                    "result": result,
                })
            }
            BankError::Store(e) => {
                error!(error = %e, "Store error");
                json!({
                    "success": false,
                    "error": "A storage error occurred",
                    "code": code,
                })
            }
            // Interpreter text is passed through unchanged
            BankError::Execution(message) => json!({
                "success": false,
                "error": message,
                "code": code,
            }),
            other => json!({
                "success": false,
                "error": other.to_string(),
                "code": code,
            }),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
