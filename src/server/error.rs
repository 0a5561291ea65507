//! API error responses

use crate::lens::whois::WhoisError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Invalid or missing parameters
    InvalidParams,
    /// The operation ran and failed
    OperationFailed,
    InternalError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidParams => StatusCode::BAD_REQUEST,
            ErrorCode::OperationFailed => StatusCode::BAD_GATEWAY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<WhoisError> for ApiError {
    fn from(err: WhoisError) -> Self {
        if err.is_transport() {
            Self::new(ErrorCode::OperationFailed, err.to_string())
        } else {
            Self::invalid_params(err.to_string())
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<WhoisError>() {
            Some(whois) => Self::from(whois.clone()),
            None => Self::internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        });
        (self.code.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whois_error_mapping() {
        let err = ApiError::from(WhoisError::invalid_address("nope"));
        assert_eq!(err.code, ErrorCode::InvalidParams);
        assert_eq!(err.code.status(), StatusCode::BAD_REQUEST);

        let err = ApiError::from(anyhow::Error::new(WhoisError::invalid_address("nope")));
        assert_eq!(err.code, ErrorCode::InvalidParams);

        let err = ApiError::from(WhoisError::connection("whois.radb.net:43", "reset"));
        assert_eq!(err.code, ErrorCode::OperationFailed);
        assert_eq!(err.code.status(), StatusCode::BAD_GATEWAY);

        let err = ApiError::from(anyhow::anyhow!("disk full"));
        assert_eq!(err.code, ErrorCode::InternalError);
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError::invalid_params("bad token").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
