use crate::store::StoreError;
use crate::submission::{SubmitError, SubmitReceipt};
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
}

pub fn create_api_response(status: &str, message: &str) -> ApiResponse {
    ApiResponse {
        status: status.to_string(),
        message: message.to_string(),
    }
}

pub fn success_response(message: &str) -> ApiResponse {
    create_api_response("success", message)
}

pub fn error_response(message: &str) -> ApiResponse {
    create_api_response("error", message)
}

/// Body of `POST /submit_result`
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitResponse {
    pub fn accepted(receipt: &SubmitReceipt) -> Self {
        Self {
            success: true,
            redirect: Some(receipt.redirect.to_string()),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            redirect: None,
            error: Some(message.into()),
        }
    }
}

/// `{"error": "..."}` as returned by `/get_user_info` and the JSON leaderboard
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

pub fn store_status(err: &StoreError) -> StatusCode {
    if err.is_transient() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl ResponseError for SubmitError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubmitError::Unauthenticated => StatusCode::UNAUTHORIZED,
            SubmitError::MissingData(_) | SubmitError::InvalidData(_) => StatusCode::BAD_REQUEST,
            SubmitError::Store(err) => store_status(err),
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(SubmitResponse::failure(self.to_string()))
    }
}

impl ResponseError for StoreError {
    fn status_code(&self) -> StatusCode {
        store_status(self)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody::new(self.to_string()))
    }
}
