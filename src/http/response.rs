//! Error responses

use crate::claim::FieldViolation;
use crate::error::{ErrorKind, ListError, ProfileError, SubmissionError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// A failed request: `{success: false, error, kind, violations?}`.
#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub violations: Vec<FieldViolation>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
    kind: ErrorKind,
    #[serde(skip_serializing_if = "<[FieldViolation]>::is_empty")]
    violations: &'a [FieldViolation],
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            violations: Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::BackendUnavailable | ErrorKind::IndexRequired => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ErrorKind::VerificationFailed => StatusCode::BAD_GATEWAY,
            ErrorKind::PersistenceFailed | ErrorKind::QueryFailed | ErrorKind::Cancelled => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        let mut api = ApiError::new(err.kind(), err.to_string());
        if let SubmissionError::InvalidInput(validation) = &err {
            api.violations = validation.violations().to_vec();
        }
        api
    }
}

impl From<ListError> for ApiError {
    fn from(err: ListError) -> Self {
        ApiError::new(err.kind(), err.to_string())
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        ApiError::new(err.kind(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: &self.message,
            kind: self.kind,
            violations: &self.violations,
        };
        (self.status(), Json(body)).into_response()
    }
}
