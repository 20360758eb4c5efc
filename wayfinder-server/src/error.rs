use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use wayfinder_core::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Failure of a request handler
#[derive(Debug)]
pub enum ApiError {
    Core(Error),
    SessionNotFound(u64),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError::Core(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(error) => match error {
                Error::UnknownNode(_) => StatusCode::NOT_FOUND,
                Error::Unreachable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                Error::InvalidPosition(_) => StatusCode::BAD_REQUEST,
                Error::InvalidTransition { .. } => StatusCode::CONFLICT,
                Error::SessionClosed => StatusCode::GONE,
                Error::MalformedGraph(_) | Error::GeoJsonError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Core(error) => error.to_string(),
            ApiError::SessionNotFound(id) => format!("Session {id} not found"),
            ApiError::Internal(context) => format!("{context}: internal error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::debug!(error = ?self, "Request rejected");
        }
        (status, Json(ErrorResponse { error: self.message() })).into_response()
    }
}
