use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Deadline,
    Shutdown,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Deadline => write!(f, "deadline exceeded"),
            CancelReason::Shutdown => write!(f, "server shutting down"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("bad request: file is empty")]
    EmptyFile,
    #[error("bad request: no file part in upload")]
    NoFilePart,
    #[error("bad request: invalid url: {0}")]
    InvalidUrl(anyhow::Error),
    #[error("bad request: {0}")]
    Multipart(#[from] MultipartError),
    #[error("payload too large")]
    TooLarge,
    #[error("no pins available from any cluster")]
    NoPinsAvailable,
    #[error("content unavailable from any node")]
    ContentUnavailable,
    #[error("unable to add file to any cluster")]
    UploadFailed,
    #[error("cancelled: {0}")]
    Cancelled(CancelReason),
    #[error("upstream request failed: {0}")]
    UpstreamReq(reqwest::Error),
    #[error("upstream status {0}")]
    UpstreamStatus(reqwest::StatusCode),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::EmptyFile => StatusCode::BAD_REQUEST,
            ApiError::NoFilePart => StatusCode::BAD_REQUEST,
            ApiError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ApiError::Multipart(e) => e.status(),
            ApiError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NoPinsAvailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::ContentUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::UploadFailed => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Cancelled(CancelReason::Deadline) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Cancelled(CancelReason::Shutdown) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::UpstreamReq(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::UpstreamStatus(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Any(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
