use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("pending check-in {0} is already settled")]
    AlreadySettled(String),

    #[error("no check-in ids left to assign")]
    IdsExhausted,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Validation(message) => Self::bad_request(message),
            other => {
                error!("backend failure: {other}");
                Self::internal(other)
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
