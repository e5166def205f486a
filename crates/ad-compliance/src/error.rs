use crate::config::ConfigError;
use crate::submission::{
    AuthorizationError, DispatchError, FieldError, IdentityError, SubmissionError,
    TransportError, UnknownSelector,
};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Transport(TransportError),
    Identity(IdentityError),
    Submission(SubmissionError),
    Form(FieldError),
    Selector(UnknownSelector),
    BadRequest(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Submission(SubmissionError::Validation(_)) | AppError::Form(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Submission(SubmissionError::Unauthorized(
                AuthorizationError::NotSignedIn,
            )) => StatusCode::UNAUTHORIZED,
            AppError::Submission(SubmissionError::Unauthorized(AuthorizationError::Denied {
                ..
            })) => StatusCode::FORBIDDEN,
            AppError::Identity(_) => StatusCode::UNAUTHORIZED,
            AppError::Submission(SubmissionError::InFlight) => StatusCode::CONFLICT,
            AppError::Submission(SubmissionError::Dispatch(DispatchError::SelectorMismatch {
                ..
            }))
            | AppError::Selector(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Submission(SubmissionError::Dispatch(_)) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Transport(err) => write!(f, "transport error: {}", err),
            AppError::Identity(err) => write!(f, "identity error: {}", err),
            AppError::Submission(err) => write!(f, "submission error: {}", err),
            AppError::Form(err) => write!(f, "form error: {}", err),
            AppError::Selector(err) => write!(f, "{}", err),
            AppError::BadRequest(message) => write!(f, "bad request: {}", message),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Transport(err) => Some(err),
            AppError::Identity(err) => Some(err),
            AppError::Submission(err) => Some(err),
            AppError::Form(err) => Some(err),
            AppError::Selector(err) => Some(err),
            AppError::BadRequest(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<TransportError> for AppError {
    fn from(value: TransportError) -> Self {
        Self::Transport(value)
    }
}

impl From<IdentityError> for AppError {
    fn from(value: IdentityError) -> Self {
        Self::Identity(value)
    }
}

impl From<SubmissionError> for AppError {
    fn from(value: SubmissionError) -> Self {
        Self::Submission(value)
    }
}

impl From<FieldError> for AppError {
    fn from(value: FieldError) -> Self {
        Self::Form(value)
    }
}

impl From<UnknownSelector> for AppError {
    fn from(value: UnknownSelector) -> Self {
        Self::Selector(value)
    }
}
