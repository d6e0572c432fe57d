use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use snaplink_core::CoreError;
use snaplink_redirector::{RedirectorError, Resolution};
use snaplink_shortener::ShortenerError;
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("requester identity is missing")]
    Unauthenticated,
    /// The access gate refused a redirect.
    #[error("access denied: {}", .0.reason())]
    Denied(Resolution),
    #[error(transparent)]
    Shortener(#[from] ShortenerError),
    #[error(transparent)]
    Redirector(#[from] RedirectorError),
}

impl From<CoreError> for AppError {
    fn from(error: CoreError) -> Self {
        AppError::BadRequest(error.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempts: Option<u32>,
}

impl AppError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            AppError::Denied(resolution) => {
                let status = match resolution {
                    Resolution::NotFound => StatusCode::NOT_FOUND,
                    Resolution::Inactive => StatusCode::FORBIDDEN,
                    Resolution::Expired => StatusCode::GONE,
                    Resolution::PasswordRequired | Resolution::PasswordIncorrect { .. } => {
                        StatusCode::UNAUTHORIZED
                    }
                    // never constructed for an allowed resolution
                    Resolution::Allowed(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, resolution.reason())
            }
            AppError::Shortener(e) => match e {
                ShortenerError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "invalid_url"),
                ShortenerError::InvalidCodeFormat(_) => {
                    (StatusCode::BAD_REQUEST, "invalid_code_format")
                }
                ShortenerError::InvalidExpiration(_) => {
                    (StatusCode::BAD_REQUEST, "invalid_expiration")
                }
                ShortenerError::CodeAlreadyExists(_) => {
                    (StatusCode::CONFLICT, "code_already_exists")
                }
                ShortenerError::CodeSpaceExhausted { .. } => {
                    (StatusCode::SERVICE_UNAVAILABLE, "code_space_exhausted")
                }
                ShortenerError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                ShortenerError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
                ShortenerError::PasswordHash(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal")
                }
                ShortenerError::Persistence(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable")
                }
            },
            AppError::Redirector(RedirectorError::Verification(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
            AppError::Redirector(_) => (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();

        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "internal error, please try again later".to_string()
        } else {
            self.to_string()
        };

        let attempts = match &self {
            AppError::Denied(Resolution::PasswordIncorrect { attempts }) => Some(*attempts),
            _ => None,
        };

        let body = ErrorBody {
            error: kind,
            message,
            attempts,
        };
        (status, Json(body)).into_response()
    }
}
