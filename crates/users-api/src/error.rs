//! API error types

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use users_auth::AuthError;
use users_core::{CoreError, ErrorKind};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),
}

impl ApiError {
    fn status_and_messages(self) -> (StatusCode, Vec<String>) {
        let core = match self {
            ApiError::InvalidBody(rejection) => {
                return (StatusCode::UNPROCESSABLE_ENTITY, vec![rejection.body_text()]);
            }
            ApiError::Auth(e) => CoreError::from(e),
            ApiError::Core(e) => e,
        };

        let status = match core.kind() {
            ErrorKind::InvalidArgument | ErrorKind::AlreadyExists => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::Internal => {
                error!("Internal error: {}", core);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, core.messages())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, messages) = self.status_and_messages();

        let body = axum::Json(json!({
            "errors": {
                "body": messages
            }
        }));

        (status, body).into_response()
    }
}
