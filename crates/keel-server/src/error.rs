use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use keel_core::RegistryError;
use serde::Serialize;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("No route matches {0}")]
    NoRoute(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::NoRoute(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::PayloadTooLarge(_) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                self.to_string(),
            ),
            AppError::Registry(e) => match e {
                RegistryError::ServiceNotFound(_)
                | RegistryError::InstanceNotFound
                | RegistryError::GatewayNotFound(_) => {
                    (StatusCode::NOT_FOUND, "not_found", e.to_string())
                }
                RegistryError::InvalidKey(_) | RegistryError::InvalidPattern(_) => {
                    (StatusCode::BAD_REQUEST, "bad_request", e.to_string())
                }
                RegistryError::AmbiguousRoute { .. } | RegistryError::Duplicate(_) => {
                    (StatusCode::CONFLICT, "conflict", e.to_string())
                }
                RegistryError::Unavailable(reason) => {
                    tracing::error!("registry store error: {}", reason);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal_error",
                        "An internal error occurred".to_string(),
                    )
                }
            },
        };

        (status, Json(ErrorResponse { error, message })).into_response()
    }
}
