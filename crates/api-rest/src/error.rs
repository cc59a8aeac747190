//! Mapping from domain errors to HTTP responses.

use api_shared::{AuthError, ErrorRes};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use icr_core::RecordError;

/// A failed request: status plus the message sent as `{ "error": ... }`.
#[derive(Debug)]
pub struct ApiError(pub StatusCode, pub String);

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(StatusCode::BAD_REQUEST, message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let Self(status, error) = self;
        (status, Json(ErrorRes { error })).into_response()
    }
}

impl From<RecordError> for ApiError {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::NotFound(what) => Self(StatusCode::NOT_FOUND, format!("{what} not found")),
            e if e.is_client_error() => Self::bad_request(e.to_string()),
            e => {
                tracing::error!("Record store error: {:?}", e);
                Self(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingCredentials => Self::bad_request(e.to_string()),
            AuthError::InvalidPassword => Self(StatusCode::UNAUTHORIZED, e.to_string()),
            e => {
                tracing::error!("Auth error: {:?}", e);
                Self(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_errors_map_to_statuses() {
        let e: ApiError = RecordError::NotFound("assessment").into();
        assert_eq!(e.0, StatusCode::NOT_FOUND);
        assert_eq!(e.1, "assessment not found");

        let e: ApiError = RecordError::InvalidInput("hospitalNumber is required".into()).into();
        assert_eq!(e.0, StatusCode::BAD_REQUEST);

        let e: ApiError = RecordError::LockPoisoned.into();
        assert_eq!(e.0, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.1, "Internal error", "internals should not leak");
    }

    #[test]
    fn auth_errors_map_to_statuses() {
        let e: ApiError = AuthError::InvalidPassword.into();
        assert_eq!(e.0, StatusCode::UNAUTHORIZED);
        let e: ApiError = AuthError::MissingCredentials.into();
        assert_eq!(e.0, StatusCode::BAD_REQUEST);
    }
}
