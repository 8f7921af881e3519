use std::collections::BTreeMap;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use wall_types::api::DetailResponse;

/// Key for errors that do not belong to a single input field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Per-field validation messages, serialized as `{"field": ["msg", ...]}`.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0:?}")]
    Validation(FieldErrors),

    #[error("authentication credentials were not provided")]
    NotAuthenticated,

    #[error("malformed request body: {0}")]
    Body(#[from] JsonRejection),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Shorthand for a validation error on a single field.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::Body(rejection) => rejection.status(),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn detail(message: impl Into<String>) -> Json<DetailResponse> {
    Json(DetailResponse {
        detail: message.into(),
    })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Validation(errors) => (status, Json(errors)).into_response(),
            Self::NotAuthenticated => (
                status,
                [(header::WWW_AUTHENTICATE, "Token")],
                detail("Authentication credentials were not provided."),
            )
                .into_response(),
            Self::Body(rejection) => (status, detail(rejection.body_text())).into_response(),
            Self::Internal(err) => {
                error!(error = ?err, "internal error");
                (status, detail("Internal server error.")).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_accumulate_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("username", "first");
        errors.add("username", "second");
        errors.add(NON_FIELD_ERRORS, "mismatch");

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "username": ["first", "second"],
                "non_field_errors": ["mismatch"],
            })
        );
    }

    #[test]
    fn empty_field_errors_are_ok() {
        assert!(FieldErrors::new().into_result().is_ok());

        let err = ApiError::field("content", "This field may not be blank.");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn status_codes() {
        assert_eq!(ApiError::NotAuthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("disk full")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
