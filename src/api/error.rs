//! Error taxonomy for the user-facing API.
//!
//! Validation and conflict failures are field-scoped and name every offending
//! field. Authentication and authorization failures answer with a single
//! generic message so identifiers cannot be enumerated. Storage failures are
//! opaque 500s and are never retried.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::error;

use crate::api::envelope::Envelope;

#[derive(Debug, Error)]
pub enum UserError {
    /// Request body missing or not parseable as JSON.
    #[error("invalid json")]
    InvalidBody,

    /// Missing or malformed fields, keyed by field name.
    #[error("validation failed")]
    Validation(BTreeMap<&'static str, String>),

    /// Identifier already in use, keyed by field name.
    #[error("conflict")]
    Conflict(BTreeMap<&'static str, String>),

    /// Unknown identifier or wrong password; callers never learn which.
    #[error("unable to login")]
    Authentication,

    /// Missing, invalid, or unverified token on a protected route.
    #[error("{0}")]
    Authorization(&'static str),

    /// Unknown or already consumed signup verification id.
    #[error("invalid signup verification id")]
    VerificationNotFound,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl IntoResponse for UserError {
    fn into_response(self) -> axum::response::Response {
        let (status, envelope) = match self {
            Self::InvalidBody => (
                StatusCode::BAD_REQUEST,
                Envelope::fail(json!("invalid json")),
            ),
            Self::Validation(fields) | Self::Conflict(fields) => (
                StatusCode::BAD_REQUEST,
                Envelope::fail(json!(fields)),
            ),
            Self::Authentication => (
                StatusCode::BAD_REQUEST,
                Envelope::fail_with_name("unable to login", "login"),
            ),
            Self::Authorization(message) => (
                StatusCode::UNAUTHORIZED,
                Envelope::fail_with_name(message, "access_token"),
            ),
            Self::VerificationNotFound => (
                StatusCode::BAD_REQUEST,
                Envelope::fail_with_name("invalid signup verification id", "id"),
            ),
            Self::Storage(err) => {
                error!("storage failure: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Envelope::error("database error"),
                )
            }
        };

        (status, Json(envelope)).into_response()
    }
}
