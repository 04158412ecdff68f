//! Signup verification: consuming the record is the verified transition.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use sqlx::PgPool;
use tracing::error;

use super::storage::consume_signup_verification;
use crate::api::envelope::Envelope;
use crate::api::error::UserError;

/// `GET /user/verify/{id}`
///
/// Consuming twice fails the second time: once the record is gone the id no
/// longer resolves. Verification does not log the user in.
pub async fn verify(
    pool: Extension<PgPool>,
    Path(verification_id): Path<String>,
) -> Result<impl IntoResponse, UserError> {
    if consume_signup_verification(&pool, &verification_id).await? {
        Ok((StatusCode::OK, Json(Envelope::success(Value::Null))))
    } else {
        error!("verification failed: unknown or already consumed id");
        Err(UserError::VerificationNotFound)
    }
}
