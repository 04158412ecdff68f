//! Protected session endpoints; both sit behind the identity middleware.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use sqlx::PgPool;

use super::identity::Identity;
use super::storage::revoke_access_token;
use crate::api::envelope::Envelope;
use crate::api::error::UserError;

/// `GET /user/token-infos` — echo the resolved identity.
pub async fn token_infos(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(Envelope::success(json!({
            "access_token": identity.token,
            "user": identity.user,
        }))),
    )
}

/// `GET /user/logout` — revoke the resolved token. Idempotent: a token that
/// is already gone still logs out cleanly.
pub async fn logout(
    pool: Extension<PgPool>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, UserError> {
    revoke_access_token(&pool, &identity.token.id).await?;
    Ok((StatusCode::OK, Json(Envelope::success(Value::Null))))
}
