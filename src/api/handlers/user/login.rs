//! Login: credential check + token issuance.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use sqlx::PgPool;
use std::collections::BTreeMap;
use tracing::error;

use super::password::verify_password;
use super::storage::{issue_access_token, lookup_user_by_identifier};
use super::types::LoginRequest;
use super::utils::normalize_email;
use crate::api::envelope::Envelope;
use crate::api::error::UserError;

fn login_validator(request: &LoginRequest) -> BTreeMap<&'static str, String> {
    let mut fields = BTreeMap::new();
    if request.identifier.is_empty() {
        fields.insert("identifier", "missing field".to_string());
    }
    if request.password.is_empty() {
        fields.insert("password", "missing field".to_string());
    }
    fields
}

/// `POST /user/login`
///
/// Unknown identifier and wrong password are indistinguishable to the
/// caller; both answer the same generic failure.
pub async fn login(
    pool: Extension<PgPool>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, UserError> {
    let Some(Json(request)) = payload else {
        return Err(UserError::InvalidBody);
    };

    let fields = login_validator(&request);
    if !fields.is_empty() {
        return Err(UserError::Validation(fields));
    }

    // The identifier may be a username or an email.
    let email = normalize_email(&request.identifier);
    let Some(user) = lookup_user_by_identifier(&pool, &request.identifier, &email).await? else {
        error!("login failed: unknown identifier");
        return Err(UserError::Authentication);
    };

    if !verify_password(&user.password_hash, &request.password) {
        error!("login failed: password mismatch");
        return Err(UserError::Authentication);
    }

    // Supersedes any previous token for this user.
    let token = issue_access_token(&pool, &user.id).await?;

    Ok((
        StatusCode::OK,
        Json(Envelope::success(json!({
            "access_token": token,
            "user": user,
        }))),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::body::to_bytes;
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_pool() -> Result<PgPool> {
        Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
    }

    async fn body_json(response: axum::response::Response) -> Result<Value> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tokio::test]
    async fn login_missing_payload() -> Result<()> {
        let response = login(Extension(lazy_pool()?), None).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await?,
            json!({"status": "fail", "data": "invalid json"})
        );
        Ok(())
    }

    #[tokio::test]
    async fn login_missing_fields_are_independent() -> Result<()> {
        let request = LoginRequest {
            identifier: String::new(),
            password: String::new(),
        };
        let response = login(Extension(lazy_pool()?), Some(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await?,
            json!({
                "status": "fail",
                "data": {"identifier": "missing field", "password": "missing field"}
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn login_missing_password_only() -> Result<()> {
        let request = LoginRequest {
            identifier: "alice".to_string(),
            password: String::new(),
        };
        let response = login(Extension(lazy_pool()?), Some(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await?,
            json!({"status": "fail", "data": {"password": "missing field"}})
        );
        Ok(())
    }
}
