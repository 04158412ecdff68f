//! Signup: validation, uniqueness checks, then atomic user + verification
//! creation.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use sqlx::PgPool;
use std::collections::BTreeMap;
use tracing::error;

use super::password::hash_password;
use super::storage::{identifiers_in_use, insert_user_and_verification, SignupOutcome};
use super::types::SignupRequest;
use super::utils::{normalize_email, valid_email};
use crate::api::envelope::Envelope;
use crate::api::error::UserError;

fn signup_validator(request: &SignupRequest) -> BTreeMap<&'static str, String> {
    let mut fields = BTreeMap::new();
    if request.email.is_empty() {
        fields.insert("email", "missing field".to_string());
    } else if !valid_email(&normalize_email(&request.email)) {
        fields.insert("email", "invalid email".to_string());
    }
    if request.username.is_empty() {
        fields.insert("username", "missing field".to_string());
    }
    if request.password.is_empty() {
        fields.insert("password", "missing field".to_string());
    }
    fields
}

fn conflict_fields(email_taken: bool, username_taken: bool) -> BTreeMap<&'static str, String> {
    let mut fields = BTreeMap::new();
    if email_taken {
        fields.insert("email", "email already in use".to_string());
    }
    if username_taken {
        fields.insert("username", "username already in use".to_string());
    }
    fields
}

/// `POST /user/signup`
///
/// The account is created unverified: the signup verification row inserted
/// in the same transaction is what marks it as such.
pub async fn signup(
    pool: Extension<PgPool>,
    payload: Option<Json<SignupRequest>>,
) -> Result<impl IntoResponse, UserError> {
    let Some(Json(request)) = payload else {
        return Err(UserError::InvalidBody);
    };

    let fields = signup_validator(&request);
    if !fields.is_empty() {
        return Err(UserError::Validation(fields));
    }

    let email = normalize_email(&request.email);

    // Both identifiers are checked even when the first is already taken, so
    // the response names every violated field.
    let (email_taken, username_taken) = identifiers_in_use(&pool, &email, &request.username).await?;
    let conflicts = conflict_fields(email_taken, username_taken);
    if !conflicts.is_empty() {
        error!("signup rejected: identifier already in use");
        return Err(UserError::Conflict(conflicts));
    }

    let password_hash = hash_password(&request.password)?;

    match insert_user_and_verification(&pool, &request.username, &email, &password_hash).await? {
        SignupOutcome::Created { user, verification } => Ok((
            StatusCode::OK,
            Json(Envelope::success(json!({
                "user": user,
                "signup_verification": verification,
            }))),
        )),
        SignupOutcome::Conflict => {
            // Lost a race with a concurrent signup; re-check so the response
            // still names the violated field(s).
            let (email_taken, username_taken) =
                identifiers_in_use(&pool, &email, &request.username).await?;
            let mut conflicts = conflict_fields(email_taken, username_taken);
            if conflicts.is_empty() {
                conflicts.insert("signup", "identifier already in use".to_string());
            }
            Err(UserError::Conflict(conflicts))
        }
    }
}
